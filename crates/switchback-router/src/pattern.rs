//! Route pattern grammar.
//!
//! A pattern is split on `/` into segments; each segment is one of:
//!
//! | form            | meaning                                      |
//! |-----------------|----------------------------------------------|
//! | `users`         | literal, matched byte for byte               |
//! | `:id`           | named parameter, captures one segment        |
//! | `:id(\d+)`      | named parameter constrained by a regex       |
//! | `*`             | anonymous wildcard, matches one segment      |
//! | `**`            | catch-all, matches the whole remaining path  |
//!
//! Constraint regexes are compiled anchored (`^(?:...)$`) so they
//! must cover the entire segment. All grammar violations are caught
//! here, when the route is defined, never during lookup.

use std::fmt;

use regex::Regex;

/// One parsed pattern segment.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Matched byte for byte against the incoming (still encoded) segment.
    Literal(String),
    /// Captures one segment under a name.
    Param(String),
    /// Captures one segment under a name if the anchored regex accepts it.
    Constrained {
        /// Parameter name.
        name: String,
        /// The constraint source text, used for specificity ordering
        /// and duplicate detection.
        raw: String,
        /// Compiled anchored regex.
        regex: Regex,
    },
    /// Matches exactly one segment without capturing.
    Wildcard,
    /// Matches the entire remaining path (possibly zero segments);
    /// binds the joined remainder to the implicit parameter `*`.
    CatchAll,
}

/// Error raised while parsing a route pattern.
#[derive(Debug)]
pub enum PatternError {
    /// A `**` segment was followed by more segments.
    CatchAllNotFinal {
        /// The offending pattern.
        pattern: String,
    },
    /// A `:` segment with no parameter name.
    EmptyParamName {
        /// The offending segment.
        segment: String,
    },
    /// A constraint opened with `(` but the segment does not end in `)`.
    UnclosedConstraint {
        /// The offending segment.
        segment: String,
    },
    /// The constraint regex failed to compile.
    InvalidConstraint {
        /// The offending segment.
        segment: String,
        /// The regex compilation error.
        source: regex::Error,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatchAllNotFinal { pattern } => {
                write!(f, "catch-all segment must be final in pattern `{pattern}`")
            }
            Self::EmptyParamName { segment } => {
                write!(f, "parameter segment `{segment}` has an empty name")
            }
            Self::UnclosedConstraint { segment } => {
                write!(f, "constraint in segment `{segment}` is not closed")
            }
            Self::InvalidConstraint { segment, source } => {
                write!(f, "invalid constraint regex in segment `{segment}`: {source}")
            }
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConstraint { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Parse a full pattern into segments.
///
/// Leading, trailing, and doubled slashes are ignored, so `/users/`,
/// `users`, and `//users//` all describe the same single-segment
/// pattern. The root pattern `/` parses to zero segments.
///
/// # Errors
///
/// Returns a [`PatternError`] for grammar violations; see the module
/// docs for the grammar.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut segments = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        let segment = parse_segment(part)?;
        if matches!(segment, Segment::CatchAll) && idx + 1 != parts.len() {
            return Err(PatternError::CatchAllNotFinal {
                pattern: pattern.to_string(),
            });
        }
        segments.push(segment);
    }
    Ok(segments)
}

fn parse_segment(part: &str) -> Result<Segment, PatternError> {
    if part == "*" {
        return Ok(Segment::Wildcard);
    }
    if part == "**" {
        return Ok(Segment::CatchAll);
    }
    let Some(rest) = part.strip_prefix(':') else {
        return Ok(Segment::Literal(part.to_string()));
    };
    match rest.find('(') {
        Some(open) => {
            let name = &rest[..open];
            if name.is_empty() {
                return Err(PatternError::EmptyParamName {
                    segment: part.to_string(),
                });
            }
            if !rest.ends_with(')') {
                return Err(PatternError::UnclosedConstraint {
                    segment: part.to_string(),
                });
            }
            let raw = &rest[open + 1..rest.len() - 1];
            let regex = Regex::new(&format!("^(?:{raw})$")).map_err(|source| {
                PatternError::InvalidConstraint {
                    segment: part.to_string(),
                    source,
                }
            })?;
            Ok(Segment::Constrained {
                name: name.to_string(),
                raw: raw.to_string(),
                regex,
            })
        }
        None => {
            if rest.is_empty() {
                return Err(PatternError::EmptyParamName {
                    segment: part.to_string(),
                });
            }
            Ok(Segment::Param(rest.to_string()))
        }
    }
}

/// Normalize a mount prefix (group base path or dispatch base path).
///
/// Guarantees a leading `/` and no trailing `/`. The empty string and
/// `/` both normalize to the empty string, meaning "no prefix".
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
