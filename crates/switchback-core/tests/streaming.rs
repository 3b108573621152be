//! End-to-end streaming response behavior: response heads, chunk
//! delivery, abort teardown, and JSON framing through the public API.

use std::collections::HashMap;
use std::time::Duration;

use switchback_core::{
    BodyStream, JsonStreamMode, Method, Request, RequestContext, Response, ResponseBody,
    StatusCode, json_stream_response, stream_response,
};

fn context(target: &str) -> RequestContext {
    RequestContext::new(Request::new(Method::Get, target), HashMap::new())
}

fn body_of(response: Response) -> BodyStream {
    let (_, _, body) = response.into_parts();
    match body {
        ResponseBody::Stream(stream) => stream,
        other => panic!("expected streaming body, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_response_defaults_to_text_plain() {
    let ctx = context("/stream");
    let response = stream_response(&ctx, |writer| async move {
        writer.write("one").await;
        writer.close();
        Ok(())
    });

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header_value("content-type"),
        Some("text/plain; charset=utf-8")
    );
    let bytes = body_of(response).collect_bytes().await;
    assert_eq!(bytes, b"one");
}

#[tokio::test]
async fn content_type_override_applies_during_setup() {
    let ctx = context("/events");
    let response = stream_response(&ctx, |writer| {
        writer.set_content_type("text/event-stream");
        async move {
            writer.write("data: tick\n\n").await;
            writer.close();
            Ok(())
        }
    });

    assert_eq!(
        response.header_value("content-type"),
        Some("text/event-stream")
    );
    let bytes = body_of(response).collect_bytes().await;
    assert_eq!(bytes, b"data: tick\n\n");
}

#[tokio::test]
async fn stream_ends_when_producer_returns_without_close() {
    let ctx = context("/stream");
    let response = stream_response(&ctx, |writer| async move {
        writer.write("only chunk").await;
        Ok(())
    });

    let bytes = body_of(response).collect_bytes().await;
    assert_eq!(bytes, b"only chunk");
}

#[tokio::test]
async fn abort_tears_down_a_ticking_producer() {
    let request = Request::new(Method::Get, "/ticks");
    let abort = request.abort_handle();
    let ctx = RequestContext::new(request, HashMap::new());

    let response = stream_response(&ctx, |writer| async move {
        // Ticks far longer than the test unless torn down.
        for n in 0..10_000_u32 {
            writer.write(format!("tick {n}\n")).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    });

    let mut body = body_of(response);
    // Let a few ticks through, then drop the client.
    let first = body.recv().await.expect("at least one tick");
    assert!(first.starts_with(b"tick"));
    abort.abort();

    // The producer future is dropped, so the stream must terminate
    // instead of ticking forever.
    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        while body.recv().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "stream must end after abort");
}

#[tokio::test]
async fn abort_before_first_write_yields_empty_stream() {
    let request = Request::new(Method::Get, "/never");
    let abort = request.abort_handle();
    let ctx = RequestContext::new(request, HashMap::new());
    abort.abort();

    let response = stream_response(&ctx, |writer| async move {
        // Producer sleeps before writing; abort wins the race.
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.write("too late").await;
        Ok(())
    });

    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        body_of(response).collect_bytes().await
    })
    .await
    .expect("stream must end promptly");
    assert!(drained.is_empty());
}

#[tokio::test]
async fn ndjson_stream_end_to_end() {
    let ctx = context("/feed");
    let response = json_stream_response(&ctx, JsonStreamMode::NewlineDelimited, |writer| {
        async move {
            writer.send(&serde_json::json!({"seq": 1})).await?;
            writer.send(&serde_json::json!({"seq": 2})).await?;
            writer.close().await;
            Ok(())
        }
    });

    assert_eq!(
        response.header_value("content-type"),
        Some("application/x-ndjson")
    );
    let bytes = body_of(response).collect_bytes().await;
    assert_eq!(bytes, b"{\"seq\":1}\n{\"seq\":2}\n");
}

#[tokio::test]
async fn array_stream_closed_on_producer_return() {
    let ctx = context("/list");
    let response = json_stream_response(&ctx, JsonStreamMode::Array, |writer| async move {
        writer.send(&"a").await?;
        writer.send(&"b").await?;
        // No explicit close; the engine finishes the array.
        Ok(())
    });

    assert_eq!(
        response.header_value("content-type"),
        Some("application/json")
    );
    let bytes = body_of(response).collect_bytes().await;
    assert_eq!(bytes, b"[\"a\",\"b\"]");
}

#[tokio::test]
async fn empty_array_stream_has_empty_body() {
    let ctx = context("/list");
    let response =
        json_stream_response(&ctx, JsonStreamMode::Array, |_writer| async move { Ok(()) });

    let bytes = body_of(response).collect_bytes().await;
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn backpressure_blocks_producer_until_consumer_drains() {
    let ctx = context("/firehose");
    let response = stream_response(&ctx, |writer| async move {
        // Far more chunks than the channel buffers; completing all
        // writes requires the consumer to keep draining.
        for i in 0..256_u32 {
            writer.write(format!("{i};")).await;
        }
        writer.close();
        Ok(())
    });

    let bytes = tokio::time::timeout(Duration::from_secs(5), async {
        body_of(response).collect_bytes().await
    })
    .await
    .expect("drain must finish");
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.starts_with("0;1;2;"));
    assert!(text.ends_with("255;"));
}
