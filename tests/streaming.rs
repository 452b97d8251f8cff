// tests/streaming.rs
// Decoder + accumulator behavior over arbitrary chunkings

use futures::stream;
use plexus::llm::{decoder_for, drive_stream, Completion, ProviderKind, TextAccumulator};
use plexus::PlexusError;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn openai_body(deltas: &[String]) -> Vec<u8> {
    let mut body = String::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for delta in deltas {
        let frame = serde_json::json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {}\n\n", frame));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn gemini_body(deltas: &[String]) -> Vec<u8> {
    let elements: Vec<String> = deltas
        .iter()
        .map(|delta| {
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": delta }], "role": "model" } }]
            })
            .to_string()
        })
        .collect();
    format!("[{}]", elements.join(",\r\n")).into_bytes()
}

/// Split `body` at the given cut points (taken modulo its length)
fn split_at_cuts(body: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(body[start..point].to_vec());
        start = point;
    }
    chunks.push(body[start..].to_vec());
    chunks
}

fn accumulate(provider: ProviderKind, chunks: &[Vec<u8>]) -> (String, Vec<String>) {
    let mut accumulator = TextAccumulator::new(decoder_for(provider));
    let mut snapshots: Vec<String> = Vec::new();
    for chunk in chunks {
        if accumulator.push(chunk, &mut snapshots) {
            break;
        }
    }
    accumulator.finish(&mut snapshots);
    (accumulator.into_text(), snapshots)
}

fn delta_strategy() -> impl Strategy<Value = Vec<String>> {
    // quotes, backslashes, newlines and multibyte text exercise escapes
    prop::collection::vec(r#"[a-z \\"\n안녕é{}\[\]:,]{0,12}"#, 0..8)
}

proptest! {
    #[test]
    fn prop_openai_chunking_is_invisible(deltas in delta_strategy(), cuts in prop::collection::vec(any::<usize>(), 0..16)) {
        let body = openai_body(&deltas);
        let (text, snapshots) = accumulate(ProviderKind::OpenAi, &split_at_cuts(&body, &cuts));

        prop_assert_eq!(&text, &deltas.concat());
        for pair in snapshots.windows(2) {
            prop_assert!(pair[1].starts_with(&pair[0]));
            prop_assert!(pair[1].len() > pair[0].len());
        }
    }

    #[test]
    fn prop_gemini_chunking_is_invisible(deltas in delta_strategy(), cuts in prop::collection::vec(any::<usize>(), 0..16)) {
        let body = gemini_body(&deltas);
        let (text, snapshots) = accumulate(ProviderKind::Google, &split_at_cuts(&body, &cuts));

        prop_assert_eq!(&text, &deltas.concat());
        prop_assert_eq!(snapshots.last().cloned().unwrap_or_default(), text);
    }
}

#[test]
fn test_gemini_single_byte_chunks() {
    let deltas = vec!["The \"quick\"".to_string(), " brown\\fox\n".to_string(), "안녕".to_string()];
    let body = gemini_body(&deltas);
    let chunks: Vec<Vec<u8>> = body.chunks(1).map(<[u8]>::to_vec).collect();
    let (text, snapshots) = accumulate(ProviderKind::Google, &chunks);

    assert_eq!(text, "The \"quick\" brown\\fox\n안녕");
    assert_eq!(snapshots.len(), 3);
}

#[test]
fn test_openai_ignores_events_after_done() {
    let mut body = openai_body(&["only".to_string()]);
    body.extend_from_slice(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n");
    let (text, _) = accumulate(ProviderKind::OpenAi, &[body]);
    assert_eq!(text, "only");
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_text() {
    let body = gemini_body(&["first ".to_string(), "second".to_string()]);
    let (head, _) = body.split_at(body.len() - 26);

    let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(head.to_vec()), Err("connection reset by peer".to_string())];
    let mut snapshots: Vec<String> = Vec::new();
    let completion = drive_stream(
        stream::iter(chunks),
        decoder_for(ProviderKind::Google),
        &mut snapshots,
        &CancellationToken::new(),
    )
    .await;

    match &completion {
        Completion::Partial { text, error } => {
            assert_eq!(text, "first ");
            assert!(matches!(error, PlexusError::StreamRead(msg) if msg.contains("reset")));
            assert!(error.is_transport());
        }
        other => panic!("expected partial completion, got {:?}", other),
    }
    assert_eq!(completion.final_text(), "first ");
    assert_eq!(snapshots, vec!["first "]);
}

#[tokio::test]
async fn test_cancel_mid_stream_keeps_partial_text() {
    let cancel = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Result<Vec<u8>, String>>();
    let body_stream = tokio_stream_from(rx);

    let driver = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut snapshots: Vec<String> = Vec::new();
            let completion = drive_stream(body_stream, decoder_for(ProviderKind::OpenAi), &mut snapshots, &cancel).await;
            (completion, snapshots)
        })
    };

    tx.send(Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"half\"}}]}\n".to_vec()))
        .unwrap();
    // let the driver consume the first chunk before cancelling
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();

    let (completion, snapshots) = driver.await.unwrap();
    assert!(matches!(completion, Completion::Partial { error: PlexusError::Cancelled, .. }));
    assert_eq!(completion.final_text(), "half");
    assert_eq!(snapshots, vec!["half"]);
    drop(tx);
}

fn tokio_stream_from<T: Send + 'static>(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<T>,
) -> impl futures::Stream<Item = T> {
    stream::poll_fn(move |cx| rx.poll_recv(cx))
}
