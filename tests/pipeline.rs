//! Integration tests for the full OCR → extraction pipeline.
//!
//! Both services are replaced by a single `mockito` server; the OCR routes
//! (`/files`, `/files/{id}/url`, `/ocr`) and the chat route
//! (`/chat/completions`) do not overlap. Every mock declares how many times
//! it expects to be hit, so a stage that should not run is caught by
//! `assert_async`.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_medocr::prompts::EXTRACTION_SYSTEM_PROMPT;
use edgequake_medocr::{Credentials, ErrorKind, MedOcrError, MedOcrProcessor, ProcessorConfig};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};

const MISTRAL_KEY: &str = "mistral-test-key";
const GROQ_KEY: &str = "groq-test-key";
const SIGNED_URL: &str = "https://x/signed";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn processor_for(server: &ServerGuard) -> MedOcrProcessor {
    let config = ProcessorConfig::builder()
        .credentials(Credentials::new(MISTRAL_KEY, GROQ_KEY))
        .ocr_base_url(server.url())
        .chat_base_url(server.url())
        .build()
        .expect("valid config");
    MedOcrProcessor::new(config).expect("processor")
}

fn write_document(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"fake document bytes").expect("write input");
    path
}

async fn mock_upload(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/files")
        .match_header("authorization", format!("Bearer {MISTRAL_KEY}").as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="purpose""#.into()),
            Matcher::Regex("ocr".into()),
            Matcher::Regex("fake document bytes".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"f1","object":"file","purpose":"ocr"}"#)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_sign(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("GET", "/files/f1/url")
        .match_header("authorization", format!("Bearer {MISTRAL_KEY}").as_str())
        .match_query(Matcher::UrlEncoded("expiry".into(), "24".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "url": SIGNED_URL }).to_string())
        .expect(hits)
        .create_async()
        .await
}

async fn mock_ocr(
    server: &mut ServerGuard,
    document: serde_json::Value,
    response: serde_json::Value,
    hits: usize,
) -> Mock {
    server
        .mock("POST", "/ocr")
        .match_header("authorization", format!("Bearer {MISTRAL_KEY}").as_str())
        .match_body(Matcher::PartialJson(json!({
            "model": "mistral-ocr-latest",
            "document": document,
            "include_image_base64": true
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response.to_string())
        .expect(hits)
        .create_async()
        .await
}

async fn mock_chat(server: &mut ServerGuard, user_text: &str, answer: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/chat/completions")
        .match_header("authorization", format!("Bearer {GROQ_KEY}").as_str())
        .match_body(Matcher::PartialJson(json!({
            "model": "llama-3.3-70b-versatile",
            "max_tokens": 1024,
            "messages": [
                {"role": "system", "content": EXTRACTION_SYSTEM_PROMPT},
                {"role": "user", "content": format!("Medical Document:\n\n{user_text}")}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": answer},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 180, "completion_tokens": 20, "total_tokens": 200}
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await
}

async fn mock_unexpected(server: &mut ServerGuard, method: &str, path: &str) -> Mock {
    server
        .mock(method, Matcher::Regex(format!("^{path}")))
        .with_status(500)
        .expect(0)
        .create_async()
        .await
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_end_to_end_returns_and_saves_report() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "prescription.png");
    let out = dir.path().join("ocr_output.txt");

    let ocr_text = "Name: Jane Doe\nMed: Amoxicillin 250mg";
    let report = "Patient Name: Jane Doe\nMedicine: Amoxicillin 250mg";

    let upload = mock_upload(&mut server, 1).await;
    let sign = mock_sign(&mut server, 1).await;
    let ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({ "output": ocr_text }),
        1,
    )
    .await;
    let chat = mock_chat(&mut server, ocr_text, report, 1).await;

    let processor = processor_for(&server);
    let result = processor.process_document(&input, &out).await.unwrap();

    assert_eq!(result, report);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), report);

    upload.assert_async().await;
    sign.assert_async().await;
    ocr.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn pdf_uses_document_url_and_only_page_zero() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "Discharge.PDF");
    let out = dir.path().join("report.txt");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let ocr = mock_ocr(
        &mut server,
        json!({"type": "document_url", "document_url": SIGNED_URL}),
        json!({
            "pages": [
                {"index": 0, "markdown": "Page one text", "images": []},
                {"index": 1, "markdown": "Page two text", "images": []}
            ],
            "model": "mistral-ocr-2503",
            "usage_info": {"pages_processed": 2}
        }),
        1,
    )
    .await;
    let chat = mock_chat(&mut server, "Page one text", "Patient Name: Not found", 1).await;

    let output = processor_for(&server).process_to_file(&input, &out).await.unwrap();

    assert_eq!(output.report, "Patient Name: Not found");
    assert_eq!(output.ocr_text, "Page one text");
    assert_eq!(output.ocr_pages, 2);
    assert_eq!(output.file_id, "f1");
    assert_eq!(output.usage.unwrap().total_tokens, 200);
    assert_eq!(output.timings.len(), 7);
    ocr.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn pdf_prefers_pages_over_output() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "scan.pdf");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "document_url", "document_url": SIGNED_URL}),
        json!({"output": "flat text", "pages": [{"markdown": "page zero"}]}),
        1,
    )
    .await;
    let chat = mock_chat(&mut server, "page zero", "ok", 1).await;

    let output = processor_for(&server).analyze(&input).await.unwrap();
    assert_eq!(output.ocr_text, "page zero");
    chat.assert_async().await;
}

#[tokio::test]
async fn unknown_ocr_shape_sends_empty_text() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "photo.jpeg");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({"pages": []}),
        1,
    )
    .await;
    let chat = mock_chat(&mut server, "", "Patient Name: Not found", 1).await;

    let output = processor_for(&server).analyze(&input).await.unwrap();
    assert_eq!(output.ocr_text, "");
    assert_eq!(output.report, "Patient Name: Not found");
    chat.assert_async().await;
}

#[tokio::test]
async fn null_page_metadata_still_reaches_extraction() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "chart.pdf");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "document_url", "document_url": SIGNED_URL}),
        json!({
            "pages": [{
                "index": 0,
                "markdown": "Jane",
                "images": null,
                "dimensions": {"dpi": null, "height": 10, "width": 10}
            }]
        }),
        1,
    )
    .await;
    let chat = mock_chat(&mut server, "Jane", "Patient Name: Jane", 1).await;

    let output = processor_for(&server).analyze(&input).await.unwrap();
    assert_eq!(output.ocr_text, "Jane");
    assert_eq!(output.report, "Patient Name: Jane");
    chat.assert_async().await;
}

#[tokio::test]
async fn repeated_runs_produce_identical_files() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.jpg");
    let out = dir.path().join("ocr_output.txt");
    std::fs::write(&out, "stale content from an older, much longer report\n".repeat(10)).unwrap();

    let report = "Patient Name: Jane Doe\nMedicine: Amoxicillin 250mg";
    let _upload = mock_upload(&mut server, 2).await;
    let _sign = mock_sign(&mut server, 2).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({"output": "Jane"}),
        2,
    )
    .await;
    let _chat = mock_chat(&mut server, "Jane", report, 2).await;

    let processor = processor_for(&server);
    processor.process_document(&input, &out).await.unwrap();
    let first = std::fs::read(&out).unwrap();
    processor.process_document(&input, &out).await.unwrap();
    let second = std::fs::read(&out).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, report.as_bytes());
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_extensions_make_no_network_calls() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ocr_output.txt");

    let mocks = vec![
        mock_unexpected(&mut server, "POST", "/files").await,
        mock_unexpected(&mut server, "GET", "/files").await,
        mock_unexpected(&mut server, "POST", "/ocr").await,
        mock_unexpected(&mut server, "POST", "/chat/completions").await,
    ];

    let processor = processor_for(&server);
    for name in ["notes.txt", "scan.tiff", "scan.GIF", "report.docx", "noext", "x.pdf.bak"] {
        let input = write_document(dir.path(), name);
        let err = processor.process_document(&input, &out).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{name}: {err}");
    }

    assert!(!out.exists());
    for m in mocks {
        m.assert_async().await;
    }
}

#[tokio::test]
async fn missing_input_file_is_filesystem_error_without_calls() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let upload = mock_unexpected(&mut server, "POST", "/files").await;

    let err = processor_for(&server)
        .process_document(dir.path().join("absent.png"), dir.path().join("out.txt"))
        .await
        .unwrap_err();

    assert!(matches!(err, MedOcrError::FileNotFound { .. }), "got: {err:?}");
    assert_eq!(err.kind(), ErrorKind::Filesystem);
    upload.assert_async().await;
}

// ── Transport failures halt the pipeline ─────────────────────────────────────

#[tokio::test]
async fn upload_failure_halts_before_signing() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");
    let out = dir.path().join("ocr_output.txt");

    let upload = server
        .mock("POST", "/files")
        .with_status(500)
        .with_body("upstream exploded")
        .expect(1)
        .create_async()
        .await;
    let sign = mock_sign(&mut server, 0).await;
    let ocr = mock_unexpected(&mut server, "POST", "/ocr").await;
    let chat = mock_unexpected(&mut server, "POST", "/chat/completions").await;

    let err = processor_for(&server)
        .process_document(&input, &out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("upstream exploded"), "got: {err}");
    assert!(!out.exists());

    upload.assert_async().await;
    sign.assert_async().await;
    ocr.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn sign_failure_halts_before_ocr() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");

    let _upload = mock_upload(&mut server, 1).await;
    let sign = server
        .mock("GET", "/files/f1/url")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"detail":"file not found"}"#)
        .expect(1)
        .create_async()
        .await;
    let ocr = mock_unexpected(&mut server, "POST", "/ocr").await;
    let chat = mock_unexpected(&mut server, "POST", "/chat/completions").await;

    let err = processor_for(&server).analyze(&input).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    sign.assert_async().await;
    ocr.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn ocr_failure_keeps_previous_report() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");
    let out = dir.path().join("ocr_output.txt");
    std::fs::write(&out, "previous report").unwrap();

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let ocr = server
        .mock("POST", "/ocr")
        .with_status(422)
        .with_body(r#"{"message":"invalid document"}"#)
        .expect(1)
        .create_async()
        .await;
    let chat = mock_unexpected(&mut server, "POST", "/chat/completions").await;

    let err = processor_for(&server)
        .process_document(&input, &out)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "previous report");

    ocr.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn extraction_failure_writes_nothing() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");
    let out = dir.path().join("ocr_output.txt");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({"output": "text"}),
        1,
    )
    .await;
    let chat = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("over capacity")
        .expect(1)
        .create_async()
        .await;

    let err = processor_for(&server)
        .process_document(&input, &out)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(503));
    assert!(!out.exists());
    chat.assert_async().await;
}

#[tokio::test]
async fn slow_extraction_times_out_and_writes_nothing() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");
    let out = dir.path().join("ocr_output.txt");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({"output": "text"}),
        1,
    )
    .await;
    let _chat = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(|w| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            w.write_all(br#"{"choices":[]}"#)
        })
        .create_async()
        .await;

    let config = ProcessorConfig::builder()
        .credentials(Credentials::new(MISTRAL_KEY, GROQ_KEY))
        .ocr_base_url(server.url())
        .chat_base_url(server.url())
        .extract_timeout_secs(1)
        .build()
        .unwrap();
    let err = MedOcrProcessor::new(config)
        .unwrap()
        .process_document(&input, &out)
        .await
        .unwrap_err();

    assert!(matches!(err, MedOcrError::Timeout { secs: 1, .. }), "got: {err:?}");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!out.exists());
}

#[tokio::test]
async fn empty_choices_is_malformed_response() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");

    let _upload = mock_upload(&mut server, 1).await;
    let _sign = mock_sign(&mut server, 1).await;
    let _ocr = mock_ocr(
        &mut server,
        json!({"type": "image_url", "image_url": SIGNED_URL}),
        json!({"output": "text"}),
        1,
    )
    .await;
    let _chat = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let err = processor_for(&server).analyze(&input).await.unwrap_err();
    assert!(matches!(err, MedOcrError::MalformedResponse { .. }), "got: {err:?}");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn upload_response_without_id_is_malformed() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");

    let _upload = server
        .mock("POST", "/files")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"object":"file"}"#)
        .create_async()
        .await;
    let sign = mock_sign(&mut server, 0).await;

    let err = processor_for(&server).analyze(&input).await.unwrap_err();
    assert!(matches!(err, MedOcrError::MalformedResponse { .. }), "got: {err:?}");
    sign.assert_async().await;
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "rx.png");

    let config = ProcessorConfig::builder()
        .credentials(Credentials::new(MISTRAL_KEY, GROQ_KEY))
        // Port 9 (discard) is not listening in test environments.
        .ocr_base_url("http://127.0.0.1:9")
        .chat_base_url("http://127.0.0.1:9")
        .build()
        .unwrap();
    let err = MedOcrProcessor::new(config)
        .unwrap()
        .analyze(&input)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), None);
}
