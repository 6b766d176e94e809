//! Integration tests for routing and batch orchestration.
//!
//! Network and model collaborators are replaced by stub processors and a
//! fixed OCR engine, so these run offline and without API keys.

use async_trait::async_trait;
use edgequake_doc2llm::processor::{AcceleratedProcessor, TextProcessor};
use edgequake_doc2llm::{
    extract_batch, extract_stream, BatchOutcome, BatchProgressCallback, BatchStatus,
    ConversionResult, ErrorKind, ExtractError, Extractor, ExtractorConfig, InputKind, InputRef,
    JsonRequest, OcrEngine, OutputFormat, Processor, ProcessorOptions, TEXT_CONVERTER,
};
use futures::StreamExt;
use image::DynamicImage;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Stubs ────────────────────────────────────────────────────────────────────

/// Claims `.pdf` files and returns canned content.
struct StubAccelerated;

#[async_trait]
impl Processor for StubAccelerated {
    fn name(&self) -> &'static str {
        "AcceleratedProcessor"
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        &[".pdf", ".png"]
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        matches!(input.extension().as_deref(), Some("pdf" | "png"))
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        Ok(ConversionResult::builder(self.name(), format!("# Report\n\nfrom {input}"))
            .metadata("content_type", "pdf")
            .build())
    }
}

/// Claims every http(s) URL without touching the network. Paths
/// containing "slow" are delayed so completion order differs from input
/// order.
struct StubUrl;

#[async_trait]
impl Processor for StubUrl {
    fn name(&self) -> &'static str {
        "UrlProcessor"
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        &["URLs"]
    }

    fn can_process(&self, input: &InputRef<'_>) -> bool {
        matches!(input, InputRef::Url(u) if u.starts_with("http://") || u.starts_with("https://"))
    }

    async fn process(&self, input: &InputRef<'_>) -> Result<ConversionResult, ExtractError> {
        let url = input.to_string();
        if url.contains("slow") {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        if url.contains("broken") {
            return Err(ExtractError::conversion(self.name(), "HTTP 500 Internal Server Error"));
        }
        Ok(ConversionResult::builder(self.name(), format!("page at {url}"))
            .metadata("url", url)
            .build())
    }
}

struct FixedOcr(&'static str);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn transcribe(&self, _image: &DynamicImage) -> String {
        self.0.to_string()
    }
}

#[derive(Default)]
struct Counting {
    starts: AtomicUsize,
    completes: AtomicUsize,
    errors: AtomicUsize,
    batch_successes: AtomicUsize,
}

impl BatchProgressCallback for Counting {
    fn on_input_start(&self, _index: usize, _total: usize, _input: &str) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_input_complete(&self, _index: usize, _total: usize, _processor: &str) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_input_error(&self, _index: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, _total: usize, success_count: usize) {
        self.batch_successes.store(success_count, Ordering::SeqCst);
    }
}

fn stub_extractor(concurrency: usize) -> Extractor {
    Extractor::builder()
        .processor(Arc::new(TextProcessor::new(ProcessorOptions::default())))
        .processor(Arc::new(StubUrl))
        .accelerated(Arc::new(StubAccelerated))
        .concurrency(concurrency)
        .build()
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mixed_inputs_render_as_json_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write(dir.path(), "report.pdf", "%PDF-1.7 stub");
    let inputs = vec![
        pdf.display().to_string(),
        "http://example.com".to_string(),
        "plain text note".to_string(),
    ];

    let report = extract_batch(&stub_extractor(1), &inputs).await;
    assert_eq!(report.status(), BatchStatus::Success);

    let kinds: Vec<(InputKind, String)> = report
        .outcomes()
        .iter()
        .map(|o| match o {
            BatchOutcome::Success { kind, result, .. } => (*kind, result.processor().to_string()),
            BatchOutcome::Failure(f) => panic!("unexpected failure: {f}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (InputKind::File, "AcceleratedProcessor".to_string()),
            (InputKind::Url, "UrlProcessor".to_string()),
            (InputKind::Text, TEXT_CONVERTER.to_string()),
        ]
    );

    let out = report.render(OutputFormat::Json, &JsonRequest::default()).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["count"], serde_json::json!(3));
    assert_eq!(v["results"].as_array().unwrap().len(), 3);
    assert_eq!(v["errors"], serde_json::json!([]));
    assert_eq!(
        v["results"][2]["metadata"]["processor"],
        serde_json::json!(TEXT_CONVERTER)
    );
}

#[tokio::test]
async fn middle_failure_is_recorded_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.txt", "first");
    let bad = write(dir.path(), "data.xyz", "??");
    let c = write(dir.path(), "c.txt", "third");
    let inputs = [a.display().to_string(), bad.display().to_string(), c.display().to_string()];

    let counting = Arc::new(Counting::default());
    let extractor = Extractor::builder()
        .processor(Arc::new(TextProcessor::default()))
        .progress(counting.clone())
        .build();

    let report = extract_batch(&extractor, &inputs).await;
    assert_eq!(report.status(), BatchStatus::PartialFailure);
    assert_eq!(report.exit_code(), 1);

    let md = report.render(OutputFormat::Markdown, &JsonRequest::default()).unwrap();
    assert_eq!(md, "first\n\n---\n\nthird");

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].kind, ErrorKind::UnsupportedFormat);

    assert_eq!(counting.starts.load(Ordering::SeqCst), 3);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 2);
    assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counting.batch_successes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrency_preserves_input_order() {
    let inputs = [
        "https://example.com/slow".to_string(),
        "https://example.com/fast".to_string(),
        "note".to_string(),
    ];
    let report = extract_batch(&stub_extractor(3), &inputs).await;
    let md = report.render(OutputFormat::Markdown, &JsonRequest::default()).unwrap();
    assert_eq!(
        md,
        "page at https://example.com/slow\n\n---\n\npage at https://example.com/fast\n\n---\n\nnote"
    );
}

#[tokio::test]
async fn url_failure_is_a_conversion_failure() {
    let inputs = ["https://example.com/broken".to_string(), "ok".to_string()];
    let report = extract_batch(&stub_extractor(1), &inputs).await;
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, ErrorKind::Conversion);
    assert!(failures[0].message.contains("HTTP 500"));
}

#[tokio::test]
async fn every_input_failing_is_reported() {
    let extractor = stub_extractor(1);
    let err = extractor.extract_file("/no/such/file.txt").await.unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }));

    let report = extract_batch(&extractor, &["https://example.com/broken"]).await;
    assert_eq!(report.status(), BatchStatus::Failed);
    let err = report
        .render(OutputFormat::Markdown, &JsonRequest::default())
        .unwrap_err();
    assert!(matches!(err, ExtractError::AllInputsFailed { total: 1, .. }));
}

#[tokio::test]
async fn csv_batch_numbers_files_by_input_position() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExtractorConfig::builder().accelerated(false).build().unwrap();
    let extractor = Extractor::new(&config);

    let a = write(dir.path(), "a.csv", "name,qty\napple,3\n");
    let b = write(dir.path(), "b.txt", "no tables here");
    let c = write(dir.path(), "c.csv", "k,v\nx,1\n");
    let inputs = [a.display().to_string(), b.display().to_string(), c.display().to_string()];

    let report = extract_batch(&extractor, &inputs).await;
    assert_eq!(report.status(), BatchStatus::Success);

    let csv = report.render(OutputFormat::Csv, &JsonRequest::default()).unwrap();
    assert!(csv.starts_with("=== File 1 ===\n=== Table 1 ===\nname,qty\napple,3"), "got: {csv}");
    assert!(csv.contains("\n\n=== File 3 ===\n=== Table 1 ===\nk,v\nx,1"), "got: {csv}");
    assert!(!csv.contains("File 2"));
}

#[tokio::test]
async fn accelerated_processor_wins_for_images() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("scan.png");
    image::RgbImage::new(8, 8).save(&png).unwrap();

    let config = ExtractorConfig::default();
    let extractor = Extractor::with_ocr_engine(&config, Arc::new(FixedOcr("| A | B |\n| --- | --- |\n| 1 | 2 |")));
    let result = extractor.extract_file(&png).await.unwrap();
    assert_eq!(result.processor(), "AcceleratedProcessor");
    assert_eq!(result.tables().len(), 1);
    assert_eq!(result.render_csv(false).unwrap(), "A,B\n1,2");
}

#[test]
fn accelerated_processor_can_be_built_directly() {
    let p = AcceleratedProcessor::new(Arc::new(FixedOcr("")), ProcessorOptions::default(), 1000);
    assert!(p.can_process(&InputRef::Path(Path::new("x.tif"))));
}

#[test]
fn stream_yields_every_outcome() {
    let extractor = Arc::new(stub_extractor(2));
    let inputs = vec![
        "https://example.com/slow".to_string(),
        "https://example.com/broken".to_string(),
        "hello".to_string(),
    ];

    let mut outcomes: Vec<BatchOutcome> =
        tokio_test::block_on(extract_stream(extractor, inputs).collect::<Vec<_>>());
    outcomes.sort_by_key(BatchOutcome::index);

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert_eq!(outcomes[2].input(), "hello");
}
