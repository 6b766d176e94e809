//! Batch orchestration: many inputs, one combined output.
//!
//! Every input is attempted. A failing input is recorded as a
//! [`FailureRecord`] and never aborts the batch; the report keeps outcomes
//! in input order so combined output is deterministic whatever the
//! concurrency.

use crate::config::OutputFormat;
use crate::error::{ExtractError, FailureRecord};
use crate::extractor::Extractor;
use crate::processor::url::is_url;
use crate::render::{self, to_pretty_json, JsonRequest};
use crate::result::ConversionResult;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// How a raw input string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Url,
    File,
    Text,
}

impl InputKind {
    /// URL prefix first, then filesystem existence, else literal text.
    /// A string that looks like a URL is a URL even if a file of that name
    /// exists.
    pub fn classify(input: &str) -> Self {
        if is_url(input) {
            InputKind::Url
        } else if Path::new(input).exists() {
            InputKind::File
        } else {
            InputKind::Text
        }
    }
}

/// The result of one batch input.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Success {
        index: usize,
        input: String,
        kind: InputKind,
        result: ConversionResult,
    },
    Failure(FailureRecord),
}

impl BatchOutcome {
    pub fn index(&self) -> usize {
        match self {
            BatchOutcome::Success { index, .. } => *index,
            BatchOutcome::Failure(f) => f.index,
        }
    }

    pub fn input(&self) -> &str {
        match self {
            BatchOutcome::Success { input, .. } => input,
            BatchOutcome::Failure(f) => &f.input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }
}

/// Overall outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// At least one input succeeded and none failed.
    Success,
    /// Some inputs succeeded, some failed.
    PartialFailure,
    /// Nothing succeeded (or there were no inputs).
    Failed,
}

/// Ordered outcomes of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn new(mut outcomes: Vec<BatchOutcome>) -> Self {
        outcomes.sort_by_key(BatchOutcome::index);
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Successful results in input order, with their input position.
    pub fn successes(&self) -> impl Iterator<Item = (usize, &ConversionResult)> {
        self.outcomes.iter().filter_map(|o| match o {
            BatchOutcome::Success { index, result, .. } => Some((*index, result)),
            BatchOutcome::Failure(_) => None,
        })
    }

    /// The failure manifest, in input order.
    pub fn failures(&self) -> Vec<&FailureRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                BatchOutcome::Failure(f) => Some(f),
                BatchOutcome::Success { .. } => None,
            })
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn status(&self) -> BatchStatus {
        let ok = self.success_count();
        match (ok, self.total() - ok) {
            (0, _) => BatchStatus::Failed,
            (_, 0) => BatchStatus::Success,
            _ => BatchStatus::PartialFailure,
        }
    }

    /// Process exit code: 0 only for [`BatchStatus::Success`].
    pub fn exit_code(&self) -> u8 {
        match self.status() {
            BatchStatus::Success => 0,
            _ => 1,
        }
    }

    /// Render the combined output.
    ///
    /// * no successes → [`ExtractError::AllInputsFailed`]
    /// * one success → that result rendered on its own
    /// * several → Markdown and text joined by `---`, HTML by `<hr>`,
    ///   JSON wrapped as `{results, count, errors}`, CSV as one
    ///   `=== File N ===` block per input that has tables
    pub fn render(&self, format: OutputFormat, request: &JsonRequest) -> Result<String, ExtractError> {
        let successes: Vec<(usize, &ConversionResult)> = self.successes().collect();

        match successes.as_slice() {
            [] => Err(ExtractError::AllInputsFailed {
                total: self.total(),
                first_error: self
                    .failures()
                    .first()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "no inputs given".to_string()),
            }),
            [(_, only)] => render::render(only, format, request),
            many => match format {
                OutputFormat::Markdown => Ok(join(many, ConversionResult::render_markdown, "\n\n---\n\n")),
                OutputFormat::Text => Ok(join(many, ConversionResult::render_text, "\n\n---\n\n")),
                OutputFormat::Html => Ok(join(many, ConversionResult::render_html, "\n\n<hr>\n\n")),
                OutputFormat::Json => self.render_json(many, request),
                OutputFormat::Csv => render_csv(many),
            },
        }
    }

    fn render_json(
        &self,
        results: &[(usize, &ConversionResult)],
        request: &JsonRequest,
    ) -> Result<String, ExtractError> {
        let rendered = results
            .iter()
            .map(|(_, r)| r.render_json(request.fields(), request.schema()))
            .collect::<Result<Vec<Value>, _>>()?;
        let errors: Vec<Value> = self
            .failures()
            .iter()
            .map(|f| json!({ "input": f.input, "error": f.message, "kind": f.kind }))
            .collect();

        to_pretty_json(&json!({
            "results": rendered,
            "count": results.len(),
            "errors": errors,
        }))
    }
}

fn join(
    results: &[(usize, &ConversionResult)],
    render: fn(&ConversionResult) -> String,
    separator: &str,
) -> String {
    results
        .iter()
        .map(|(_, r)| render(r))
        .collect::<Vec<_>>()
        .join(separator)
}

/// `=== File N ===` blocks, N being the 1-based input position. Inputs
/// without tables are skipped; if none has any the batch has no tables.
fn render_csv(results: &[(usize, &ConversionResult)]) -> Result<String, ExtractError> {
    let mut blocks = Vec::new();
    for (index, result) in results {
        match result.render_csv(true) {
            Ok(csv) if !csv.trim().is_empty() => blocks.push(format!("=== File {} ===\n{csv}", index + 1)),
            Ok(_) | Err(ExtractError::NoTablesFound) => {}
            Err(e) => return Err(e),
        }
    }
    if blocks.is_empty() {
        return Err(ExtractError::NoTablesFound);
    }
    Ok(blocks.join("\n\n"))
}

pub(crate) async fn extract_one(extractor: &Extractor, index: usize, total: usize, input: &str) -> BatchOutcome {
    let progress = extractor.progress();
    progress.on_input_start(index, total, input);

    match extractor.extract_input(input).await {
        Ok((kind, result)) => {
            progress.on_input_complete(index, total, result.processor());
            BatchOutcome::Success {
                index,
                input: input.to_string(),
                kind,
                result,
            }
        }
        Err(e) => {
            warn!("[{}/{}] {} failed: {}", index + 1, total, input, e);
            progress.on_input_error(index, total, &e.to_string());
            BatchOutcome::Failure(FailureRecord::new(index, input, &e))
        }
    }
}

/// Extract every input, `extractor`'s concurrency at a time.
///
/// Never fails: per-input errors land in the report's failure manifest.
pub async fn extract_batch<S: AsRef<str>>(extractor: &Extractor, inputs: &[S]) -> BatchReport {
    let start = Instant::now();
    let total = inputs.len();
    let concurrency = extractor.concurrency();
    info!("Batch of {} inputs (concurrency {})", total, concurrency);
    extractor.progress().on_batch_start(total);

    // `buffered` yields in submission order whatever the completion order.
    let outcomes: Vec<BatchOutcome> = stream::iter(
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| extract_one(extractor, index, total, input.as_ref())),
    )
    .buffered(concurrency)
    .collect()
    .await;

    let report = BatchReport::new(outcomes);
    extractor
        .progress()
        .on_batch_complete(total, report.success_count());
    info!(
        "Batch done: {} succeeded, {} failed in {:?}",
        report.success_count(),
        report.total() - report.success_count(),
        start.elapsed()
    );
    report
}
