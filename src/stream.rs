//! Streaming batch API: emit outcomes as inputs finish.
//!
//! [`crate::batch::extract_batch`] returns once every input is done.
//! [`extract_stream`] yields each [`BatchOutcome`] as soon as it is ready,
//! so callers can show partial results or write them out incrementally.
//! With `concurrency > 1` outcomes arrive in completion order; use
//! [`BatchOutcome::index`] (or collect into a [`crate::BatchReport`]) when
//! input order matters.

use crate::batch::{extract_one, BatchOutcome};
use crate::extractor::Extractor;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of batch outcomes.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = BatchOutcome> + Send>>;

/// Extract `inputs`, streaming each outcome as it completes.
///
/// Progress callbacks fire per input as in the eager batch; the
/// batch-level start/complete events are left to the caller, who knows
/// when it stops polling.
///
/// # Example
///
/// ```rust,no_run
/// use edgequake_doc2llm::{extract_stream, BatchOutcome, Extractor, ExtractorConfig};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = Arc::new(Extractor::new(&ExtractorConfig::default()));
/// let mut outcomes = extract_stream(extractor, vec!["notes.txt".into(), "https://example.com".into()]);
/// while let Some(outcome) = outcomes.next().await {
///     match outcome {
///         BatchOutcome::Success { index, result, .. } => println!("#{index}: {} chars", result.content().len()),
///         BatchOutcome::Failure(f) => eprintln!("{f}"),
///     }
/// }
/// # }
/// ```
pub fn extract_stream(extractor: Arc<Extractor>, inputs: Vec<String>) -> OutcomeStream {
    let total = inputs.len();
    let concurrency = extractor.concurrency();
    info!("Streaming batch of {} inputs (concurrency {})", total, concurrency);

    stream::iter(inputs.into_iter().enumerate())
        .map(move |(index, input)| {
            let extractor = Arc::clone(&extractor);
            async move { extract_one(&extractor, index, total, &input).await }
        })
        .buffer_unordered(concurrency)
        .boxed()
}
