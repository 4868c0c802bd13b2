//! Writing generated days to the document store.

use search_loader_shared::SyntheticDay;
use search_loader_source::{DocumentSink, SourceError};
use tracing::{error, info, instrument};

async fn insert(sink: &dyn DocumentSink, days: &[SyntheticDay]) -> Result<usize, SourceError> {
    let documents = days
        .iter()
        .map(bson::to_document)
        .collect::<Result<Vec<_>, _>>()?;
    sink.insert_many(documents).await
}

/// Insert all days in one bulk call, then close the sink.
///
/// The sink is closed whether or not the insert succeeded; an insert error
/// takes precedence over a close error.
#[instrument(skip(sink, days), fields(day_count = days.len()))]
pub async fn persist(sink: &dyn DocumentSink, days: &[SyntheticDay]) -> Result<usize, SourceError> {
    let inserted = insert(sink, days).await;
    let closed = sink.close().await;

    match (inserted, closed) {
        (Ok(count), Ok(())) => {
            info!(inserted = count, "Persisted synthetic days");
            Ok(count)
        }
        (Err(e), _) => {
            error!(error = %e, "Failed to persist synthetic days");
            Err(e)
        }
        (Ok(_), Err(e)) => {
            error!(error = %e, "Failed to close document store");
            Err(e)
        }
    }
}
