use snip_core::{ShortId, ShortenerError, StorageError, UrlRepository};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fans a bulk soft delete out over concurrent chunks.
///
/// The ids are split into consecutive chunks of `chunk_size` and every chunk
/// goes to its own task. Chunks are independent: one failing does not stop
/// or undo the others, and a dispatched chunk runs to completion even if the
/// caller goes away.
#[derive(Clone)]
pub struct BatchDeleter {
    repository: Arc<dyn UrlRepository>,
    chunk_size: usize,
}

impl BatchDeleter {
    pub fn new(repository: Arc<dyn UrlRepository>, chunk_size: usize) -> Self {
        Self {
            repository,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Deletes `short_ids` chunk by chunk and waits for every chunk.
    ///
    /// Succeeds only if every chunk succeeded. Otherwise returns the first
    /// failure received as [`ShortenerError::PartialBatchFailure`].
    pub async fn delete(&self, short_ids: Vec<ShortId>) -> Result<(), ShortenerError> {
        let chunks: Vec<Vec<ShortId>> = short_ids
            .chunks(self.chunk_size)
            .map(<[ShortId]>::to_vec)
            .collect();
        let total_chunks = chunks.len();
        if total_chunks == 0 {
            return Ok(());
        }

        // One slot per chunk so no task ever waits on the channel.
        let (tx, mut rx) = mpsc::channel(total_chunks);
        let mut handles = Vec::with_capacity(total_chunks);

        for (index, chunk) in chunks.into_iter().enumerate() {
            let repository = Arc::clone(&self.repository);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let outcome = repository.batch_soft_delete(&chunk).await;
                if let Err(e) = &outcome {
                    warn!(chunk = index, size = chunk.len(), error = %e, "delete chunk failed");
                }
                let _ = tx.send(outcome).await;
            }));
        }
        drop(tx);

        let mut failures = Vec::new();
        let mut crashed = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(chunk = index, error = %e, "delete chunk task did not finish");
                crashed.push(StorageError::WriteFailed(format!(
                    "delete task for chunk {index} did not finish: {e}"
                )));
            }
        }
        while let Ok(outcome) = rx.try_recv() {
            if let Err(e) = outcome {
                failures.push(e);
            }
        }
        failures.extend(crashed);

        let failed_chunks = failures.len();
        match failures.into_iter().next() {
            None => {
                debug!(
                    ids = short_ids.len(),
                    chunks = total_chunks,
                    "batch delete finished"
                );
                Ok(())
            }
            Some(source) => Err(ShortenerError::PartialBatchFailure {
                source,
                failed_chunks,
                total_chunks,
            }),
        }
    }
}
