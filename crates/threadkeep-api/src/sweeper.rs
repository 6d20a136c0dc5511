//! Background purge of expired transcripts.

use std::sync::Arc;
use std::time::Duration;

use threadkeep_core::conversation::store::ConversationStore;
use threadkeep_core::storage::transcript_backend::TranscriptBackend;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run `purge_expired` every `every` until `cancel` fires.
///
/// Reads already hide expired transcripts; this only reclaims space.
pub fn spawn_sweeper<B>(
    store: Arc<ConversationStore<B>>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    B: TranscriptBackend + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Expiry sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "Purged expired transcripts"),
                        Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
                    }
                }
            }
        }
    })
}
