//! Background fulfillment workers.
//!
//! Each materializer runs its consume loop and its reclaim loop as separate
//! tasks. All of them watch one shutdown channel; [`Workers::shutdown`] flips
//! it and waits for in-flight messages to finish.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use seckill::domain::OrderMaterializer;
use seckill::domain::ports::FulfillmentQueueError;

/// Handles to the running worker tasks.
pub struct Workers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

/// Ensure the consumer group exists, then spawn every loop.
///
/// # Errors
///
/// Returns the queue error when the group cannot be created; no task is
/// spawned in that case.
pub async fn start_workers(
    materializers: Vec<Arc<OrderMaterializer>>,
) -> Result<Workers, FulfillmentQueueError> {
    if let Some(first) = materializers.first() {
        first.prepare().await?;
    }

    let (shutdown, receiver) = watch::channel(false);
    let mut handles = Vec::with_capacity(materializers.len() * 2);
    for materializer in materializers {
        let consumer = Arc::clone(&materializer);
        let consumer_shutdown = receiver.clone();
        handles.push(tokio::spawn(async move {
            consumer.run(consumer_shutdown).await;
        }));
        let reclaim_shutdown = receiver.clone();
        handles.push(tokio::spawn(async move {
            materializer.run_reclaim(reclaim_shutdown).await;
        }));
    }
    info!(tasks = handles.len(), "fulfillment workers started");
    Ok(Workers { shutdown, handles })
}

impl Workers {
    /// Signal every loop to stop and wait for them.
    pub async fn shutdown(self) {
        // Receivers also stop when the sender drops, so a send error is harmless.
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "fulfillment worker panicked");
            }
        }
        info!("fulfillment workers stopped");
    }
}
