//! View report worker
//!
//! Sends closed watch intervals to the catalog in the background. The
//! session hands events over through an unbounded channel and never waits on
//! delivery; failures are logged and dropped.

use crate::catalog::CatalogService;
use dzm_common::ViewEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle for queueing view reports
pub struct ViewReporter {
    tx: Option<mpsc::UnboundedSender<ViewEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl ViewReporter {
    /// Start the delivery worker on the current tokio runtime
    pub fn spawn(catalog: Arc<dyn CatalogService>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(catalog, rx));
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queue a report; never blocks
    pub fn report(&self, event: ViewEvent) {
        match &self.tx {
            Some(tx) => {
                if tx.send(event).is_err() {
                    warn!("View report worker is gone, dropping report");
                }
            }
            None => debug!(item_id = %event.item_id, "Reporter closed, dropping report"),
        }
    }

    /// Stop accepting reports and wait for the queued ones to be delivered
    pub async fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!(error = %e, "View report worker ended abnormally");
            }
        }
    }
}

async fn deliver(catalog: Arc<dyn CatalogService>, mut rx: mpsc::UnboundedReceiver<ViewEvent>) {
    while let Some(event) = rx.recv().await {
        match catalog.track_view(&event).await {
            Ok(()) => debug!(
                item_id = %event.item_id,
                duration_secs = event.duration_secs,
                "View reported"
            ),
            Err(e) => warn!(
                item_id = %event.item_id,
                duration_secs = event.duration_secs,
                error = %e,
                "View report failed"
            ),
        }
    }
    info!("View report worker stopped");
}
