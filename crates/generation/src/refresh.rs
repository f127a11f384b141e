use crate::service::ContentService;
use content::{has_outstanding_jobs, ContentItem};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Background re-fetch of the content list.
///
/// Publishes a snapshot after every fetch. Re-fetches every `interval` while
/// any item is generating; otherwise waits for a nudge or shutdown.
pub struct RefreshMonitor {
    snapshots: watch::Receiver<Vec<ContentItem>>,
    nudge: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshMonitor {
    pub fn spawn(service: Arc<ContentService>, interval: Duration) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(Vec::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let nudge = service.change_notifier();
        let handle = tokio::spawn(run(service, interval, snapshot_tx, nudge.clone(), shutdown_rx));
        Self {
            snapshots,
            nudge,
            shutdown,
            handle,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ContentItem>> {
        self.snapshots.clone()
    }

    /// Fetch again now, e.g. after submitting a generation request
    pub fn nudge(&self) {
        self.nudge.notify_one();
    }

    /// Stop polling. Submitted jobs keep running upstream.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::warn!("refresh monitor task ended abnormally: {err}");
        }
    }
}

async fn run(
    service: Arc<ContentService>,
    interval: Duration,
    snapshots: watch::Sender<Vec<ContentItem>>,
    nudge: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut outstanding = false;
    loop {
        if *shutdown.borrow() {
            break;
        }
        match service.list_content().await {
            Ok(items) => {
                outstanding = has_outstanding_jobs(&items);
                snapshots.send_replace(items);
            }
            Err(err) => tracing::warn!("content refresh failed: {err}"),
        }

        if outstanding {
            tracing::debug!("items still generating, next refresh in {interval:?}");
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = nudge.notified() => {}
                _ = shutdown.changed() => break,
            }
        } else {
            tokio::select! {
                _ = nudge.notified() => {}
                _ = shutdown.changed() => break,
            }
        }
    }
    tracing::debug!("refresh monitor stopped");
}
