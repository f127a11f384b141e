use crate::error::CatalystError;
use crate::providers::{GenerationBackend, VideoJob, VideoJobStatus};
use content::{ContentItem, JobOutcome};
use futures::future::join_all;
use std::sync::Arc;

const NO_VIDEO_URI: &str = "Operation finished but no video URI was found.";

/// Polls outstanding video jobs and reports the ones that left "in flight"
#[derive(Clone)]
pub struct JobReconciler {
    backend: Arc<dyn GenerationBackend>,
}

impl JobReconciler {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Poll every generating item with a job reference concurrently.
    /// Jobs still running produce no outcome.
    pub async fn poll_outstanding(&self, items: &[ContentItem]) -> Vec<JobOutcome> {
        let polls = items
            .iter()
            .filter(|item| item.awaits_job())
            .map(|item| self.poll_one(item));
        join_all(polls).await.into_iter().flatten().collect()
    }

    async fn poll_one(&self, item: &ContentItem) -> Option<JobOutcome> {
        let job_ref = item.generation_job_id.clone()?;
        let status = match VideoJob::from_job_ref(&job_ref) {
            Ok(job) => self.backend.poll_video(&job).await,
            Err(err) => Err(err),
        };

        let outcome = match status {
            Ok(VideoJobStatus::Running) => {
                tracing::debug!("{} still generating", item.id);
                return None;
            }
            Ok(VideoJobStatus::Succeeded { uri: Some(uri) }) => {
                JobOutcome::completed(item.id.clone(), job_ref, self.backend.authorize_locator(&uri))
            }
            Ok(VideoJobStatus::Succeeded { uri: None }) => {
                JobOutcome::failed(item.id.clone(), job_ref, NO_VIDEO_URI)
            }
            Ok(VideoJobStatus::Failed { code, message }) => JobOutcome::failed(
                item.id.clone(),
                job_ref,
                format!("Video generation failed: {message} (Code: {code})"),
            ),
            Err(err) => {
                let err = CatalystError::JobPollFailed(format!("Failed to check video status: {err}"));
                tracing::warn!("polling {} failed: {err}", item.id);
                JobOutcome::failed(item.id.clone(), job_ref, err.to_string())
            }
        };
        Some(outcome)
    }
}

/// Apply outcomes to an in-memory collection; used when the write-back fails
pub fn apply_in_memory(items: &mut [ContentItem], outcomes: &[JobOutcome]) {
    for outcome in outcomes {
        if let Some(item) = items.iter_mut().find(|item| item.id == outcome.id) {
            outcome.apply_to(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockBackend;
    use content::{ContentId, ContentStatus, ContentType, JobResolution};

    fn video(index: usize, job_ref: Option<String>) -> ContentItem {
        let mut item = ContentItem::generating(ContentId::new(50, index), ContentType::Video, "v");
        item.generation_job_id = job_ref;
        item
    }

    #[tokio::test]
    async fn test_running_jobs_produce_no_outcome() {
        let backend = Arc::new(MockBackend::new());
        backend.finish_job("operations/a", Some("https://v/a"));
        backend.fail_job("operations/b", 7, "policy");
        let reconciler = JobReconciler::new(backend.clone());
        let items = vec![
            video(0, Some(VideoJob::new("operations/a").to_job_ref())),
            video(1, Some(VideoJob::new("operations/b").to_job_ref())),
            video(2, None),
        ];

        let outcomes = reconciler.poll_outstanding(&items).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[0].resolution,
            JobResolution::Completed {
                data: "https://v/a".to_string()
            }
        );
        assert_eq!(
            outcomes[1].resolution,
            JobResolution::Failed {
                message: "Video generation failed: policy (Code: 7)".to_string()
            }
        );
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_garbage_reference_marks_error() {
        let reconciler = JobReconciler::new(Arc::new(MockBackend::new()));
        let mut items = vec![video(0, Some("{not json".to_string()))];
        let outcomes = reconciler.poll_outstanding(&items).await;
        apply_in_memory(&mut items, &outcomes);
        assert_eq!(items[0].status, ContentStatus::Error);
        assert!(items[0].generation_job_id.is_none());
    }

    #[tokio::test]
    async fn test_done_without_uri_is_error() {
        let backend = Arc::new(MockBackend::new());
        backend.finish_job("operations/x", None);
        let reconciler = JobReconciler::new(backend);
        let outcomes = reconciler
            .poll_outstanding(&[video(0, Some(VideoJob::new("operations/x").to_job_ref()))])
            .await;
        assert_eq!(
            outcomes[0].resolution,
            JobResolution::Failed {
                message: NO_VIDEO_URI.to_string()
            }
        );
    }
}
