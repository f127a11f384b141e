/// Orchestration tests: generation fan-out, job reconciliation and refresh
/// against the scripted backend and in-process stores
use content::{
    ContentDb, ContentId, ContentItem, ContentRepository, ContentStatus, ContentType, JobOutcome,
    MemoryStore, StoreError, User, UserContext, UserImage,
};
use generation::reconcile::JobReconciler;
use generation::*;
use std::sync::Arc;
use std::time::Duration;

fn demo_user() -> User {
    User {
        id: "user-123".to_string(),
        name: "Demo User".to_string(),
        email: "demo.user@example.com".to_string(),
    }
}

/// Store whose batch writes fail, reads go to the wrapped store
struct FailingWrites(Arc<MemoryStore>);

fn disk_full() -> StoreError {
    StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
}

impl ContentRepository for FailingWrites {
    fn user(&self) -> content::Result<Option<User>> {
        self.0.user()
    }
    fn set_user(&self, user: Option<&User>) -> content::Result<()> {
        self.0.set_user(user)
    }
    fn context(&self) -> content::Result<UserContext> {
        self.0.context()
    }
    fn save_context(&self, context: &UserContext) -> content::Result<()> {
        self.0.save_context(context)
    }
    fn list_images(&self) -> content::Result<Vec<UserImage>> {
        self.0.list_images()
    }
    fn get_image(&self, id: &str) -> content::Result<Option<UserImage>> {
        self.0.get_image(id)
    }
    fn insert_image(&self, image: &UserImage) -> content::Result<()> {
        self.0.insert_image(image)
    }
    fn update_image_url(&self, id: &str, url: &str) -> content::Result<Option<UserImage>> {
        self.0.update_image_url(id, url)
    }
    fn delete_image(&self, id: &str) -> content::Result<bool> {
        self.0.delete_image(id)
    }
    fn list_content(&self) -> content::Result<Vec<ContentItem>> {
        self.0.list_content()
    }
    fn get_content(&self, id: &ContentId) -> content::Result<Option<ContentItem>> {
        self.0.get_content(id)
    }
    fn insert_content(&self, _items: &[ContentItem]) -> content::Result<()> {
        Err(disk_full())
    }
    fn update_content(
        &self,
        id: &ContentId,
        apply: &mut dyn FnMut(&mut ContentItem),
    ) -> content::Result<Option<ContentItem>> {
        self.0.update_content(id, apply)
    }
    fn delete_content(&self, id: &ContentId) -> content::Result<bool> {
        self.0.delete_content(id)
    }
    fn apply_job_outcomes(&self, _outcomes: &[JobOutcome]) -> content::Result<usize> {
        Err(disk_full())
    }
}

fn service_with(backend: Arc<MockBackend>) -> (Arc<ContentService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_user(demo_user()));
    let service =
        ContentService::new(store.clone(), backend, ServiceSettings::default()).unwrap();
    (Arc::new(service), store)
}

#[tokio::test]
async fn test_text_generation_produces_count_pending_items() {
    for count in 1..=5 {
        let headlines: Vec<String> = (0..count).map(|i| format!("Headline {i}")).collect();
        let backend = Arc::new(MockBackend::new().with_headlines(headlines.clone()));
        let (service, _) = service_with(backend);

        let items = service
            .generate(
                GenerationRequest::new(ContentType::Text, count)
                    .with_context(UserContext::new("notes", "")),
            )
            .await
            .unwrap();

        assert_eq!(items.len(), count);
        for (item, headline) in items.iter().zip(&headlines) {
            assert_eq!(item.status, ContentStatus::Pending);
            assert_eq!(&item.data, headline);
            assert_eq!(&item.prompt, headline);
        }
    }
}

#[tokio::test]
async fn test_empty_context_still_yields_placeholders() {
    let backend = Arc::new(MockBackend::new());
    let (service, _) = service_with(backend.clone());

    let items = service
        .generate(GenerationRequest::new(ContentType::Text, 3).with_context(UserContext::default()))
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert!(backend.headline_prompts()[0].contains("generic placeholder headlines"));
}

#[tokio::test]
async fn test_stored_context_used_when_request_has_none() {
    let backend = Arc::new(MockBackend::new());
    let (service, _) = service_with(backend.clone());
    service
        .save_context(&UserContext::new("Spring collection drop", "https://shop.example"))
        .unwrap();

    service
        .generate(GenerationRequest::new(ContentType::Text, 1))
        .await
        .unwrap();

    let prompt = &backend.headline_prompts()[0];
    assert!(prompt.contains("Spring collection drop"));
    assert!(prompt.contains("https://shop.example"));
}

#[tokio::test]
async fn test_failed_item_does_not_block_siblings() {
    let backend = Arc::new(
        MockBackend::new()
            .with_headlines(["Good one", "Bad one", "Another good one"])
            .failing_prompts_containing("Bad one"),
    );
    let (service, _) = service_with(backend);

    let items = service
        .generate(GenerationRequest::new(ContentType::Image, 3))
        .await
        .unwrap();

    let statuses: Vec<ContentStatus> = items.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![ContentStatus::Pending, ContentStatus::Error, ContentStatus::Pending]
    );
    assert!(items[1].error_message.as_deref().is_some_and(|m| !m.is_empty()));

    let stored = service.list_content().await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn test_synthesis_failure_creates_nothing() {
    let backend = Arc::new(MockBackend::new().failing_headlines("upstream down"));
    let (service, store) = service_with(backend);

    let err = service
        .generate(GenerationRequest::new(ContentType::Text, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalystError::SynthesisFailed(_)));
    assert!(store.list_content().unwrap().is_empty());
}

#[tokio::test]
async fn test_count_out_of_range_rejected() {
    let (service, _) = service_with(Arc::new(MockBackend::new()));
    for count in [0, 6] {
        let err = service
            .generate(GenerationRequest::new(ContentType::Text, count))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalystError::InvalidRequest(_)));
    }
}

#[tokio::test]
async fn test_launch_day_text_flow() {
    let backend = Arc::new(MockBackend::new().with_headlines(["Launch Day Is Here", "We Launch Today"]));
    let (service, _) = service_with(backend);

    let items = service
        .generate(
            GenerationRequest::new(ContentType::Text, 2)
                .with_context(UserContext::new("Launch day", "")),
        )
        .await
        .unwrap();
    assert!(items.iter().all(|i| i.status == ContentStatus::Pending));

    let listed = service.list_content().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].data, "Launch Day Is Here");
    assert_eq!(listed[1].data, "We Launch Today");
    assert_eq!(listed[0].id, items[0].id);
}

#[tokio::test]
async fn test_later_batches_list_first() {
    let backend = Arc::new(MockBackend::new());
    let (service, _) = service_with(backend);

    let first = service
        .generate(GenerationRequest::new(ContentType::Text, 2))
        .await
        .unwrap();
    let second = service
        .generate(GenerationRequest::new(ContentType::Text, 2))
        .await
        .unwrap();

    let ids: Vec<ContentId> = service
        .list_content()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    let expected: Vec<ContentId> = second.iter().chain(&first).map(|i| i.id.clone()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_video_job_lifecycle() {
    let backend = Arc::new(
        MockBackend::new()
            .with_api_key("secret")
            .with_headlines(["Teaser"]),
    );
    let (service, _) = service_with(backend.clone());

    let items = service
        .generate(GenerationRequest::new(ContentType::Video, 1))
        .await
        .unwrap();
    let id = items[0].id.clone();
    let job_ref = items[0].generation_job_id.clone().unwrap();
    assert_eq!(items[0].status, ContentStatus::Generating);

    // not done yet
    let listed = service.list_content().await.unwrap();
    assert_eq!(listed[0].status, ContentStatus::Generating);
    assert_eq!(listed[0].generation_job_id.as_deref(), Some(job_ref.as_str()));
    assert!(listed[0].data.is_empty());

    let job = VideoJob::from_job_ref(&job_ref).unwrap();
    backend.finish_job(&job.name, Some("https://video.example/files/abc?alt=media"));

    let listed = service.list_content().await.unwrap();
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].status, ContentStatus::Pending);
    assert_eq!(
        listed[0].data,
        "https://video.example/files/abc?alt=media&key=secret"
    );
    assert!(listed[0].generation_job_id.is_none());

    // resolved items are not polled again
    let polls = backend.poll_count();
    service.list_content().await.unwrap();
    assert_eq!(backend.poll_count(), polls);
}

#[tokio::test]
async fn test_video_failure_and_poll_error_mark_items() {
    let backend = Arc::new(MockBackend::new().with_headlines(["One", "Two"]));
    let (service, _) = service_with(backend.clone());

    service
        .generate(GenerationRequest::new(ContentType::Video, 2))
        .await
        .unwrap();
    let names = backend.job_names();
    backend.fail_job(&names[0], 13, "internal");

    let listed = service.list_content().await.unwrap();
    let first = listed.iter().find(|i| i.prompt == "One").unwrap();
    assert_eq!(first.status, ContentStatus::Error);
    assert_eq!(
        first.error_message.as_deref(),
        Some("Video generation failed: internal (Code: 13)")
    );
    let second = listed.iter().find(|i| i.prompt == "Two").unwrap();
    assert_eq!(second.status, ContentStatus::Generating);

    backend.set_poll_error(Some("connection reset"));
    let listed = service.list_content().await.unwrap();
    let second = listed.iter().find(|i| i.prompt == "Two").unwrap();
    assert_eq!(second.status, ContentStatus::Error);
    assert!(second.generation_job_id.is_none());
    assert!(second
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("connection reset")));
}

#[tokio::test]
async fn test_item_without_job_reference_is_left_alone() {
    let backend = Arc::new(MockBackend::new());
    let (service, store) = service_with(backend.clone());
    let item = ContentItem::generating(ContentId::new(42, 0), ContentType::Video, "orphan");
    store.insert_content(&[item.clone()]).unwrap();

    let listed = service.list_content().await.unwrap();
    assert_eq!(listed, vec![item]);
    assert_eq!(backend.poll_count(), 0);
}

#[tokio::test]
async fn test_schedule_and_status_mutators() {
    let (service, _) = service_with(Arc::new(MockBackend::new()));
    let items = service
        .generate(GenerationRequest::new(ContentType::Text, 1))
        .await
        .unwrap();
    let id = items[0].id.clone();

    let at = chrono::Utc::now() + chrono::Duration::days(1);
    let scheduled = service.set_schedule(&id, at).unwrap();
    assert_eq!(scheduled.status, ContentStatus::Scheduled);
    assert_eq!(scheduled.schedule, Some(at));

    assert!(matches!(
        service.set_status(&id, ContentStatus::Scheduled),
        Err(CatalystError::InvalidRequest(_))
    ));
    assert_eq!(
        service.list_content().await.unwrap()[0].status,
        ContentStatus::Scheduled
    );

    let approved = service.set_status(&id, ContentStatus::Approved).unwrap();
    assert_eq!(approved.status, ContentStatus::Approved);
    assert!(approved.schedule.is_none());

    let missing = ContentId::new(1, 0);
    assert!(matches!(
        service.set_status(&missing, ContentStatus::Posted),
        Err(CatalystError::NotFound { .. })
    ));
    service.delete_content(&id).unwrap();
    assert!(matches!(
        service.delete_content(&id),
        Err(CatalystError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_stale_outcome_does_not_override_user_change() {
    let store = Arc::new(ContentDb::open_in_memory().unwrap());
    let backend = Arc::new(MockBackend::new().with_headlines(["Clip"]));
    let service =
        ContentService::new(store.clone(), backend.clone(), ServiceSettings::default()).unwrap();

    let items = service
        .generate(GenerationRequest::new(ContentType::Video, 1))
        .await
        .unwrap();
    let id = items[0].id.clone();
    backend.finish_job(&backend.job_names()[0], Some("https://v/late"));

    // poll starts from a snapshot, then the user rejects the item
    let snapshot = store.list_content().unwrap();
    let outcomes = JobReconciler::new(backend.clone())
        .poll_outstanding(&snapshot)
        .await;
    assert_eq!(outcomes.len(), 1);
    service.set_status(&id, ContentStatus::Rejected).unwrap();

    assert_eq!(store.apply_job_outcomes(&outcomes).unwrap(), 0);
    let stored = store.get_content(&id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Rejected);
    assert!(stored.data.is_empty());
}

#[tokio::test]
async fn test_seed_image_lookup() {
    let backend = Arc::new(MockBackend::new().with_headlines(["Sale"]));
    let (service, _) = service_with(backend.clone());

    let pending = service.register_image("product.png").unwrap();
    service
        .generate(GenerationRequest::new(ContentType::Image, 1).with_start_image(&pending.id))
        .await
        .unwrap();
    assert_eq!(backend.image_calls()[0].1, None);

    service
        .complete_upload(&pending.id, "data:image/png;base64,iVBORw0KGgo=")
        .unwrap();
    service
        .generate(GenerationRequest::new(ContentType::Image, 1).with_start_image(&pending.id))
        .await
        .unwrap();
    assert_eq!(backend.image_calls()[1].1.as_deref(), Some("image/png"));

    service
        .generate(GenerationRequest::new(ContentType::Image, 1).with_start_image("img-missing"))
        .await
        .unwrap();
    assert_eq!(backend.image_calls()[2].1, None);
}

#[tokio::test]
async fn test_image_library_and_user() {
    let (service, store) = service_with(Arc::new(MockBackend::new()));
    assert_eq!(service.current_user().unwrap(), demo_user());

    let a = service.register_image("a.png").unwrap();
    let b = service.register_image("b.png").unwrap();
    assert_ne!(a.id, b.id);
    assert!(!a.is_uploaded());
    let names: Vec<String> = service.list_images().unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["a.png", "b.png"]);

    service.delete_image(&a.id).unwrap();
    assert!(matches!(
        service.complete_upload(&a.id, "data:image/png;base64,AAAA"),
        Err(CatalystError::NotFound { .. })
    ));
    assert!(matches!(
        service.register_image("   "),
        Err(CatalystError::InvalidRequest(_))
    ));

    store.set_user(None).unwrap();
    assert!(matches!(service.current_user(), Err(CatalystError::Unauthorized)));
}

#[tokio::test]
async fn test_ids_stay_ahead_of_stored_items() {
    let store = Arc::new(MemoryStore::new());
    let future_ms = chrono::Utc::now().timestamp_millis() + 60_000;
    store
        .insert_content(&[ContentItem::generating(
            ContentId::new(future_ms, 0),
            ContentType::Text,
            "from the future",
        )])
        .unwrap();
    let service = ContentService::new(
        store,
        Arc::new(MockBackend::new()),
        ServiceSettings::default(),
    )
    .unwrap();

    let items = service
        .generate(GenerationRequest::new(ContentType::Text, 1))
        .await
        .unwrap();
    assert!(items[0].id.created_ms() > future_ms);
    assert_eq!(service.list_content().await.unwrap()[0].id, items[0].id);
}

#[tokio::test]
async fn test_refresh_monitor_stops_when_nothing_generates() {
    let backend = Arc::new(MockBackend::new().with_headlines(["Loop"]));
    let (service, _) = service_with(backend.clone());
    let monitor = RefreshMonitor::spawn(service.clone(), Duration::from_millis(20));
    let mut snapshots = monitor.subscribe();

    service
        .generate(GenerationRequest::new(ContentType::Video, 1))
        .await
        .unwrap();
    monitor.nudge();

    // polls while the job runs
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.poll_count() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    backend.finish_job(&backend.job_names()[0], Some("https://v/done"));
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            snapshots.changed().await.unwrap();
            let settled = {
                let items = snapshots.borrow_and_update();
                !items.is_empty() && !content::has_outstanding_jobs(&items)
            };
            if settled {
                break;
            }
        }
    })
    .await
    .unwrap();

    let polls = backend.poll_count();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.poll_count(), polls);
    assert!(!snapshots.has_changed().unwrap());

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_generate_returns_items_when_store_write_fails() {
    let inner = Arc::new(MemoryStore::with_user(demo_user()));
    let backend = Arc::new(MockBackend::new().with_headlines(["First", "Second"]));
    let service = ContentService::new(
        Arc::new(FailingWrites(inner.clone())),
        backend,
        ServiceSettings::default(),
    )
    .unwrap();

    let items = service
        .generate(GenerationRequest::new(ContentType::Text, 2))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].data, "First");
    assert!(items.iter().all(|i| i.status == ContentStatus::Pending));
    assert!(inner.list_content().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_reconciles_in_memory_when_write_back_fails() {
    let backend = Arc::new(MockBackend::new().with_headlines(["Clip"]));
    let (healthy, inner) = service_with(backend.clone());
    let items = healthy
        .generate(GenerationRequest::new(ContentType::Video, 1))
        .await
        .unwrap();
    backend.finish_job(&backend.job_names()[0], Some("https://v/1"));

    let service = ContentService::new(
        Arc::new(FailingWrites(inner.clone())),
        backend,
        ServiceSettings::default(),
    )
    .unwrap();
    let listed = service.list_content().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, items[0].id);
    assert_eq!(listed[0].status, ContentStatus::Pending);
    assert_eq!(listed[0].data, "https://v/1");
    assert!(listed[0].generation_job_id.is_none());

    let stored = inner.get_content(&items[0].id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Generating);
}
