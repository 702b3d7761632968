/// Test helper functions and service builders
use super::fakes::{FakeObjectStore, InMemoryImageRepository, StaticVisionClient};
use media_pipeline_lib::modules::media::MediaService;
use media_pipeline_lib::modules::storage::UploadPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct TestServices {
    pub store: Arc<FakeObjectStore>,
    pub repository: Arc<InMemoryImageRepository>,
    pub vision: Arc<StaticVisionClient>,
    pub media_service: Arc<MediaService>,
    pub upload_pool: Arc<UploadPool>,
}

/// Wire the media service and upload pool against in-memory fakes
pub fn build_test_services(
    store: FakeObjectStore,
    repository: InMemoryImageRepository,
    vision: StaticVisionClient,
) -> TestServices {
    let store = Arc::new(store);
    let repository = Arc::new(repository);
    let vision = Arc::new(vision);

    let media_service = Arc::new(MediaService::new(repository.clone(), vision.clone()));
    let upload_pool = Arc::new(UploadPool::new(store.clone(), 4));

    TestServices {
        store,
        repository,
        vision,
        media_service,
        upload_pool,
    }
}

/// `count` paths under a fake inbox, named `file-<i>.png`
pub fn inbox_paths(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/inbox/file-{}.png", i)))
        .collect()
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn read(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
