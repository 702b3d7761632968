/// In-memory stand-ins for the external collaborators
use async_trait::async_trait;
use chrono::Utc;
use media_pipeline_lib::modules::media::{Image, ImageRepository, NewImage, VisionClient};
use media_pipeline_lib::modules::storage::ObjectStore;
use media_pipeline_lib::shared::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type KeyPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Object store that keeps keys in memory and fails or panics on demand
pub struct FakeObjectStore {
    bucket: String,
    fail_when: KeyPredicate,
    panic_when: KeyPredicate,
    delay: Duration,
    stored: Mutex<Vec<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self {
            bucket: "test-bucket".to_string(),
            fail_when: Box::new(|_| false),
            panic_when: Box::new(|_| false),
            delay: Duration::ZERO,
            stored: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn failing_when(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Box::new(predicate);
        self
    }

    pub fn panicking_when(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.panic_when = Box::new(predicate);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `put_object` calls observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put_object(&self, key: &str, _source: &Path) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if (self.panic_when)(key) {
            panic!("object store crashed on {}", key);
        }
        if (self.fail_when)(key) {
            return Err(AppError::StorageError(format!("rejected {}", key)));
        }

        self.stored.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Image repository backed by vectors and maps
#[derive(Default)]
pub struct InMemoryImageRepository {
    images: Mutex<Vec<Image>>,
    labels: Mutex<HashMap<i64, Vec<String>>>,
    keywords: Mutex<HashMap<i64, Vec<String>>>,
    fail_create: bool,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn images(&self) -> Vec<Image> {
        self.images.lock().unwrap().clone()
    }

    pub fn labels_of(&self, image_id: i64) -> Vec<String> {
        self.labels
            .lock()
            .unwrap()
            .get(&image_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn keywords_of(&self, image_id: i64) -> Vec<String> {
        self.keywords
            .lock()
            .unwrap()
            .get(&image_id)
            .cloned()
            .unwrap_or_default()
    }

    fn update(&self, id: i64, apply: impl FnOnce(&mut Image)) -> AppResult<()> {
        let mut images = self.images.lock().unwrap();
        let image = images
            .iter_mut()
            .find(|image| image.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", id)))?;
        apply(image);
        Ok(())
    }

    fn link(map: &Mutex<HashMap<i64, Vec<String>>>, image_id: i64, values: Vec<String>) -> usize {
        let mut map = map.lock().unwrap();
        let linked = map.entry(image_id).or_default();
        let mut added = 0;
        for value in values {
            if !linked.contains(&value) {
                linked.push(value);
                added += 1;
            }
        }
        added
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    async fn create(&self, image: NewImage) -> AppResult<Image> {
        if self.fail_create {
            return Err(AppError::DatabaseError("insert refused".to_string()));
        }

        let mut images = self.images.lock().unwrap();
        let created = Image {
            id: images.len() as i64 + 1,
            filename: image.filename,
            origin_filename: image.origin_filename,
            file_extension: image.file_extension,
            bucket: image.bucket,
            object_key: image.object_key,
            uploaded: image.uploaded,
            label_detected: false,
            text_detected: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        images.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Image>> {
        Ok(self.images().into_iter().find(|image| image.id == id))
    }

    async fn get_by_label_detected(&self, detected: bool) -> AppResult<Vec<Image>> {
        Ok(self
            .images()
            .into_iter()
            .filter(|image| image.label_detected == detected)
            .collect())
    }

    async fn get_by_text_detected(&self, detected: bool) -> AppResult<Vec<Image>> {
        Ok(self
            .images()
            .into_iter()
            .filter(|image| image.text_detected == detected)
            .collect())
    }

    async fn mark_label_detected(&self, id: i64) -> AppResult<()> {
        self.update(id, |image| image.label_detected = true)
    }

    async fn mark_text_detected(&self, id: i64) -> AppResult<()> {
        self.update(id, |image| image.text_detected = true)
    }

    async fn save_labels(&self, image_id: i64, labels: Vec<String>) -> AppResult<usize> {
        self.update(image_id, |image| image.label_detected = true)?;
        Ok(Self::link(&self.labels, image_id, labels))
    }

    async fn save_text_keywords(&self, image_id: i64, keywords: Vec<String>) -> AppResult<usize> {
        self.update(image_id, |image| image.text_detected = true)?;
        Ok(Self::link(&self.keywords, image_id, keywords))
    }
}

/// Vision client answering every call with fixed results
pub struct StaticVisionClient {
    pub labels: Vec<String>,
    pub words: Vec<String>,
    pub document_words: Vec<String>,
    calls: AtomicUsize,
}

impl StaticVisionClient {
    pub fn new(labels: &[&str], words: &[&str], document_words: &[&str]) -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            labels: owned(labels),
            words: owned(words),
            document_words: owned(document_words),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionClient for StaticVisionClient {
    async fn detect_labels(&self, _bucket: &str, _key: &str) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }

    async fn detect_text(&self, _bucket: &str, _key: &str) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.words.clone())
    }

    async fn detect_document_text(&self, _bucket: &str, _key: &str) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.document_words.clone())
    }
}
