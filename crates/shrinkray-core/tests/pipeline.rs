//! End-to-end runs of the coordinator against the in-memory store.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageFormat};
use shrinkray_core::store::StoreCall;
use shrinkray_core::config::TransformConfig;
use shrinkray_core::{
    Config, Coordinator, ImageBytes, ImageKey, ImageTransform, ImageTransformer, ItemStage,
    MemoryStore, RunResult, StoreError, TransformError,
};

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

fn config(workers: usize) -> Config {
    let mut config = Config::default();
    config.store.source_bucket = "raw-uploads".into();
    config.store.destination_bucket = "web-assets".into();
    config.processing.parallel_workers = workers;
    config
}

async fn run(store: &Arc<MemoryStore>, workers: usize) -> RunResult {
    Coordinator::new(config(workers), store.clone())
        .run()
        .await
        .expect("run should not fail")
}

/// Real transformer that counts how often it is invoked.
struct CountingTransform {
    inner: ImageTransformer,
    calls: AtomicUsize,
}

impl CountingTransform {
    fn new() -> Self {
        Self {
            inner: ImageTransformer::new(TransformConfig::default()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageTransform for CountingTransform {
    fn transform(&self, bytes: &[u8]) -> Result<ImageBytes, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.transform(bytes)
    }
}

fn reads_of(store: &MemoryStore, key: &str) -> usize {
    let key = ImageKey::from(key);
    store.count_calls(|c| *c == StoreCall::Read(key.clone()))
}

fn writes_of(store: &MemoryStore, key: &str) -> usize {
    let key = ImageKey::from(key);
    store.count_calls(|c| *c == StoreCall::Write(key.clone()))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_download_failure_one_success() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("uuid/a.jpg", jpeg(1600, 1200))
            .with_object("uuid/b.jpg", jpeg(1600, 1200))
            .fail_read(
                "uuid/a.jpg",
                StoreError::Transfer {
                    key: "uuid/a.jpg".into(),
                    message: "connection reset by peer".into(),
                },
            ),
    );

    let result = run(&store, 3).await;

    assert_eq!(result.enumerated, 2);
    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.succeeded[0].source.as_str(), "uuid/b.jpg");
    assert_eq!(result.succeeded[0].destination.as_str(), "optimized/uuid/b.jpg");

    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.failed[0].key.as_str(), "uuid/a.jpg");
    assert_eq!(result.failed[0].stage, ItemStage::Download);
    assert!(result.failed[0].reason.contains("connection reset"));

    assert_eq!(
        store.destination_keys(),
        vec![ImageKey::from("optimized/uuid/b.jpg")]
    );
    let written = store
        .destination_object(&ImageKey::from("optimized/uuid/b.jpg"))
        .unwrap();
    let decoded = image::load_from_memory(&written).unwrap();
    assert_eq!(decoded.dimensions(), (800, 600));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_stages_never_reach_upload() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("uuid/ok.jpg", jpeg(1200, 900))
            .with_object("uuid/corrupt.jpg", b"\xff\xd8\xff\xe0 not really a jpeg".to_vec())
            .with_object("uuid/gone.jpg", jpeg(1200, 900))
            .fail_read("uuid/gone.jpg", StoreError::NotFound("uuid/gone.jpg".into())),
    );

    let result = run(&store, 2).await;

    assert_eq!(result.enumerated, 3);
    assert_eq!(result.succeeded_count(), 1);

    let stages: Vec<(String, ItemStage)> = {
        let mut s: Vec<_> = result
            .failed
            .iter()
            .map(|f| (f.key.to_string(), f.stage))
            .collect();
        s.sort_by(|a, b| a.0.cmp(&b.0));
        s
    };
    assert_eq!(
        stages,
        vec![
            ("uuid/corrupt.jpg".to_string(), ItemStage::Transform),
            ("uuid/gone.jpg".to_string(), ItemStage::Download),
        ]
    );

    assert_eq!(writes_of(&store, "optimized/uuid/corrupt.jpg"), 0);
    assert_eq!(writes_of(&store, "optimized/uuid/gone.jpg"), 0);
    assert_eq!(writes_of(&store, "optimized/uuid/ok.jpg"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_failure_never_reaches_transform() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("uuid/ok.jpg", jpeg(1200, 900))
            .with_object("uuid/gone.jpg", jpeg(1200, 900))
            .with_object("uuid/reset.jpg", jpeg(1200, 900))
            .fail_read("uuid/gone.jpg", StoreError::NotFound("uuid/gone.jpg".into()))
            .fail_read(
                "uuid/reset.jpg",
                StoreError::Transfer {
                    key: "uuid/reset.jpg".into(),
                    message: "connection reset".into(),
                },
            ),
    );
    let transform = Arc::new(CountingTransform::new());

    let result = Coordinator::new(config(3), store.clone())
        .with_transformer(transform.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.failed_count(), 2);
    assert!(result.failed.iter().all(|f| f.stage == ItemStage::Download));
    // Only the one successful download was handed to the transform.
    assert_eq!(transform.calls(), 1);
    assert_eq!(store.count_calls(|c| matches!(c, StoreCall::Write(_))), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_key_reaches_exactly_one_terminal_state() {
    let mut store = MemoryStore::new();
    for i in 0..10 {
        store = store.with_object(format!("uuid/{i:02}.jpg"), jpeg(1000, 600));
    }
    let store = Arc::new(
        store
            .fail_read("uuid/03.jpg", StoreError::Unavailable("503".into()))
            .fail_write(
                "optimized/uuid/07.jpg",
                StoreError::Unavailable("503".into()),
            )
            .with_latency(Duration::from_millis(20)),
    );

    let result = run(&store, 3).await;

    assert_eq!(result.enumerated, 10);
    assert_eq!(result.processed(), 10);
    assert!(result.is_complete());
    assert_eq!(result.cancelled, 0);

    let mut seen = HashSet::new();
    for key in result
        .succeeded
        .iter()
        .map(|s| &s.source)
        .chain(result.failed.iter().map(|f| &f.key))
    {
        assert!(seen.insert(key.clone()), "{key} reported twice");
    }
    assert_eq!(seen.len(), 10);

    for i in 0..10 {
        assert_eq!(reads_of(&store, &format!("uuid/{i:02}.jpg")), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_destination_key_is_prefixed_source_key() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("uuid/2024/06/cat.png", jpeg(900, 900))
            .with_object("uuid/dog.webp", jpeg(900, 900)),
    );

    let result = run(&store, 3).await;

    for uploaded in &result.succeeded {
        assert_eq!(
            uploaded.destination.as_str(),
            format!("optimized/{}", uploaded.source)
        );
    }
    assert_eq!(
        store.destination_keys(),
        vec![
            ImageKey::from("optimized/uuid/2024/06/cat.png"),
            ImageKey::from("optimized/uuid/dog.webp"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_configured_destination_prefix_is_used() {
    let store = Arc::new(MemoryStore::new().with_object("uuid/a.jpg", jpeg(900, 600)));
    let mut config = config(2);
    config.store.destination_prefix = "web/800/".into();

    let result = Coordinator::new(config, store.clone()).run().await.unwrap();

    assert_eq!(result.succeeded[0].destination.as_str(), "web/800/uuid/a.jpg");
    assert_eq!(
        store.destination_keys(),
        vec![ImageKey::from("web/800/uuid/a.jpg")]
    );
}

#[tokio::test]
async fn test_empty_prefix_launches_no_work() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("uuid/", Vec::<u8>::new())
            .with_object("elsewhere/a.jpg", jpeg(100, 100)),
    );

    let result = run(&store, 3).await;

    assert_eq!(result, RunResult::empty());
    assert_eq!(store.count_calls(|c| matches!(c, StoreCall::Read(_))), 0);
    assert_eq!(store.count_calls(|c| matches!(c, StoreCall::Write(_))), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_barrier_waits_for_last_worker() {
    let mut store = MemoryStore::new();
    for i in 0..10 {
        store = store.with_object(format!("uuid/{i}.jpg"), jpeg(1000, 500));
    }
    let store = Arc::new(store.with_latency(Duration::from_millis(30)));

    let result = run(&store, 3).await;

    // Everything is already uploaded by the time the run reports.
    assert_eq!(result.succeeded_count(), 10);
    assert_eq!(store.destination_keys().len(), 10);
    assert!(store.max_in_flight() <= 3);
    assert!(store.max_in_flight() >= 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_more_workers_than_images() {
    let store = Arc::new(MemoryStore::new().with_object("uuid/only.jpg", jpeg(1000, 500)));

    let result = run(&store, 16).await;

    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(reads_of(&store, "uuid/only.jpg"), 1);
}
