//! Asynchronous thumbnail provider
//!
//! Requests are served off the UI thread:
//! 1. The source is fingerprinted into a `CacheKey`
//! 2. Requests for the same key are coalesced, so at most one generation per
//!    key runs at a time and every waiter shares its result
//! 3. Cached thumbnails are read from disk when caching is enabled
//! 4. Otherwise the generator runs on a blocking worker, and successful
//!    results are written back to disk
//!
//! Failures are handed to every waiter but never cached.

use image::DynamicImage;
use moka::future::Cache;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::cache::{default_cache_dir, CacheKey, DiskCache};
use super::generator::{MediaThumbnailer, ThumbnailGenerator};
use super::{ThumbnailError, ThumbnailSize};
use crate::settings::{keys, Settings};

/// Decoded thumbnails kept in memory
const DEFAULT_MEMORY_ENTRIES: u64 = 512;

pub type ThumbnailResult = Result<Arc<Thumbnail>, ThumbnailError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Read and write the on-disk cache
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    /// Capacity of the in-memory decoded cache, in thumbnails
    pub memory_entries: u64,
    /// Maximum number of generations running at once
    pub max_workers: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_dir: default_cache_dir(),
            memory_entries: DEFAULT_MEMORY_ENTRIES,
            max_workers: std::thread::available_parallelism().map_or(2, |n| n.get()),
        }
    }
}

impl ProviderConfig {
    /// Read `MediaPreviewProvider.UseCache` and `MediaPreviewProvider.CachePath`.
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        let cache_dir: String = settings.get_or(
            keys::CACHE_PATH,
            defaults.cache_dir.to_string_lossy().to_string(),
        );

        Self {
            use_cache: settings.get_or(keys::USE_CACHE, true),
            cache_dir: if cache_dir.is_empty() {
                defaults.cache_dir.clone()
            } else {
                PathBuf::from(cache_dir)
            },
            ..defaults
        }
    }
}

/// Where a thumbnail came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOrigin {
    Generated,
    DiskCache,
}

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: DynamicImage,
    pub origin: ThumbnailOrigin,
    pub key: CacheKey,
}

struct Inner {
    use_cache: AtomicBool,
    disk: DiskCache,
    generator: Arc<dyn ThumbnailGenerator>,
    /// Coalesces concurrent loads per key and keeps decoded thumbnails
    memory: Cache<CacheKey, Arc<Thumbnail>>,
    /// Bounds concurrent decoders
    workers: Semaphore,
    runtime: Handle,
}

/// Cheap to clone; all clones share the same caches.
#[derive(Clone)]
pub struct ThumbnailProvider {
    inner: Arc<Inner>,
}

impl ThumbnailProvider {
    /// Create a provider with the default media thumbnailer.
    pub fn new(config: ProviderConfig, runtime: Handle) -> Self {
        Self::with_generator(config, Arc::new(MediaThumbnailer), runtime)
    }

    pub fn with_generator(
        config: ProviderConfig,
        generator: Arc<dyn ThumbnailGenerator>,
        runtime: Handle,
    ) -> Self {
        info!(
            cache_dir = %config.cache_dir.display(),
            use_cache = config.use_cache,
            workers = config.max_workers,
            "Thumbnail provider ready"
        );

        Self {
            inner: Arc::new(Inner {
                use_cache: AtomicBool::new(config.use_cache),
                disk: DiskCache::new(config.cache_dir),
                generator,
                memory: Cache::builder().max_capacity(config.memory_entries).build(),
                workers: Semaphore::new(config.max_workers.max(1)),
                runtime,
            }),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.inner.disk.dir()
    }

    pub fn use_cache(&self) -> bool {
        self.inner.use_cache.load(Ordering::Relaxed)
    }

    /// Enable or disable caching. Disabling also drops decoded thumbnails.
    pub fn set_use_cache(&self, enabled: bool) {
        self.inner.use_cache.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.inner.memory.invalidate_all();
        }
    }

    /// Drop every cached thumbnail, in memory and on disk.
    pub fn clear_cache(&self) -> usize {
        self.inner.memory.invalidate_all();
        let removed = self.inner.disk.clear();
        info!(removed, "Cleared thumbnail cache");
        removed
    }

    /// Request a thumbnail. The returned handle resolves when it is ready.
    pub fn request(&self, source: impl Into<PathBuf>, size: ThumbnailSize) -> ThumbnailRequest {
        let load = self.spawn_load(source.into(), size);
        let task = self.inner.runtime.spawn(join_load(load));
        ThumbnailRequest { task }
    }

    /// Request a thumbnail and hand the result to `on_ready`.
    ///
    /// Aborting the returned handle guarantees `on_ready` is never called,
    /// even if the generation itself runs to completion.
    pub fn request_with<F>(
        &self,
        source: impl Into<PathBuf>,
        size: ThumbnailSize,
        on_ready: F,
    ) -> AbortHandle
    where
        F: FnOnce(ThumbnailResult) + Send + 'static,
    {
        let load = self.spawn_load(source.into(), size);
        self.inner
            .runtime
            .spawn(async move { on_ready(join_load(load).await) })
            .abort_handle()
    }

    /// Run the load on its own task. Requesters only ever await its handle,
    /// so cancelling a request never drops a coalesced generation that other
    /// requesters are waiting on.
    fn spawn_load(&self, source: PathBuf, size: ThumbnailSize) -> JoinHandle<ThumbnailResult> {
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(inner.load(source, size))
    }
}

impl std::fmt::Debug for ThumbnailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailProvider")
            .field("cache_dir", &self.inner.disk.dir())
            .field("use_cache", &self.use_cache())
            .finish()
    }
}

async fn join_load(load: JoinHandle<ThumbnailResult>) -> ThumbnailResult {
    load.await
        .unwrap_or_else(|err| Err(ThumbnailError::Worker(err.to_string())))
}

impl Inner {
    async fn load(self: Arc<Self>, source: PathBuf, size: ThumbnailSize) -> ThumbnailResult {
        let metadata = tokio::fs::metadata(&source)
            .await
            .map_err(|err| ThumbnailError::io(&source, &err))?;
        let key = CacheKey::from_metadata(&source, &metadata, size);
        let use_cache = self.use_cache.load(Ordering::Relaxed);

        let producer = Arc::clone(&self);
        let produce_key = key.clone();
        let result = self
            .memory
            .try_get_with(key.clone(), async move {
                producer
                    .produce(source, produce_key, use_cache)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(|err| (*err).clone());

        if !use_cache {
            // Coalescing still applies, but nothing is retained
            self.memory.invalidate(&key).await;
        }

        result
    }

    async fn produce(
        &self,
        source: PathBuf,
        key: CacheKey,
        use_cache: bool,
    ) -> Result<Thumbnail, ThumbnailError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|err| ThumbnailError::Worker(err.to_string()))?;

        let disk = self.disk.clone();
        let generator = Arc::clone(&self.generator);

        tokio::task::spawn_blocking(move || {
            if use_cache {
                if let Some(image) = disk.load(&key) {
                    return Ok(Thumbnail {
                        image,
                        origin: ThumbnailOrigin::DiskCache,
                        key,
                    });
                }
            }

            let image = match generator.generate(&source, key.size()) {
                Ok(image) => image,
                Err(err) => {
                    warn!(path = %source.display(), error = %err, "Thumbnail generation failed");
                    return Err(err);
                }
            };

            if use_cache {
                if let Err(err) = disk.store(&key, &image) {
                    warn!(key = %key, error = %err, "Failed to write thumbnail cache");
                }
            }

            debug!(path = %source.display(), key = %key, "Thumbnail ready");
            Ok(Thumbnail {
                image,
                origin: ThumbnailOrigin::Generated,
                key,
            })
        })
        .await
        .map_err(|err| ThumbnailError::Worker(err.to_string()))?
    }
}

/// Pending thumbnail. Await it for the result, or cancel it.
///
/// Cancelling stops delivery; a generation that already started still
/// finishes and may populate the cache for later requests.
#[derive(Debug)]
pub struct ThumbnailRequest {
    task: JoinHandle<ThumbnailResult>,
}

impl ThumbnailRequest {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Future for ThumbnailRequest {
    type Output = ThumbnailResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(ThumbnailError::Cancelled),
            Err(err) => Err(ThumbnailError::Worker(err.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Counts generations and takes a while so requests overlap.
    struct SlowGenerator {
        calls: AtomicUsize,
        active: AtomicUsize,
        /// Most generations ever running at the same time
        peak: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl SlowGenerator {
        fn new(delay_ms: u64, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: Duration::from_millis(delay_ms),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    impl ThumbnailGenerator for SlowGenerator {
        fn generate(
            &self,
            source: &Path,
            size: ThumbnailSize,
        ) -> Result<DynamicImage, ThumbnailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                return Err(ThumbnailError::Decode {
                    path: source.to_path_buf(),
                    reason: "stub failure".into(),
                });
            }
            Ok(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
                size.width,
                size.height / 2,
                Rgb([1u8, 2, 3]),
            )))
        }
    }

    fn setup(
        generator: Arc<SlowGenerator>,
        use_cache: bool,
    ) -> (ThumbnailProvider, TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("photo.jpg");
        std::fs::write(&source, b"stub source").unwrap();

        let config = ProviderConfig {
            use_cache,
            cache_dir: dir.path().join("cache"),
            ..ProviderConfig::default()
        };
        let provider = ThumbnailProvider::with_generator(config, generator, Handle::current());
        (provider, dir, source)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_generate_once() {
        let generator = SlowGenerator::new(200, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);

        let size = ThumbnailSize::square(64);
        let first = provider.request(&source, size);
        let second = provider.request(&source, size);
        let (a, b) = tokio::join!(first, second);

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(generator.calls(), 1);
        assert_eq!(a.key, b.key);
        assert_eq!(a.image, b.image);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disk_cache_survives_new_provider() {
        let generator = SlowGenerator::new(0, false);
        let (provider, dir, source) = setup(Arc::clone(&generator), true);
        let size = ThumbnailSize::square(32);

        let generated = provider.request(&source, size).await.unwrap();
        assert_eq!(generated.origin, ThumbnailOrigin::Generated);
        assert!(dir.path().join("cache").join(generated.key.file_name()).is_file());

        let fresh = ThumbnailProvider::with_generator(
            ProviderConfig {
                cache_dir: dir.path().join("cache"),
                ..ProviderConfig::default()
            },
            Arc::clone(&generator) as Arc<dyn ThumbnailGenerator>,
            Handle::current(),
        );
        let cached = fresh.request(&source, size).await.unwrap();
        assert_eq!(cached.origin, ThumbnailOrigin::DiskCache);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cache_disabled_writes_nothing() {
        let generator = SlowGenerator::new(0, false);
        let (provider, dir, source) = setup(Arc::clone(&generator), false);
        let size = ThumbnailSize::square(32);

        provider.request(&source, size).await.unwrap();
        provider.request(&source, size).await.unwrap();

        assert_eq!(generator.calls(), 2);
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failures_are_not_cached() {
        let generator = SlowGenerator::new(0, true);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);
        let size = ThumbnailSize::square(32);

        let err = provider.request(&source, size).await.unwrap_err();
        assert!(matches!(err, ThumbnailError::Decode { .. }));
        assert!(provider.request(&source, size).await.is_err());
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_source() {
        let generator = SlowGenerator::new(0, false);
        let (provider, dir, _source) = setup(Arc::clone(&generator), true);
        let missing = dir.path().join("missing.jpg");

        let err = provider.request(&missing, ThumbnailSize::default()).await.unwrap_err();
        assert_eq!(err, ThumbnailError::NotFound(missing));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_request() {
        let generator = SlowGenerator::new(300, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);

        let request = provider.request(&source, ThumbnailSize::default());
        request.cancel();
        assert_eq!(request.await.unwrap_err(), ThumbnailError::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelling_first_requester_keeps_single_generation() {
        let generator = SlowGenerator::new(400, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);
        let size = ThumbnailSize::square(48);

        let first = provider.request(&source, size);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = provider.request(&source, size);
        tokio::time::sleep(Duration::from_millis(50)).await;
        first.cancel();

        let thumbnail = second.await.unwrap();
        assert_eq!(thumbnail.origin, ThumbnailOrigin::Generated);
        assert_eq!(generator.calls(), 1);
        assert_eq!(generator.peak(), 1);
        assert_eq!(first.await.unwrap_err(), ThumbnailError::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_changed_source_is_regenerated() {
        let generator = SlowGenerator::new(0, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);
        let size = ThumbnailSize::square(32);

        let before = provider.request(&source, size).await.unwrap();
        std::fs::write(&source, b"rewritten source with different length").unwrap();
        let after = provider.request(&source, size).await.unwrap();

        assert_eq!(after.origin, ThumbnailOrigin::Generated);
        assert_ne!(before.key, after.key);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_aborted_callback_never_runs() {
        let generator = SlowGenerator::new(200, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);
        let delivered = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&delivered);
        let handle = provider.request_with(&source, ThumbnailSize::default(), move |_| {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!delivered.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_callback_receives_result() {
        let generator = SlowGenerator::new(0, false);
        let (provider, _dir, source) = setup(Arc::clone(&generator), true);
        let (tx, rx) = tokio::sync::oneshot::channel();

        provider.request_with(&source, ThumbnailSize::square(40), move |result| {
            let _ = tx.send(result.map(|thumb| thumb.image.width()));
        });

        assert_eq!(rx.await.unwrap(), Ok(40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_real_thumbnailer_with_png() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("tall.png");
        ImageBuffer::from_pixel(50, 200, Rgb([9u8, 9, 9]))
            .save(&source)
            .unwrap();

        let provider = ThumbnailProvider::new(
            ProviderConfig {
                cache_dir: dir.path().join("cache"),
                ..ProviderConfig::default()
            },
            Handle::current(),
        );
        let thumb = provider.request(&source, ThumbnailSize::square(100)).await.unwrap();
        assert_eq!((thumb.image.width(), thumb.image.height()), (25, 100));
        assert_eq!(provider.clear_cache(), 1);
    }
}
