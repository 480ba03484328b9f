//! Sync executor - mirrors a local directory into a bucket.
//!
//! This module ties together:
//! - Manifest loading (one paginated listing per run)
//! - The lazy file system walker
//! - ETag-compatible fingerprints
//! - The transfer executor (`ObjectStore`)
//!
//! The mirror is additive: remote objects missing locally are left alone and
//! nothing is rolled back when an upload fails. Running the sync again is the
//! recovery path, since unchanged files are skipped.

pub mod manifest;

use crate::config::SyncConfig;
use crate::fs::walker::{walk_directory, LocalFile, WalkOptions};
use crate::sync::fingerprint::{fingerprint, Fingerprint, DEFAULT_CHUNK_SIZE};
use crate::transfer::{content_type, ObjectStore, UploadRequest};
use crate::utils::errors::{Result, WebautoError};
use manifest::Manifest;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Walked entries buffered ahead of the upload loop
const WALK_BUFFER: usize = 64;

/// Sync tuning
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fingerprint chunk size; also the multipart threshold and part size
    pub chunk_size: usize,
    /// Files in flight at once (1 = strictly sequential)
    pub max_concurrent_uploads: usize,
    pub walk: WalkOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_uploads: 1,
            walk: WalkOptions::default(),
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            max_concurrent_uploads: config.max_concurrent_uploads.max(1),
            walk: WalkOptions {
                follow_links: config.follow_links,
                exclude_patterns: config.exclude_patterns.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upload,
    Skip,
}

/// Decision for one local file
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub fingerprint: Option<Fingerprint>,
    pub action: Action,
}

/// Sync execution result
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub total_files: usize,
    pub uploaded_files: usize,
    pub uploaded_bytes: u64,
    pub skipped_files: usize,
    pub skipped_bytes: u64,
    /// Keys uploaded, in completion order
    pub uploaded_keys: Vec<String>,
    pub duration_secs: u64,
}

/// State shared between the scheduling loop and file tasks
#[derive(Default)]
struct Progress {
    failed: AtomicBool,
    first_error: Mutex<Option<WebautoError>>,
    report: Mutex<SyncReport>,
}

impl Progress {
    fn record(&self, outcome: Result<PlannedAction>) {
        match outcome {
            Ok(planned) => {
                let mut report = self.report.lock().unwrap_or_else(|e| e.into_inner());
                report.total_files += 1;
                match planned.action {
                    Action::Upload => {
                        report.uploaded_files += 1;
                        report.uploaded_bytes += planned.size;
                        report.uploaded_keys.push(planned.key);
                    }
                    Action::Skip => {
                        report.skipped_files += 1;
                        report.skipped_bytes += planned.size;
                    }
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, error: WebautoError) {
        let mut first = self.first_error.lock().unwrap_or_else(|e| e.into_inner());
        if first.is_none() {
            *first = Some(error);
        } else {
            warn!("Additional sync failure: {}", error);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Main sync executor
pub struct Syncer {
    store: Arc<dyn ObjectStore>,
    options: SyncOptions,
}

impl Syncer {
    pub fn new(store: Arc<dyn ObjectStore>, options: SyncOptions) -> Self {
        Self { store, options }
    }

    /// Upload every file under `local_root` whose fingerprint differs from
    /// the bucket's ETag for the same key.
    ///
    /// Fails before touching the bucket when the root does not exist. The
    /// first failure stops scheduling new files; uploads already running are
    /// allowed to finish and the first error is returned.
    pub async fn sync(&self, local_root: &Path, bucket: &str) -> Result<SyncReport> {
        let start_time = std::time::Instant::now();
        let root = resolve_root(local_root).await?;

        info!(
            "Syncing {} to s3://{} via {} (concurrency: {})",
            root.display(),
            bucket,
            self.store.name(),
            self.options.max_concurrent_uploads
        );

        let manifest = Arc::new(Manifest::load(self.store.as_ref(), bucket).await?);
        info!(
            "Manifest loaded: {} remote objects in {}",
            manifest.len(),
            manifest.bucket()
        );

        let (tx, mut rx) = mpsc::channel::<Result<LocalFile>>(WALK_BUFFER);
        let walk_root = root.clone();
        let walk_options = self.options.walk.clone();
        let walker = tokio::task::spawn_blocking(move || {
            for entry in walk_directory(&walk_root, walk_options) {
                if tx.blocking_send(entry).is_err() {
                    break;
                }
            }
        });

        let progress = Arc::new(Progress::default());
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_uploads.max(1)));
        let mut tasks = JoinSet::new();

        while let Some(entry) = rx.recv().await {
            let file = match entry {
                Ok(file) => file,
                Err(e) => {
                    progress.fail(e);
                    break;
                }
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| WebautoError::Config(format!("upload semaphore closed: {e}")))?;

            // Reap finished tasks so the set only holds files in flight
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    progress.fail(WebautoError::Join(e));
                }
            }

            // A finished task records its outcome before releasing its permit
            if progress.is_failed() {
                break;
            }

            let store = Arc::clone(&self.store);
            let manifest = Arc::clone(&manifest);
            let progress = Arc::clone(&progress);
            let bucket = bucket.to_string();
            let chunk_size = self.options.chunk_size;

            tasks.spawn(async move {
                let outcome = process_file(store.as_ref(), &manifest, &bucket, file, chunk_size).await;
                progress.record(outcome);
                drop(permit);
            });
        }

        // Stop the walker before waiting on it
        drop(rx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                progress.fail(WebautoError::Join(e));
            }
        }
        walker.await?;

        let first_error = progress
            .first_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let mut report = progress
            .report
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        report.duration_secs = start_time.elapsed().as_secs();

        if let Some(e) = first_error {
            warn!(
                "Sync aborted after {} uploaded, {} unchanged: {}",
                report.uploaded_files, report.skipped_files, e
            );
            return Err(e);
        }

        info!(
            "Sync completed: {} files, {} uploaded ({} bytes), {} unchanged ({} bytes), {}s",
            report.total_files,
            report.uploaded_files,
            report.uploaded_bytes,
            report.skipped_files,
            report.skipped_bytes,
            report.duration_secs
        );

        Ok(report)
    }

    /// Decide what a sync would do, without uploading anything.
    pub async fn plan(&self, local_root: &Path, bucket: &str) -> Result<Vec<PlannedAction>> {
        let root = resolve_root(local_root).await?;
        let manifest = Manifest::load(self.store.as_ref(), bucket).await?;
        let walk_options = self.options.walk.clone();
        let chunk_size = self.options.chunk_size;

        tokio::task::spawn_blocking(move || {
            walk_directory(&root, walk_options)
                .map(|entry| decide(entry?, &manifest, chunk_size))
                .collect::<Result<Vec<_>>>()
        })
        .await?
    }
}

/// Resolve the sync root to an absolute, symlink-free directory path.
///
/// A leading `~` is expanded to the home directory, so roots taken from a
/// config file or script behave as they would in a shell.
async fn resolve_root(local_root: &Path) -> Result<PathBuf> {
    let expanded = expand_home(local_root);
    let root = tokio::fs::canonicalize(&expanded).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WebautoError::NotFound(expanded.clone())
        } else {
            WebautoError::local_read(expanded.as_path(), e)
        }
    })?;

    if !tokio::fs::metadata(&root).await?.is_dir() {
        return Err(WebautoError::NotADirectory(root));
    }
    Ok(root)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Fingerprint a file and compare it against the manifest.
fn decide(file: LocalFile, manifest: &Manifest, chunk_size: usize) -> Result<PlannedAction> {
    let fingerprint = fingerprint(&file.path, chunk_size)?;
    let action = if manifest.matches(&file.key, fingerprint.as_ref()) {
        Action::Skip
    } else {
        Action::Upload
    };

    Ok(PlannedAction {
        key: file.key,
        path: file.path,
        size: file.size,
        fingerprint,
        action,
    })
}

/// Hash one file off the async runtime, then upload it unless unchanged.
async fn process_file(
    store: &dyn ObjectStore,
    manifest: &Arc<Manifest>,
    bucket: &str,
    file: LocalFile,
    chunk_size: usize,
) -> Result<PlannedAction> {
    let shared = Arc::clone(manifest);
    let planned = tokio::task::spawn_blocking(move || decide(file, &shared, chunk_size)).await??;

    match planned.action {
        Action::Skip => {
            debug!("Unchanged, skipping {}", planned.key);
        }
        Action::Upload => {
            let content_type = content_type::for_key(&planned.key);
            debug!(
                "Uploading {} ({} bytes in {} parts, {}, remote etag {:?})",
                planned.key,
                planned.size,
                planned.fingerprint.as_ref().map_or(1, Fingerprint::part_count),
                content_type,
                manifest.get(&planned.key)
            );

            store
                .upload(&UploadRequest {
                    bucket: bucket.to_string(),
                    key: planned.key.clone(),
                    path: planned.path.clone(),
                    size: planned.size,
                    content_type: content_type.to_string(),
                    chunk_size,
                })
                .await?;
        }
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn syncer(store: Arc<MemoryStore>) -> Syncer {
        Syncer::new(store, SyncOptions::default())
    }

    #[tokio::test]
    async fn test_missing_root_fails_before_listing() {
        let store = Arc::new(MemoryStore::new());
        let err = syncer(store.clone())
            .sync(Path::new("/nonexistent/webauto/site"), "site")
            .await
            .unwrap_err();

        assert!(matches!(err, WebautoError::NotFound(_)));
        assert_eq!(store.listing_calls().await, 0);
    }

    #[tokio::test]
    async fn test_file_root_rejected() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("index.html");
        fs::write(&file, b"x")?;

        let store = Arc::new(MemoryStore::new());
        let err = syncer(store).sync(&file, "site").await.unwrap_err();
        assert!(matches!(err, WebautoError::NotADirectory(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_marks_unchanged_files() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("same.html"), b"same")?;
        fs::write(temp_dir.path().join("new.html"), b"new")?;

        let store = Arc::new(MemoryStore::new());
        let etag = crate::sync::fingerprint::fingerprint_reader(&b"same"[..], DEFAULT_CHUNK_SIZE)?
            .map(String::from)
            .unwrap();
        store.insert("site", "same.html", b"same".to_vec(), &etag).await;

        let mut plan = syncer(store.clone()).plan(temp_dir.path(), "site").await.unwrap();
        plan.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].key, "new.html");
        assert_eq!(plan[0].action, Action::Upload);
        assert_eq!(plan[1].key, "same.html");
        assert_eq!(plan[1].action, Action::Skip);
        assert!(store.uploads().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_sets_content_type() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("style.css"), b"body {}")?;
        fs::write(temp_dir.path().join("blob.bin"), b"\x00\x01")?;

        let store = Arc::new(MemoryStore::new());
        syncer(store.clone()).sync(temp_dir.path(), "site").await.unwrap();

        let css = store.object("site", "style.css").await.unwrap();
        assert_eq!(css.content_type, "text/css");
        let bin = store.object("site", "blob.bin").await.unwrap();
        assert_eq!(bin.content_type, "text/plain");
        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_sync_stops_at_first_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        for name in ["a.html", "b.html", "c.html"] {
            fs::write(temp_dir.path().join(name), name.as_bytes())?;
        }

        let store = Arc::new(MemoryStore::new());
        // Whichever file the walk yields first is the one that fails
        for name in ["a.html", "b.html", "c.html"] {
            store.fail_uploads_of(name).await;
        }

        let err = syncer(store.clone()).sync(temp_dir.path(), "site").await.unwrap_err();
        assert!(matches!(err, WebautoError::RemoteWrite { .. }));
        assert!(store.uploads().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_vanished_file_is_local_read_error() {
        let store = MemoryStore::new();
        let manifest = Arc::new(Manifest::default());
        let file = LocalFile {
            path: PathBuf::from("/nonexistent/webauto/gone.html"),
            key: "gone.html".to_string(),
            size: 4,
        };

        let err = process_file(&store, &manifest, "site", file, DEFAULT_CHUNK_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, WebautoError::LocalRead { .. }));
        assert!(store.uploads().await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_halts_sync() -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new()?;
        let locked = temp_dir.path().join("locked.html");
        fs::write(&locked, b"secret")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        // Permission bits do not apply to root
        if fs::read(&locked).is_ok() {
            return Ok(());
        }

        let store = Arc::new(MemoryStore::new());
        let result = syncer(store.clone()).sync(temp_dir.path(), "site").await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644))?;

        let err = result.unwrap_err();
        assert!(matches!(err, WebautoError::LocalRead { .. }));
        assert!(store.uploads().await.is_empty());
        Ok(())
    }

    /// Holds every upload until `in_flight` of them have started, then fails
    /// `failing_key` at once while the rest finish a little later.
    struct GatedStore {
        inner: MemoryStore,
        gate: tokio::sync::Barrier,
        failing_key: String,
    }

    #[async_trait::async_trait]
    impl ObjectStore for GatedStore {
        async fn list_objects_page(
            &self,
            bucket: &str,
            continuation: Option<String>,
        ) -> Result<crate::transfer::ObjectPage> {
            self.inner.list_objects_page(bucket, continuation).await
        }

        async fn upload(&self, request: &UploadRequest) -> Result<()> {
            self.gate.wait().await;
            if request.key == self.failing_key {
                return Err(WebautoError::RemoteWrite {
                    key: request.key.clone(),
                    message: "upload rejected".to_string(),
                });
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.inner.upload(request).await
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_failure_lets_inflight_uploads_finish() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        for name in ["a.html", "b.html", "c.html", "d.html"] {
            fs::write(temp_dir.path().join(name), name.as_bytes())?;
        }

        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: tokio::sync::Barrier::new(4),
            failing_key: "c.html".to_string(),
        });
        let options = SyncOptions {
            max_concurrent_uploads: 4,
            ..SyncOptions::default()
        };

        let err = Syncer::new(store.clone(), options)
            .sync(temp_dir.path(), "site")
            .await
            .unwrap_err();

        match err {
            WebautoError::RemoteWrite { key, .. } => assert_eq!(key, "c.html"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.inner.keys("site").await, vec!["a.html", "b.html", "d.html"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_large_tree_with_bounded_concurrency() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        for i in 0..300 {
            fs::write(temp_dir.path().join(format!("page{i:03}.html")), format!("page {i}"))?;
        }

        let store = Arc::new(MemoryStore::new());
        let options = SyncOptions {
            max_concurrent_uploads: 2,
            ..SyncOptions::default()
        };
        let syncer = Syncer::new(store.clone(), options);

        let report = syncer.sync(temp_dir.path(), "site").await.unwrap();
        assert_eq!(report.uploaded_files, 300);
        assert_eq!(report.uploaded_keys.len(), 300);
        assert_eq!(store.keys("site").await.len(), 300);
        Ok(())
    }

    #[test]
    fn test_expand_home_prefix() {
        assert_eq!(expand_home(Path::new("/srv/site")), PathBuf::from("/srv/site"));
        assert_eq!(expand_home(Path::new("site/~draft")), PathBuf::from("site/~draft"));

        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home(Path::new("~/site")), PathBuf::from(home).join("site"));
        }
    }

    #[tokio::test]
    async fn test_options_from_config() {
        let config = SyncConfig {
            chunk_size: 1024,
            max_concurrent_uploads: 0,
            exclude_patterns: vec![".git".into()],
            follow_links: false,
        };
        let options = SyncOptions::from(&config);
        assert_eq!(options.chunk_size, 1024);
        assert_eq!(options.max_concurrent_uploads, 1);
        assert!(!options.walk.follow_links);
        assert_eq!(options.walk.exclude_patterns, vec![".git".to_string()]);
    }
}
