use chrono::{DateTime, Utc};
use futures_util::stream::Stream;
use serde::Serialize;
use std::fmt::{self, Display};
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File};
use tracing::{debug, info};

use crate::atomic::{AtomicFile, is_temp_file_name};
use crate::config::NAME_LOCK_WAIT_SECS;
use crate::locking::NameLocks;
use crate::names::{self, ConflictPolicy, SafeName};
use crate::transfer::{self, ByteStream};

/// 单目录文件仓库。构造时固定绝对根路径，以 `Arc` 共享给所有请求。
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    policy: ConflictPolicy,
    locks: NameLocks,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredFile {
    fn from_metadata(name: String, metadata: &Metadata) -> Self {
        Self {
            name,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

/// 一次上传请求：仅在 `put` 调用期间存在。
pub struct PendingUpload<S> {
    pub declared_name: String,
    pub source: S,
    pub declared_size: Option<u64>,
}

impl<S> PendingUpload<S> {
    pub fn new(declared_name: impl Into<String>, source: S) -> Self {
        Self {
            declared_name: declared_name.into(),
            source,
            declared_size: None,
        }
    }

    pub fn with_declared_size(mut self, size: Option<u64>) -> Self {
        self.declared_size = size;
        self
    }
}

pub struct Download {
    pub file: StoredFile,
    pub stream: ByteStream,
}

impl Repository {
    /// 打开（必要时创建）仓库目录并规范化为绝对路径。
    pub async fn open(root: impl Into<PathBuf>, policy: ConflictPolicy) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        let root = fs::canonicalize(&root)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        let metadata = fs::metadata(&root)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        if !metadata.is_dir() {
            return Err(StoreError::StoreUnavailable(io::Error::other(
                "storage root is not a directory",
            )));
        }
        info!(root = %root.display(), ?policy, "repository opened");
        Ok(Self {
            root,
            policy,
            locks: NameLocks::new(),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        let mut files = Vec::new();

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(StoreError::StoreUnavailable)?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if names::resolve(&name).is_err() {
                continue;
            }
            // file_type 不跟随符号链接
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::StoreUnavailable(err)),
            };
            if !file_type.is_file() {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::StoreUnavailable(err)),
            };
            files.push(StoredFile::from_metadata(name, &metadata));
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn put<S, B, E>(&self, upload: PendingUpload<S>) -> Result<StoredFile, StoreError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let name = names::resolve(&upload.declared_name)?;
        if self.policy == ConflictPolicy::Reject && self.is_taken(&name).await? {
            return Err(StoreError::NameConflict(name.into_string()));
        }

        let (temp, size) =
            transfer::copy_in(upload.source, upload.declared_size, &self.root).await?;
        debug!(name = %name, size, "upload received, committing");
        self.commit(temp, name).await
    }

    async fn commit(&self, temp: AtomicFile, name: SafeName) -> Result<StoredFile, StoreError> {
        let wait = Duration::from_secs(NAME_LOCK_WAIT_SECS);
        for candidate in names::candidates(&name, self.policy) {
            let _guard = self.locks.lock(&candidate, wait).await.map_err(|_| {
                StoreError::WriteFailed(io::Error::new(
                    ErrorKind::TimedOut,
                    "timed out waiting for name lock",
                ))
            })?;
            if self.is_taken(&candidate).await? {
                continue;
            }
            let target = self.root.join(candidate.as_str());
            let metadata = temp
                .commit(&target)
                .await
                .map_err(StoreError::WriteFailed)?;
            return Ok(StoredFile::from_metadata(candidate.into_string(), &metadata));
        }
        Err(StoreError::NameConflict(name.into_string()))
    }

    pub async fn get(&self, raw: &str) -> Result<Download, StoreError> {
        let name = names::resolve(raw)?;
        let path = self.root.join(name.as_str());
        // 先看目录项本身：符号链接、FIFO 等一律视为不存在，打开前就拒绝
        #[cfg_attr(not(unix), allow(unused_variables))]
        let on_disk = match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(StoreError::NotFound(name.into_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.into_string()));
            }
            Err(err) => return Err(StoreError::StoreUnavailable(err)),
        };
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.into_string()));
            }
            Err(err) => return Err(StoreError::StoreUnavailable(err)),
        };
        let opened = file
            .metadata()
            .await
            .map_err(StoreError::StoreUnavailable)?;
        if !opened.is_file() {
            return Err(StoreError::NotFound(name.into_string()));
        }
        // 检查与打开之间目录项被替换时，句柄不再是同一个文件
        #[cfg(unix)]
        if !same_file(&opened, &on_disk) {
            return Err(StoreError::NotFound(name.into_string()));
        }

        let stored = StoredFile::from_metadata(name.into_string(), &opened);
        let stream = transfer::copy_out(file, stored.size);
        Ok(Download {
            file: stored,
            stream,
        })
    }

    pub async fn delete(&self, raw: &str) -> Result<(), StoreError> {
        let name = names::resolve(raw)?;
        let path = self.root.join(name.as_str());
        match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound(name.into_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.into_string()));
            }
            Err(err) => return Err(StoreError::StoreUnavailable(err)),
        }
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.into_string()))
            }
            Err(err) => Err(StoreError::WriteFailed(err)),
        }
    }

    /// 删除崩溃后遗留、且早于 `max_age` 的上传临时文件。
    pub async fn sweep_stale_uploads(&self, max_age: Duration) -> Result<usize, StoreError> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(StoreError::StoreUnavailable)?
        {
            if !is_temp_file_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let Ok(metadata) = fs::symlink_metadata(entry.path()).await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::WriteFailed(err)),
            }
        }

        Ok(removed)
    }

    /// 清理空闲的文件名锁。
    pub async fn prune_locks(&self) -> usize {
        self.locks.prune().await
    }

    async fn is_taken(&self, name: &SafeName) -> Result<bool, StoreError> {
        match fs::symlink_metadata(self.root.join(name.as_str())).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::WriteFailed(err)),
        }
    }
}

#[cfg(unix)]
fn same_file(opened: &Metadata, checked: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    opened.dev() == checked.dev() && opened.ino() == checked.ino()
}

#[derive(Debug)]
pub enum StoreError {
    InvalidName(String),
    NotFound(String),
    NameConflict(String),
    WriteFailed(io::Error),
    TransferInterrupted(String),
    StoreUnavailable(io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidName(reason) => write!(f, "invalid name: {reason}"),
            StoreError::NotFound(name) => write!(f, "file not found: {name}"),
            StoreError::NameConflict(name) => write!(f, "name already exists: {name}"),
            StoreError::WriteFailed(err) => write!(f, "write failed: {err}"),
            StoreError::TransferInterrupted(reason) => write!(f, "transfer interrupted: {reason}"),
            StoreError::StoreUnavailable(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::WriteFailed(err) | StoreError::StoreUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    async fn make_repo(policy: ConflictPolicy) -> (TempDir, Repository) {
        let temp = tempdir().expect("tempdir");
        let repo = Repository::open(temp.path().join("upload"), policy)
            .await
            .expect("open repository");
        (temp, repo)
    }

    type ChunkStream = stream::Iter<std::vec::IntoIter<io::Result<Vec<u8>>>>;

    fn upload(name: &str, data: &[u8]) -> PendingUpload<ChunkStream> {
        let chunks: Vec<io::Result<Vec<u8>>> =
            data.chunks(1024).map(|chunk| Ok(chunk.to_vec())).collect();
        PendingUpload::new(name, stream::iter(chunks))
    }

    async fn read_all(download: Download) -> Vec<u8> {
        let mut stream = download.stream;
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.expect("chunk"));
        }
        out
    }

    fn names(files: &[StoredFile]) -> Vec<&str> {
        files.iter().map(|file| file.name.as_str()).collect()
    }

    fn raw_entries(repo: &Repository) -> Vec<String> {
        let mut entries: Vec<String> = std::fs::read_dir(repo.root_path())
            .expect("read root")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn open_creates_absolute_root() {
        let (temp, repo) = make_repo(ConflictPolicy::Reject).await;
        assert!(repo.root_path().is_absolute());
        assert!(temp.path().join("upload").is_dir());
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn report_scenario() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;

        let stored = repo
            .put(upload("report.txt", b"0123456789"))
            .await
            .expect("upload");
        assert_eq!(stored.name, "report.txt");
        assert_eq!(stored.size, 10);

        let files = repo.list().await.expect("list");
        assert_eq!(names(&files), ["report.txt"]);
        assert_eq!(files[0].size, 10);
        assert!(files[0].last_modified.is_some());

        let download = repo.get("report.txt").await.expect("download");
        assert_eq!(download.file.size, 10);
        assert_eq!(read_all(download).await, b"0123456789");

        repo.delete("report.txt").await.expect("delete");
        assert!(repo.list().await.expect("list").is_empty());
        assert!(matches!(
            repo.get("report.txt").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn round_trip_preserves_binary_content() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let source = stream::iter(
            data.chunks(8192)
                .map(|chunk| Ok::<_, io::Error>(chunk.to_vec()))
                .collect::<Vec<_>>(),
        );
        let stored = repo
            .put(PendingUpload::new("blob.bin", source).with_declared_size(Some(data.len() as u64)))
            .await
            .expect("upload");
        assert_eq!(stored.size, data.len() as u64);

        let download = repo.get("blob.bin").await.expect("download");
        assert_eq!(read_all(download).await, data);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        repo.put(upload("gone.txt", b"bye")).await.expect("upload");

        repo.delete("gone.txt").await.expect("first delete");
        assert!(matches!(
            repo.delete("gone.txt").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn interrupted_upload_leaves_nothing_visible() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let source = stream::iter(vec![
            Ok(b"partial ".to_vec()),
            Ok(b"bytes".to_vec()),
            Err(io::Error::new(ErrorKind::ConnectionReset, "connection reset")),
        ]);
        let result = repo.put(PendingUpload::new("broken.txt", source)).await;

        assert!(matches!(result, Err(StoreError::TransferInterrupted(_))));
        assert!(repo.list().await.expect("list").is_empty());
        assert!(raw_entries(&repo).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_upload_removes_temp_file() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let source = stream::iter(vec![Ok::<_, io::Error>(b"first chunk".to_vec())])
            .chain(stream::pending());
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            repo.put(PendingUpload::new("slow.txt", source)),
        )
        .await;

        assert!(result.is_err());
        assert!(raw_entries(&repo).is_empty());
    }

    #[tokio::test]
    async fn invalid_names_never_touch_disk() {
        let (temp, repo) = make_repo(ConflictPolicy::Reject).await;
        for raw in ["../escape.txt", "/etc/passwd", "a/b", "", "  "] {
            assert!(matches!(
                repo.put(upload(raw, b"x")).await,
                Err(StoreError::InvalidName(_))
            ));
            assert!(matches!(repo.get(raw).await, Err(StoreError::InvalidName(_))));
            assert!(matches!(
                repo.delete(raw).await,
                Err(StoreError::InvalidName(_))
            ));
        }
        assert!(raw_entries(&repo).is_empty());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_uploads_of_different_names() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let repo = Arc::new(repo);

        let first = tokio::spawn({
            let repo = repo.clone();
            async move { repo.put(upload("left.bin", &[1u8; 50_000])).await }
        });
        let second = tokio::spawn({
            let repo = repo.clone();
            async move { repo.put(upload("right.bin", &[2u8; 70_000])).await }
        });
        first.await.expect("join").expect("left upload");
        second.await.expect("join").expect("right upload");

        let files = repo.list().await.expect("list");
        assert_eq!(names(&files), ["left.bin", "right.bin"]);
        let left = read_all(repo.get("left.bin").await.expect("left")).await;
        let right = read_all(repo.get("right.bin").await.expect("right")).await;
        assert!(left.len() == 50_000 && left.iter().all(|b| *b == 1));
        assert!(right.len() == 70_000 && right.iter().all(|b| *b == 2));
    }

    async fn put_same_name_concurrently(
        repo: &Arc<Repository>,
        count: u8,
    ) -> Vec<Result<StoredFile, StoreError>> {
        let tasks: Vec<_> = (0..count)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.put(upload("same.txt", &vec![i; 20_000])).await })
            })
            .collect();
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.expect("join"));
        }
        results
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_uploads_under_reject_keep_one_winner() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let repo = Arc::new(repo);

        let results = put_same_name_concurrently(&repo, 16).await;
        let stored: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::NameConflict(_))))
            .count();
        assert_eq!(stored.len(), 1);
        assert_eq!(conflicts, 15);

        assert_eq!(names(&repo.list().await.expect("list")), ["same.txt"]);
        assert_eq!(raw_entries(&repo), ["same.txt"]);
        let content = read_all(repo.get("same.txt").await.expect("get")).await;
        assert_eq!(content.len(), 20_000);
        assert!(content.iter().all(|b| *b == content[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_uploads_under_rename_all_land() {
        let (_temp, repo) = make_repo(ConflictPolicy::Rename).await;
        let repo = Arc::new(repo);

        let results = put_same_name_concurrently(&repo, 16).await;
        let mut stored: Vec<String> = results
            .into_iter()
            .map(|r| r.expect("upload").name)
            .collect();
        stored.sort();
        let mut expected: Vec<String> = (1..16).map(|n| format!("same ({n}).txt")).collect();
        expected.push("same.txt".to_string());
        expected.sort();
        assert_eq!(stored, expected);

        let files = repo.list().await.expect("list");
        assert_eq!(files.len(), 16);
        assert!(files.iter().all(|file| file.size == 20_000));
        assert_eq!(raw_entries(&repo).len(), 16);
    }

    #[tokio::test]
    async fn unwritable_root_reports_write_failed() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        std::fs::remove_dir(repo.root_path()).expect("remove root");
        assert!(matches!(
            repo.put(upload("lost.txt", b"data")).await,
            Err(StoreError::WriteFailed(_))
        ));

        let (_temp, repo) = make_repo(ConflictPolicy::Rename).await;
        std::fs::remove_dir(repo.root_path()).expect("remove root");
        std::fs::write(repo.root_path(), b"not a directory").expect("replace root");
        assert!(matches!(
            repo.put(upload("lost.txt", b"data")).await,
            Err(StoreError::WriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn list_is_sorted_by_name() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        for name in ["b", "a", "c"] {
            repo.put(upload(name, name.as_bytes())).await.expect("upload");
        }
        let files = repo.list().await.expect("list");
        assert_eq!(names(&files), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn list_skips_directories_and_temp_files() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        repo.put(upload("kept.txt", b"kept")).await.expect("upload");
        std::fs::create_dir(repo.root_path().join("subdir")).expect("mkdir");
        std::fs::write(repo.root_path().join(".upload-left-over.part"), b"junk").expect("write");

        let files = repo.list().await.expect("list");
        assert_eq!(names(&files), ["kept.txt"]);
        assert!(matches!(repo.get("subdir").await, Err(StoreError::NotFound(_))));
        assert!(matches!(repo.delete("subdir").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn reject_policy_keeps_existing_content() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        repo.put(upload("report.txt", b"original")).await.expect("upload");

        let result = repo.put(upload("report.txt", b"replacement")).await;
        assert!(matches!(result, Err(StoreError::NameConflict(name)) if name == "report.txt"));
        let content = read_all(repo.get("report.txt").await.expect("get")).await;
        assert_eq!(content, b"original");
        assert_eq!(raw_entries(&repo), ["report.txt"]);
    }

    #[tokio::test]
    async fn rename_policy_picks_next_free_name() {
        let (_temp, repo) = make_repo(ConflictPolicy::Rename).await;
        repo.put(upload("report.txt", b"one")).await.expect("first");
        let second = repo.put(upload("report.txt", b"two")).await.expect("second");
        let third = repo.put(upload("report.txt", b"three")).await.expect("third");

        assert_eq!(second.name, "report (1).txt");
        assert_eq!(third.name, "report (2).txt");
        let files = repo.list().await.expect("list");
        assert_eq!(names(&files), ["report (1).txt", "report (2).txt", "report.txt"]);
        let content = read_all(repo.get("report.txt").await.expect("get")).await;
        assert_eq!(content, b"one");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_not_served() {
        use std::os::unix::fs::symlink;

        let (temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret").expect("write outside file");
        symlink(&outside, repo.root_path().join("link.txt")).expect("symlink");

        assert!(repo.list().await.expect("list").is_empty());
        assert!(matches!(repo.get("link.txt").await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            repo.delete("link.txt").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.put(upload("link.txt", b"overwrite")).await,
            Err(StoreError::NameConflict(_))
        ));
        assert_eq!(std::fs::read(&outside).expect("read outside"), b"secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fifo_is_not_served() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        let fifo = repo.root_path().join("pipe");
        let status = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .expect("run mkfifo");
        assert!(status.success());
        std::os::unix::fs::symlink(&fifo, repo.root_path().join("pipe-link")).expect("symlink");

        for name in ["pipe", "pipe-link"] {
            let result = tokio::time::timeout(Duration::from_secs(2), repo.get(name))
                .await
                .expect("get must not block on a fifo");
            assert!(matches!(result, Err(StoreError::NotFound(_))));
            assert!(matches!(repo.delete(name).await, Err(StoreError::NotFound(_))));
        }
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_unavailable() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        std::fs::remove_dir_all(repo.root_path()).expect("remove root");

        assert!(matches!(
            repo.list().await,
            Err(StoreError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn sweep_removes_only_temp_files() {
        let (_temp, repo) = make_repo(ConflictPolicy::Reject).await;
        repo.put(upload("kept.txt", b"kept")).await.expect("upload");
        std::fs::write(repo.root_path().join(".upload-stale.part"), b"junk").expect("write");

        assert_eq!(
            repo.sweep_stale_uploads(Duration::from_secs(3600))
                .await
                .expect("sweep"),
            0
        );
        assert_eq!(
            repo.sweep_stale_uploads(Duration::ZERO).await.expect("sweep"),
            1
        );
        assert_eq!(raw_entries(&repo), ["kept.txt"]);
    }
}
