//! 临时写入与原子重命名提交。

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{TEMP_FILE_PREFIX, TEMP_FILE_SUFFIX};

/// 仓库目录内的临时文件；提交前对列表与下载不可见。
///
/// 未提交即被丢弃（包括调用方取消上传 future）时，临时文件会被删除。
pub struct AtomicFile {
    file: File,
    guard: TempGuard,
}

struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed abandoned upload temp file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to remove upload temp file"),
        }
    }
}

impl AtomicFile {
    /// 在目标目录中创建唯一命名的临时文件。
    pub async fn create_in(dir: &Path) -> io::Result<Self> {
        let path = dir.join(temp_file_name());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self {
            file,
            guard: TempGuard { path, armed: true },
        })
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    #[cfg(test)]
    pub fn temp_path(&self) -> &Path {
        &self.guard.path
    }

    /// 刷盘后以 rename 原子地发布到 `target`，返回提交时的文件元数据。
    ///
    /// rename 会覆盖已存在的目标，调用方需先确认目标名称空闲。
    pub async fn commit(self, target: &Path) -> io::Result<Metadata> {
        let AtomicFile { mut file, mut guard } = self;
        file.flush().await?;
        file.sync_all().await?;
        let metadata = file.metadata().await?;
        drop(file);

        fs::rename(&guard.path, target).await?;
        guard.armed = false;

        if let Some(parent) = target.parent()
            && let Err(err) = sync_dir(parent).await
        {
            debug!(error = %err, "directory sync after commit failed");
        }
        Ok(metadata)
    }
}

/// 判断目录项是否是上传过程中的临时文件。
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_FILE_PREFIX) && name.ends_with(TEMP_FILE_SUFFIX)
}

fn temp_file_name() -> String {
    format!("{TEMP_FILE_PREFIX}{}{TEMP_FILE_SUFFIX}", Uuid::new_v4())
}

async fn sync_dir(path: &Path) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = std::fs::File::open(path)?;
        dir.sync_all()
    })
    .await
    .map_err(|err| io::Error::other(err.to_string()))?
}
