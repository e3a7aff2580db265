//! 后台任务：会话清理、文件名锁清理与遗留上传临时文件清理。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::config::{SESSION_PRUNE_INTERVAL_SECS, UPLOAD_SWEEP_INTERVAL_SECS};
use crate::storage::Repository;

/// 启动后台任务；`stale_upload_ttl` 为零时不清理临时文件。
pub fn spawn_background_tasks(
    repo: Arc<Repository>,
    auth: Arc<AuthContext>,
    stale_upload_ttl: Duration,
) {
    let repo_for_locks = repo.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_PRUNE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let sessions = auth.sessions().prune_expired().await;
            let locks = repo_for_locks.prune_locks().await;
            debug!(sessions, locks, "pruned sessions and name locks");
        }
    });

    if stale_upload_ttl.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(UPLOAD_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match repo.sweep_stale_uploads(stale_upload_ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "removed stale upload temp files"),
                Err(err) => warn!(error = %err, "stale upload sweep failed"),
            }
        }
    });
}
