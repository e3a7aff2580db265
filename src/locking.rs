//! 按文件名加锁：串行化同名提交的“检查是否存在 + 重命名”步骤。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{self, error::Elapsed};

use crate::names::SafeName;

#[derive(Debug, Default)]
pub struct NameLocks {
    locks: Mutex<HashMap<SafeName, Arc<Mutex<()>>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在超时时间内获取某个文件名的锁。
    pub async fn lock(
        &self,
        name: &SafeName,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<()>, Elapsed> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(name.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        time::timeout(timeout, lock.lock_owned()).await
    }

    /// 移除无人持有也无人等待的锁，返回剩余数量。
    pub async fn prune(&self) -> usize {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::resolve;

    #[tokio::test]
    async fn second_lock_on_same_name_waits() {
        let locks = NameLocks::new();
        let name = resolve("a.txt").expect("valid name");
        let guard = locks
            .lock(&name, Duration::from_millis(50))
            .await
            .expect("first lock");
        assert!(locks.lock(&name, Duration::from_millis(20)).await.is_err());

        let other = resolve("b.txt").expect("valid name");
        assert!(locks.lock(&other, Duration::from_millis(20)).await.is_ok());

        drop(guard);
        assert!(locks.lock(&name, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = NameLocks::new();
        let held = resolve("held").expect("valid name");
        let idle = resolve("idle").expect("valid name");
        let _guard = locks
            .lock(&held, Duration::from_millis(50))
            .await
            .expect("lock held");
        drop(locks.lock(&idle, Duration::from_millis(50)).await);

        assert_eq!(locks.prune().await, 1);
    }
}
