//! 文件名解析：把客户端提供的名称映射为仓库目录内安全、唯一的文件名。

use clap::ValueEnum;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path};

use crate::config::{MAX_NAME_DECORATIONS, MAX_NAME_LEN};
use crate::storage::StoreError;

/// 通过校验的文件名：恰好是一个普通路径段，不会指向仓库根目录之外。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafeName(String);

impl SafeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 上传目标名称已存在时的处理策略。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// 拒绝上传并返回 `NameConflict`。
    #[default]
    Reject,
    /// 追加编号生成新名称，例如 `report (1).txt`。
    Rename,
}

/// 校验原始文件名。
///
/// 不做任何“修剪”：含分隔符、`..`、绝对路径前缀或控制字符的名称一律拒绝。
/// 以 `.` 开头的名称保留给进行中的临时文件。
pub fn resolve(raw: &str) -> Result<SafeName, StoreError> {
    if raw.trim().is_empty() {
        return Err(StoreError::InvalidName("name is empty".into()));
    }
    if raw.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName("name is too long".into()));
    }
    if raw.chars().any(char::is_control) {
        return Err(StoreError::InvalidName(
            "name contains control characters".into(),
        ));
    }
    if raw.contains(['/', '\\']) {
        return Err(StoreError::InvalidName(
            "name contains a path separator".into(),
        ));
    }
    if raw.starts_with('.') {
        return Err(StoreError::InvalidName("name must not start with '.'".into()));
    }

    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(segment)), None) if segment == OsStr::new(raw) => {
            Ok(SafeName(raw.to_string()))
        }
        _ => Err(StoreError::InvalidName(
            "name must be a single path segment".into(),
        )),
    }
}

/// 按策略依次给出候选名称：原名在前，重命名策略下再接编号变体。
pub fn candidates(name: &SafeName, policy: ConflictPolicy) -> impl Iterator<Item = SafeName> + '_ {
    let limit = match policy {
        ConflictPolicy::Reject => 0,
        ConflictPolicy::Rename => MAX_NAME_DECORATIONS,
    };
    std::iter::once(name.clone()).chain((1..=limit).filter_map(move |n| decorated(name, n)))
}

fn decorated(name: &SafeName, n: u32) -> Option<SafeName> {
    let (stem, ext) = match name.0.find('.') {
        Some(index) => name.0.split_at(index),
        None => (name.0.as_str(), ""),
    };
    resolve(&format!("{stem} ({n}){ext}")).ok()
}
