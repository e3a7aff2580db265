//! CLI 参数与服务默认配置。

use clap::Parser;

use crate::names::ConflictPolicy;

pub const AUTH_COOKIE_NAME: &str = "FILEDEPOT_SESSION";
pub const DEFAULT_AUTH_USER: &str = "depot";
pub const DEFAULT_AUTH_PASS: &str = "depot";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_STALE_UPLOAD_TTL_SECS: u64 = 24 * 60 * 60;
pub const SESSION_PRUNE_INTERVAL_SECS: u64 = 300;
pub const UPLOAD_SWEEP_INTERVAL_SECS: u64 = 900;
pub const NAME_LOCK_WAIT_SECS: u64 = 10;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// 单个文件名允许的最大字节数（与常见文件系统一致）。
pub const MAX_NAME_LEN: usize = 255;
/// 冲突重命名时最多尝试的编号。
pub const MAX_NAME_DECORATIONS: u32 = 1000;
pub const TEMP_FILE_PREFIX: &str = ".upload-";
pub const TEMP_FILE_SUFFIX: &str = ".part";
pub const TRANSFER_BUFFER_SIZE: usize = 64 * 1024;

/// 服务端 CLI 参数（均可由环境变量覆盖）。
#[derive(Parser, Debug)]
#[command(name = "filedepot", version, about = "Authenticated single-directory file repository")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "FILEDEPOT_STORAGE_DIR",
        default_value = "upload",
        help = "Upload directory"
    )]
    pub storage_dir: String,
    #[arg(
        long,
        env = "FILEDEPOT_AUTH_USER",
        default_value = DEFAULT_AUTH_USER,
        help = "Auth username"
    )]
    pub auth_user: String,
    #[arg(
        long,
        env = "FILEDEPOT_AUTH_PASS",
        default_value = DEFAULT_AUTH_PASS,
        help = "Auth password"
    )]
    pub auth_pass: String,
    #[arg(
        short = 'b',
        long,
        env = "FILEDEPOT_BIND",
        default_value = "127.0.0.1",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "FILEDEPOT_PORT",
        default_value_t = 8080,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(long, env = "FILEDEPOT_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "FILEDEPOT_SESSION_TTL_SECS",
        default_value_t = DEFAULT_SESSION_TTL_SECS,
        help = "Session expiration in seconds"
    )]
    pub session_ttl_secs: u64,
    #[arg(
        long,
        env = "FILEDEPOT_ON_CONFLICT",
        value_enum,
        default_value_t = ConflictPolicy::Reject,
        help = "What to do when an uploaded name already exists"
    )]
    pub on_conflict: ConflictPolicy,
    #[arg(
        long,
        env = "FILEDEPOT_STALE_UPLOAD_TTL_SECS",
        default_value_t = DEFAULT_STALE_UPLOAD_TTL_SECS,
        help = "Remove abandoned upload temp files older than this (0 to disable)"
    )]
    pub stale_upload_ttl_secs: u64,
    #[arg(
        long,
        env = "FILEDEPOT_LOG_LEVEL",
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,
}
