//! 认证上下文：凭据校验、会话管理，以及把已认证主体传给处理器的中间件。

use axum::extract::{Extension, Json};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::{body::Body as AxumBody, middleware, response::IntoResponse};
use axum_extra::extract::{CookieJar, TypedHeader, cookie::Cookie};
use axum_extra::headers::{Authorization, authorization::Basic};
use cookie::time::Duration as CookieDuration;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AUTH_COOKIE_NAME;
use crate::error::ApiError;
use crate::http::is_https_request;

/// 显式传入 HTTP 层的认证状态，不使用进程级全局变量。
#[derive(Debug)]
pub struct AuthContext {
    credentials: Credentials,
    sessions: SessionStore,
}

#[derive(Debug)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug)]
pub struct SessionStore {
    entries: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

#[derive(Debug)]
struct SessionEntry {
    username: String,
    expires_at: Instant,
}

/// 通过认证的请求主体，由中间件写入请求扩展。
#[derive(Clone, Debug)]
pub struct Principal {
    pub username: String,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

impl AuthContext {
    pub fn new(username: String, password: String, session_ttl: Duration) -> Self {
        Self {
            credentials: Credentials { username, password },
            sessions: SessionStore::new(session_ttl),
        }
    }

    fn check_credentials(&self, username: &str, password: &str) -> Option<Principal> {
        (username == self.credentials.username && password == self.credentials.password).then(
            || Principal {
                username: username.to_string(),
            },
        )
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 为主体创建新会话，返回会话令牌。
    pub async fn create(&self, principal: &Principal) -> String {
        let token = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().await;
        entries.insert(
            token.clone(),
            SessionEntry {
                username: principal.username.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// 校验令牌；过期的会话顺便移除。
    pub async fn validate(&self, token: &str) -> Option<Principal> {
        let mut entries = self.entries.lock().await;
        match entries.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Some(Principal {
                username: entry.username.clone(),
            }),
            _ => {
                entries.remove(token);
                None
            }
        }
    }

    pub async fn remove(&self, token: &str) {
        self.entries.lock().await.remove(token);
    }

    /// 清理过期会话，返回剩余数量。
    pub async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }
}

/// 认证中间件：接受会话 Cookie 或 Basic 认证，并把 `Principal` 交给后续处理器。
pub async fn auth_middleware(
    Extension(auth): Extension<Arc<AuthContext>>,
    jar: CookieJar,
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    mut req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    if is_auth_exempt_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let mut principal = None;
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME) {
        principal = auth.sessions.validate(cookie.value()).await;
    }
    if principal.is_none()
        && let Some(TypedHeader(basic)) = auth_header
    {
        principal = auth.check_credentials(basic.username(), basic.password());
    }

    match principal {
        Some(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        None => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="filedepot""#),
            );
            Err(ApiError::Unauthorized(headers))
        }
    }
}

fn is_auth_exempt_path(path: &str) -> bool {
    matches!(
        path,
        "/api/auth/login" | "/api/auth/logout" | "/api/auth/status"
    )
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

/// 登录：校验凭据，创建会话并写入 Cookie。
pub async fn auth_login(
    Extension(auth): Extension<Arc<AuthContext>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, axum::response::Response), ApiError> {
    let Some(principal) = auth.check_credentials(&payload.username, &payload.password) else {
        warn!(username = %payload.username, "login rejected");
        return Err(ApiError::Unauthorized(HeaderMap::new()));
    };

    let token = auth.sessions.create(&principal).await;
    info!(user = %principal, "login");
    let cookie = Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(is_https_request(&headers))
        .same_site(axum_extra::extract::cookie::SameSite::Strict)
        .max_age(CookieDuration::seconds(auth.sessions.ttl().as_secs() as i64))
        .build();
    Ok((jar.add(cookie), StatusCode::NO_CONTENT.into_response()))
}

/// 登出：删除会话并清除 Cookie。
pub async fn auth_logout(
    Extension(auth): Extension<Arc<AuthContext>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME) {
        auth.sessions.remove(cookie.value()).await;
    }
    (
        jar.remove(Cookie::build(AUTH_COOKIE_NAME).path("/").build()),
        StatusCode::NO_CONTENT,
    )
}

pub async fn auth_status(
    Extension(auth): Extension<Arc<AuthContext>>,
    jar: CookieJar,
) -> StatusCode {
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME)
        && auth.sessions.validate(cookie.value()).await.is_some()
    {
        return StatusCode::NO_CONTENT;
    }
    StatusCode::UNAUTHORIZED
}
