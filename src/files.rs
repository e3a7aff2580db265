//! 文件列表、上传、下载与删除处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Multipart, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use http_body_util::BodyExt;
use httpdate::fmt_http_date;
use serde::Deserialize;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

use crate::auth::Principal;
use crate::error::ApiError;
use crate::http::attachment_disposition;
use crate::storage::{PendingUpload, Repository, StoredFile};

/// 表单上传时承载文件的字段名。
const UPLOAD_FIELD: &str = "file";

#[derive(Deserialize)]
pub(crate) struct NameQuery {
    name: String,
}

/// 列出仓库中的文件（按名称排序）。
pub async fn list_files(
    Extension(repo): Extension<Arc<Repository>>,
    Extension(principal): Extension<Principal>,
) -> Result<JsonResponse<Vec<StoredFile>>, ApiError> {
    let files = repo.list().await?;
    info!(user = %principal, count = files.len(), "list files");
    Ok(JsonResponse(files))
}

/// 下载文件，显式设置 Content-Length 以便客户端识别截断。
pub async fn download_file(
    Query(NameQuery { name }): Query<NameQuery>,
    Extension(repo): Extension<Arc<Repository>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let download = repo.get(&name).await?;
    let file = download.file;
    let mime = mime_guess::from_path(&file.name).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file.size));
    headers.insert(header::CONTENT_DISPOSITION, attachment_disposition(&file.name));
    if let Some(modified) = file.last_modified {
        let value = fmt_http_date(SystemTime::from(modified));
        headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("invalid last-modified header".into()))?,
        );
    }

    info!(user = %principal, name = file.name, size = file.size, "download file");
    Ok((
        StatusCode::OK,
        headers,
        AxumBody::from_stream(download.stream),
    )
        .into_response())
}

/// 以原始请求体上传，`Content-Length` 作为声明大小。
pub async fn upload_raw(
    Query(NameQuery { name }): Query<NameQuery>,
    headers: HeaderMap,
    Extension(repo): Extension<Arc<Repository>>,
    Extension(principal): Extension<Principal>,
    body: AxumBody,
) -> Result<(StatusCode, JsonResponse<StoredFile>), ApiError> {
    let declared_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    debug!(user = %principal, name, ?declared_size, "upload started");

    let source = BodyExt::into_data_stream(body);
    let upload = PendingUpload::new(name, source).with_declared_size(declared_size);
    let stored = repo.put(upload).await?;
    info!(user = %principal, name = stored.name, size = stored.size, "upload file");
    Ok((StatusCode::CREATED, JsonResponse(stored)))
}

/// 以 multipart 表单上传，取 `file` 字段及其文件名。
pub async fn upload_form(
    Extension(repo): Extension<Arc<Repository>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<(StatusCode, JsonResponse<StoredFile>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("file name is required".into()))?;
        debug!(user = %principal, name, "form upload started");

        let stored = repo.put(PendingUpload::new(name, field)).await?;
        info!(user = %principal, name = stored.name, size = stored.size, "upload file");
        return Ok((StatusCode::CREATED, JsonResponse(stored)));
    }
    Err(ApiError::BadRequest(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// 删除文件；重复删除返回 404。
pub async fn delete_file(
    Query(NameQuery { name }): Query<NameQuery>,
    Extension(repo): Extension<Arc<Repository>>,
    Extension(principal): Extension<Principal>,
) -> Result<StatusCode, ApiError> {
    repo.delete(&name).await?;
    info!(user = %principal, name, "delete file");
    Ok(StatusCode::NO_CONTENT)
}
