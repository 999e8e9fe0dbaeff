// 该文件是 Lukou （路口） 项目的一部分。
// src/server.rs - HTTP 检测接口
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::Arc;

use axum::{
  Json, Router,
  body::Bytes,
  extract::{
    DefaultBodyLimit, Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::post,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::{
  detection::{DetectionResponse, ErrorResponse},
  service::{DetectionService, ServiceError},
};

pub const DETECT_PATH: &str = "/detect";
pub const FILE_FIELD: &str = "file";

// 表单边界和字段头的余量
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub type AppState = Arc<DetectionService>;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("{0}")]
  InvalidRequest(String),
  #[error("{0}")]
  PayloadTooLarge(String),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<ServiceError> for ApiError {
  fn from(err: ServiceError) -> Self {
    match err {
      ServiceError::PayloadTooLarge(..) => ApiError::PayloadTooLarge(err.to_string()),
      other => ApiError::Internal(other.to_string()),
    }
  }
}

impl From<MultipartError> for ApiError {
  fn from(err: MultipartError) -> Self {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::PayloadTooLarge(err.body_text())
    } else {
      ApiError::InvalidRequest(err.body_text())
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = ErrorResponse {
      detail: self.to_string(),
    };
    (status, Json(body)).into_response()
  }
}

pub fn router(service: AppState) -> Router {
  let body_limit = service.config().max_payload_bytes + MULTIPART_OVERHEAD_BYTES;
  Router::new()
    .route(DETECT_PATH, post(detect_handler))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(service)
}

pub async fn serve(listener: TcpListener, service: AppState) -> std::io::Result<()> {
  if let Ok(addr) = listener.local_addr() {
    info!("检测服务已启动: http://{}{}", addr, DETECT_PATH);
  }
  axum::serve(listener, router(service)).await
}

/// POST /detect - 对上传图像运行交通标志与通用目标检测
///
/// 表单字段 `file` 为原始 JPEG/PNG 数据。
/// 成功返回 200 和 [`DetectionResponse`]；解码或推理失败返回 500，
/// 表单不合法返回 422，数据过大返回 413，失败时的响应体均为 `{"detail": ...}`。
async fn detect_handler(
  State(service): State<AppState>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
  let mut multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
  let payload = read_file_field(&mut multipart).await?;
  debug!("收到图像: {} 字节", payload.len());

  let response = tokio::task::spawn_blocking(move || service.detect(&payload))
    .await
    .map_err(|e| {
      error!("推理任务异常退出: {}", e);
      ApiError::Internal(e.to_string())
    })??;

  Ok(Json(response))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(FILE_FIELD) {
      return Ok(field.bytes().await?);
    }
  }
  Err(ApiError::InvalidRequest(format!(
    "缺少表单字段 '{}'",
    FILE_FIELD
  )))
}
