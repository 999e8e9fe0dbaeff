// 该文件是 Lukou （路口） 项目的一部分。
// src/fetch.rs - 模型文件下载
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("下载失败: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("下载失败: {url} 返回状态 {status}")]
  BadStatus { url: String, status: u16 },
  #[error("不支持的下载地址: {0}")]
  UnsupportedScheme(String),
}

/// 模型文件不存在时从 `url` 下载
///
/// 先写入同目录下的 `.part` 文件，完成后再重命名为 `path`。
pub async fn ensure_artifact(path: &Path, url: &Url) -> Result<(), FetchError> {
  if path.is_file() {
    debug!("模型文件已存在: {}", path.display());
    return Ok(());
  }

  if !matches!(url.scheme(), "http" | "https") {
    return Err(FetchError::UnsupportedScheme(url.to_string()));
  }

  info!("模型文件 {} 不存在, 从 {} 下载", path.display(), url);
  let response = reqwest::get(url.clone()).await?;
  if !response.status().is_success() {
    return Err(FetchError::BadStatus {
      url: url.to_string(),
      status: response.status().as_u16(),
    });
  }
  let bytes = response.bytes().await?;

  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent).await?;
  }

  let partial = path.with_extension("part");
  if let Err(e) = write_then_rename(&partial, path, &bytes).await {
    if let Err(cleanup) = tokio::fs::remove_file(&partial).await
      && cleanup.kind() != std::io::ErrorKind::NotFound
    {
      warn!("无法删除临时文件 {}: {}", partial.display(), cleanup);
    }
    return Err(e.into());
  }

  info!(
    "模型下载完成: {} ({:.2} MB)",
    path.display(),
    bytes.len() as f64 / (1024.0 * 1024.0)
  );
  Ok(())
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  tokio::fs::write(partial, bytes).await?;
  tokio::fs::rename(partial, path).await
}
