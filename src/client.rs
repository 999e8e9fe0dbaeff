// 该文件是 Lukou （路口） 项目的一部分。
// src/client.rs - 检测服务客户端
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

use reqwest::blocking::{Client, multipart::Form};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{FromUrl, detection::DetectionResponse};

const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("请求失败: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("响应格式错误: {0}")]
  MalformedResponse(#[from] serde_json::Error),
  #[error("不支持的服务地址: {0}")]
  SchemeMismatch(String),
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
  /// 服务返回 200 和检测结果
  Detected(DetectionResponse),
  /// 服务返回非 200 状态，附带原始响应体
  Rejected { status: u16, body: String },
}

/// 把一张图像提交到检测服务
pub trait Transport {
  fn submit(&self, path: &Path) -> Result<Submission, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
  fn submit(&self, path: &Path) -> Result<Submission, TransportError> {
    (**self).submit(path)
  }
}

/// 通过 HTTP multipart 上传图像
pub struct HttpTransport {
  client: Client,
  endpoint: Url,
}

impl FromUrl for HttpTransport {
  type Error = TransportError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !matches!(url.scheme(), "http" | "https") {
      return Err(TransportError::SchemeMismatch(format!(
        "期望 'http' 或 'https', 实际 '{}'",
        url.scheme()
      )));
    }

    // 不设超时，慢请求会一直阻塞
    let client = Client::builder().timeout(None).build()?;

    Ok(HttpTransport {
      client,
      endpoint: url.clone(),
    })
  }
}

impl HttpTransport {
  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }
}

impl Transport for HttpTransport {
  fn submit(&self, path: &Path) -> Result<Submission, TransportError> {
    let form = Form::new().file(FILE_FIELD, path)?;
    let response = self
      .client
      .post(self.endpoint.clone())
      .multipart(form)
      .send()?;

    let status = response.status();
    let body = response.text()?;
    debug!("服务响应 {}: {} 字节", status, body.len());

    if status == reqwest::StatusCode::OK {
      Ok(Submission::Detected(serde_json::from_str(&body)?))
    } else {
      Ok(Submission::Rejected {
        status: status.as_u16(),
        body,
      })
    }
  }
}
