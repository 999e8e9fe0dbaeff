// 该文件是 Lukou （路口） 项目的一部分。
// src/service.rs - 检测服务
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  detection::{Detection, DetectionResponse},
  model::{Detector, DetectorError},
};

/// 交通标志检测器的置信度阈值，标志目标小且难识别
pub const TRAFFIC_SIGN_CONFIDENCE_THRESHOLD: f32 = 0.15;
/// 通用目标检测器的置信度阈值
pub const OBJECT_CONFIDENCE_THRESHOLD: f32 = 0.40;
/// 通用目标检测器只保留的类别
pub const OBJECT_ALLOW_LIST: [&str; 6] = ["person", "car", "bus", "truck", "cat", "dog"];
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("图像数据为空")]
  EmptyPayload,
  #[error("图像数据过大: {0} 字节 (上限 {1} 字节)")]
  PayloadTooLarge(usize, usize),
  #[error("图像解码失败: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("{0}")]
  DetectorError(#[from] DetectorError),
}

#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
  pub sign_confidence: f32,
  pub object_confidence: f32,
  pub max_payload_bytes: usize,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    ServiceConfig {
      sign_confidence: TRAFFIC_SIGN_CONFIDENCE_THRESHOLD,
      object_confidence: OBJECT_CONFIDENCE_THRESHOLD,
      max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
    }
  }
}

/// 检测器加载结果
pub enum Loaded<D> {
  /// 成功加载专用模型
  Custom(D),
  /// 专用模型不可用，已回退到通用模型
  GenericFallback { detector: D, reason: String },
}

impl<D> Loaded<D> {
  pub fn is_degraded(&self) -> bool {
    matches!(self, Loaded::GenericFallback { .. })
  }

  pub fn into_inner(self) -> D {
    match self {
      Loaded::Custom(detector) => detector,
      Loaded::GenericFallback { detector, .. } => detector,
    }
  }
}

/// 先尝试加载专用模型，失败时回退到通用模型
///
/// 专用模型缺失不是致命错误；只有通用模型也无法加载时才返回错误。
pub fn load_with_fallback<D, E, F>(custom: &Path, generic: &Path, load: F) -> Result<Loaded<D>, E>
where
  E: std::fmt::Display,
  F: Fn(&Path) -> Result<D, E>,
{
  match load(custom) {
    Ok(detector) => {
      info!("专用交通标志模型加载完成: {}", custom.display());
      Ok(Loaded::Custom(detector))
    }
    Err(e) => {
      let reason = e.to_string();
      warn!(
        "专用模型 '{}' 不可用 ({}), 回退到通用模型 '{}', 交通标志识别效果会变差",
        custom.display(),
        reason,
        generic.display()
      );
      let detector = load(generic)?;
      Ok(Loaded::GenericFallback { detector, reason })
    }
  }
}

/// 检测服务上下文，持有两个只读检测器
pub struct DetectionService {
  traffic: Arc<dyn Detector>,
  objects: Arc<dyn Detector>,
  object_classes: Vec<u32>,
  config: ServiceConfig,
}

impl DetectionService {
  pub fn new(traffic: Arc<dyn Detector>, objects: Arc<dyn Detector>, config: ServiceConfig) -> Self {
    let object_classes = objects.labels().ids_of(&OBJECT_ALLOW_LIST);
    if object_classes.len() != OBJECT_ALLOW_LIST.len() {
      warn!(
        "通用模型词表缺少部分白名单类别, 仅保留 {} / {} 个",
        object_classes.len(),
        OBJECT_ALLOW_LIST.len()
      );
    }
    debug!("通用目标类别编号: {:?}", object_classes);

    DetectionService {
      traffic,
      objects,
      object_classes,
      config,
    }
  }

  pub fn config(&self) -> &ServiceConfig {
    &self.config
  }

  /// 解码图像并依次运行两个检测器
  ///
  /// 任一步骤失败则整个请求失败，不返回部分结果。
  pub fn detect(&self, payload: &[u8]) -> Result<DetectionResponse, ServiceError> {
    self.run(payload).inspect_err(|e| error!("检测失败: {}", e))
  }

  fn run(&self, payload: &[u8]) -> Result<DetectionResponse, ServiceError> {
    if payload.is_empty() {
      return Err(ServiceError::EmptyPayload);
    }
    if payload.len() > self.config.max_payload_bytes {
      return Err(ServiceError::PayloadTooLarge(
        payload.len(),
        self.config.max_payload_bytes,
      ));
    }

    let image = image::load_from_memory(payload)?;
    debug!("图像解码完成: {}x{}", image.width(), image.height());

    let now = std::time::Instant::now();
    let signs = self
      .traffic
      .predict(&image, self.config.sign_confidence, None)?;
    let objects = self.objects.predict(
      &image,
      self.config.object_confidence,
      Some(&self.object_classes),
    )?;
    info!(
      "推理完成，耗时: {:.2?}, 交通标志 {} 个, 通用目标 {} 个",
      now.elapsed(),
      signs.len(),
      objects.len()
    );

    Ok(DetectionResponse::success(
      Detection::from_result(&signs, self.traffic.labels()),
      Detection::from_result(&objects, self.objects.labels()),
    ))
  }
}
