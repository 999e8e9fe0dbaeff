// 该文件是 Lukou （路口） 项目的一部分。
// src/model.rs - 检测模型抽象
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

use image::DynamicImage;
use thiserror::Error;

mod labels;
pub use self::labels::{COCO_CLASSES, Labels, LabelsError};

#[cfg(feature = "model_yolov8")]
mod yolov8;
#[cfg(feature = "model_yolov8")]
pub use self::yolov8::{Yolov8, Yolov8Builder};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型文件不存在: {0}")]
  ModelMissing(String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("标签加载错误: {0}")]
  LabelsError(#[from] LabelsError),
  #[error("推理错误: {0}")]
  InferenceError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

/// 预训练检测器
///
/// 加载完成后只读，可在多个请求间共享。
pub trait Detector: Send + Sync {
  /// 检测器的类别词表，加载时确定
  fn labels(&self) -> &Labels;

  /// 对图像执行一次推理
  ///
  /// `classes` 为 `None` 时保留全部类别，否则只保留列出的类别编号。
  fn predict(
    &self,
    image: &DynamicImage,
    confidence_threshold: f32,
    classes: Option<&[u32]>,
  ) -> Result<DetectResult, DetectorError>;
}

/// 非极大值抑制，按类别分别进行，结果按置信度降序排列
pub fn nms(mut items: Vec<DetectItem>, iou_threshold: f32, max_detections: usize) -> Vec<DetectItem> {
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<DetectItem> = Vec::new();
  for item in items {
    if result.len() >= max_detections {
      break;
    }
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == item.class_id && iou(&kept.bbox, &item.bbox) > iou_threshold);
    if !suppressed {
      result.push(item);
    }
  }

  result
}

/// 计算两个边界框的 IoU
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
