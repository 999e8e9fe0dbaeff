// 该文件是 Lukou （路口） 项目的一部分。
// src/model/labels.rs - 类别词表
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum LabelsError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("标签文件为空: {0}")]
  Empty(String),
}

#[derive(Deserialize)]
struct LabelFile {
  names: Vec<String>,
}

/// 检测器的封闭类别词表，类别编号即下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
  names: Box<[String]>,
}

impl Default for Labels {
  fn default() -> Self {
    Self::coco()
  }
}

impl Labels {
  pub fn coco() -> Self {
    COCO_CLASSES.iter().map(|name| name.to_string()).collect()
  }

  /// 模型文件旁的标签文件路径，例如 `traffic_custom.onnx` -> `traffic_custom.toml`
  pub fn sidecar_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("toml")
  }

  /// 从 TOML 标签文件加载，格式为 `names = ["stop sign", ...]`
  pub fn from_toml_file(path: &Path) -> Result<Self, LabelsError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_toml_str(&text).map_err(|e| match e {
      LabelsError::Empty(_) => LabelsError::Empty(path.display().to_string()),
      other => other,
    })
  }

  pub fn from_toml_str(text: &str) -> Result<Self, LabelsError> {
    let file: LabelFile = toml::from_str(text)?;
    if file.names.is_empty() {
      return Err(LabelsError::Empty("<inline>".to_string()));
    }
    Ok(file.names.into_iter().collect())
  }

  /// 模型有标签文件时使用标签文件，否则使用 COCO 词表
  pub fn for_model(model_path: &Path) -> Result<Self, LabelsError> {
    let sidecar = Self::sidecar_path(model_path);
    if sidecar.is_file() {
      debug!("加载标签文件: {}", sidecar.display());
      Self::from_toml_file(&sidecar)
    } else {
      debug!("未找到标签文件 {}, 使用 COCO 词表", sidecar.display());
      Ok(Self::coco())
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: u32) -> &str {
    self
      .names
      .get(class_id as usize)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  pub fn id_of(&self, name: &str) -> Option<u32> {
    self.names.iter().position(|n| n == name).map(|i| i as u32)
  }

  /// 将类别名称白名单解析为类别编号，词表中不存在的名称被忽略
  pub fn ids_of(&self, names: &[&str]) -> Vec<u32> {
    names.iter().filter_map(|name| self.id_of(name)).collect()
  }
}

impl FromIterator<String> for Labels {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Labels {
      names: iter.into_iter().collect(),
    }
  }
}
