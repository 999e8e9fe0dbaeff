// 该文件是 Lukou （路口） 项目的一部分。
// src/detection.rs - 检测服务请求/响应约定
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

use serde::{Deserialize, Serialize};

use crate::model::{DetectItem, DetectResult, Labels};

pub const STATUS_SUCCESS: &str = "success";

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  /// 类别名称
  pub label: String,
  /// 置信度，保留两位小数
  pub confidence: f32,
  /// 边界框 [x_min, y_min, x_max, y_max]，原图像素坐标
  #[serde(rename = "box")]
  pub bbox: [f32; 4],
}

impl Detection {
  pub fn from_item(item: &DetectItem, labels: &Labels) -> Self {
    let [x1, y1, x2, y2] = item.bbox;
    Detection {
      label: labels.name(item.class_id).to_string(),
      confidence: round_confidence(item.score),
      bbox: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
    }
  }

  pub fn from_result(result: &DetectResult, labels: &Labels) -> Vec<Self> {
    result
      .items
      .iter()
      .map(|item| Self::from_item(item, labels))
      .collect()
  }

  /// 标注文本，例如 `stop sign (0.87)`
  pub fn caption(&self) -> String {
    format!("{} ({})", self.label, self.confidence)
  }
}

/// 一张图像的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
  pub status: String,
  #[serde(default)]
  pub traffic_signs: Vec<Detection>,
  #[serde(default)]
  pub general_objects: Vec<Detection>,
}

impl DetectionResponse {
  pub fn success(traffic_signs: Vec<Detection>, general_objects: Vec<Detection>) -> Self {
    DetectionResponse {
      status: STATUS_SUCCESS.to_string(),
      traffic_signs,
      general_objects,
    }
  }

  pub fn sign_labels(&self) -> Vec<&str> {
    self.traffic_signs.iter().map(|d| d.label.as_str()).collect()
  }

  pub fn object_labels(&self) -> Vec<&str> {
    self
      .general_objects
      .iter()
      .map(|d| d.label.as_str())
      .collect()
  }
}

/// 失败响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
  pub detail: String,
}

/// 置信度裁剪到 [0, 1] 并保留两位小数
pub fn round_confidence(score: f32) -> f32 {
  if score.is_nan() {
    return 0.0;
  }
  (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn confidence_is_clamped_and_rounded() {
    assert_eq!(round_confidence(0.8666), 0.87);
    assert_eq!(round_confidence(0.154), 0.15);
    assert_eq!(round_confidence(1.2), 1.0);
    assert_eq!(round_confidence(-0.1), 0.0);
    assert_eq!(round_confidence(f32::NAN), 0.0);
  }

  #[test]
  fn item_maps_to_wire_shape() {
    let labels = Labels::coco();
    let item = DetectItem {
      class_id: 11,
      score: 0.4567,
      bbox: [30.0, 40.0, 10.0, 80.0],
    };
    let det = Detection::from_item(&item, &labels);
    assert_eq!(det.label, "stop sign");
    assert_eq!(det.confidence, 0.46);
    assert_eq!(det.bbox, [10.0, 40.0, 30.0, 80.0]);
    assert_eq!(det.caption(), "stop sign (0.46)");
  }

  #[test]
  fn response_serializes_with_box_key() {
    let response = DetectionResponse::success(
      vec![Detection {
        label: "stop sign".to_string(),
        confidence: 0.87,
        bbox: [1.0, 2.0, 3.0, 4.0],
      }],
      Vec::new(),
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["traffic_signs"][0]["box"][3], 4.0);
    assert_eq!(json["traffic_signs"][0]["label"], "stop sign");
    assert!(json["general_objects"].as_array().unwrap().is_empty());
    assert!(json["traffic_signs"][0].get("bbox").is_none());
  }

  #[test]
  fn response_parses_from_service_json() {
    let body = r#"{
      "status": "success",
      "traffic_signs": [],
      "general_objects": [{"label": "car", "confidence": 0.91, "box": [0.5, 1.5, 20.25, 30.0]}]
    }"#;
    let response: DetectionResponse = serde_json::from_str(body).unwrap();
    assert!(response.traffic_signs.is_empty());
    assert_eq!(response.object_labels(), vec!["car"]);
    assert_eq!(response.general_objects[0].bbox[2], 20.25);
  }
}
