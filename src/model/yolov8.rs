// 该文件是 Lukou （路口） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 检测器
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

use image::DynamicImage;
use tracing::{debug, error, info, warn};
use tract_onnx::prelude::*;

use crate::{
  frame::RgbNchwFrame,
  model::{DetectItem, DetectResult, Detector, DetectorError, Labels, nms},
};

const YOLOV8_INPUT_W: u32 = 640;
const YOLOV8_INPUT_H: u32 = 640;
const YOLOV8_BOX_CHANNELS: usize = 4;
const YOLOV8_IOU_THRESH: f32 = 0.7;
const YOLOV8_MAX_DETECTIONS: usize = 300;

type Yolov8Frame = RgbNchwFrame<YOLOV8_INPUT_W, YOLOV8_INPUT_H>;

pub struct Yolov8 {
  plan: TypedRunnableModel<TypedModel>,
  labels: Labels,
  iou_threshold: f32,
  max_detections: usize,
}

pub struct Yolov8Builder {
  model_path: PathBuf,
  labels: Option<Labels>,
  iou_threshold: f32,
  max_detections: usize,
}

impl Yolov8Builder {
  pub fn new(model_path: impl AsRef<Path>) -> Self {
    Yolov8Builder {
      model_path: model_path.as_ref().to_path_buf(),
      labels: None,
      iou_threshold: YOLOV8_IOU_THRESH,
      max_detections: YOLOV8_MAX_DETECTIONS,
    }
  }

  /// 覆盖模型标签，不设置时读取模型旁的标签文件或使用 COCO 词表
  pub fn labels(mut self, labels: Labels) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn build(self) -> Result<Yolov8, DetectorError> {
    let path = self.model_path.display().to_string();
    if !self.model_path.is_file() {
      return Err(DetectorError::ModelMissing(path));
    }

    info!("加载模型文件: {}", path);
    let labels = match self.labels {
      Some(labels) => labels,
      None => Labels::for_model(&self.model_path)?,
    };

    let model = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .and_then(|model| {
        model.with_input_fact(
          0,
          f32::fact([1, 3, YOLOV8_INPUT_H as usize, YOLOV8_INPUT_W as usize]).into(),
        )
      })
      .and_then(|model| model.into_optimized())
      .map_err(|e| DetectorError::ModelLoadError(format!("{}: {}", path, e)))?;

    match model
      .output_fact(0)
      .ok()
      .and_then(|fact| fact.shape.as_concrete().map(|s| s.to_vec()))
    {
      Some(shape) => {
        debug!("模型输出形状: {:?}", shape);
        if let Some(channels) = shape.get(1).copied()
          && channels > YOLOV8_BOX_CHANNELS
          && channels - YOLOV8_BOX_CHANNELS != labels.len()
        {
          warn!(
            "模型类别数 {} 与标签数 {} 不一致",
            channels - YOLOV8_BOX_CHANNELS,
            labels.len()
          );
        }
      }
      None => debug!("模型输出形状未知"),
    }

    let plan = model
      .into_runnable()
      .map_err(|e| DetectorError::ModelLoadError(format!("{}: {}", path, e)))?;
    info!("模型加载完成: {} ({} 个类别)", path, labels.len());

    Ok(Yolov8 {
      plan,
      labels,
      iou_threshold: self.iou_threshold,
      max_detections: self.max_detections,
    })
  }
}

impl Detector for Yolov8 {
  fn labels(&self) -> &Labels {
    &self.labels
  }

  fn predict(
    &self,
    image: &DynamicImage,
    confidence_threshold: f32,
    classes: Option<&[u32]>,
  ) -> Result<DetectResult, DetectorError> {
    let frame = Yolov8Frame::from(image);
    let scale = frame.scale();
    let source = frame.source_size();

    debug!("执行模型推理");
    let input = frame
      .into_tensor()
      .map_err(|e| DetectorError::InferenceError(format!("输入张量形状错误: {}", e)))?;
    let outputs = self
      .plan
      .run(tvec!(input.into()))
      .map_err(|e| DetectorError::InferenceError(e.to_string()))?;

    let output = outputs
      .first()
      .ok_or_else(|| DetectorError::InferenceError("模型没有输出".to_string()))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(|e| DetectorError::InferenceError(e.to_string()))?
      .into_dimensionality::<tract_ndarray::Ix3>()
      .map_err(|e| DetectorError::InferenceError(format!("模型输出维度错误: {}", e)))?;

    let candidates = decode_head(view, confidence_threshold, classes)?;
    let kept = nms(candidates, self.iou_threshold, self.max_detections);
    debug!("检测到 {} 个物体", kept.len());

    Ok(
      kept
        .into_iter()
        .map(|item| rescale(item, scale, source))
        .collect::<Vec<_>>()
        .into(),
    )
  }
}

/// 解码检测头输出
///
/// 标准导出的形状为 `[1, 4 + nc, anchors]`，转置导出为 `[1, anchors, 4 + nc]`，
/// 按较小的维度判断通道位置。每个锚点取得分最高的类别。
fn decode_head(
  output: tract_ndarray::ArrayView3<f32>,
  confidence_threshold: f32,
  classes: Option<&[u32]>,
) -> Result<Vec<DetectItem>, DetectorError> {
  let (_, d1, d2) = output.dim();
  let channels_first = d1 <= d2;
  let (channels, anchors) = if channels_first { (d1, d2) } else { (d2, d1) };

  if channels <= YOLOV8_BOX_CHANNELS {
    error!("检测头通道数过少: {}", channels);
    return Err(DetectorError::InferenceError(format!(
      "检测头通道数过少: {}",
      channels
    )));
  }

  let at = |c: usize, a: usize| {
    if channels_first {
      output[(0, c, a)]
    } else {
      output[(0, a, c)]
    }
  };

  let num_classes = channels - YOLOV8_BOX_CHANNELS;
  let mut items = Vec::new();

  for a in 0..anchors {
    let (score, class_id) = (0..num_classes)
      .map(|c| (at(YOLOV8_BOX_CHANNELS + c, a), c as u32))
      .fold((f32::MIN, 0u32), |best, cur| if cur.0 > best.0 { cur } else { best });

    if score <= confidence_threshold {
      continue;
    }
    if let Some(allowed) = classes
      && !allowed.contains(&class_id)
    {
      continue;
    }

    let cx = at(0, a);
    let cy = at(1, a);
    let w = at(2, a);
    let h = at(3, a);

    items.push(DetectItem {
      class_id,
      score: score.clamp(0.0, 1.0),
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  Ok(items)
}

/// 网络输入坐标还原到原图像素坐标，并裁剪到图像范围内
fn rescale(item: DetectItem, (sx, sy): (f32, f32), (width, height): (u32, u32)) -> DetectItem {
  let [x1, y1, x2, y2] = item.bbox;
  let (w, h) = (width as f32, height as f32);

  let x1 = (x1 * sx).clamp(0.0, w);
  let y1 = (y1 * sy).clamp(0.0, h);
  let x2 = (x2 * sx).clamp(0.0, w);
  let y2 = (y2 * sy).clamp(0.0, h);

  DetectItem {
    bbox: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
    ..item
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tract_ndarray::Array3;

  const ANCHORS: usize = 64;

  /// 构造 `[1, 4 + nc, 64]` 检测头，前几个锚点为 (cx, cy, w, h, class, score)，其余为零
  fn head(num_classes: usize, anchors: &[(f32, f32, f32, f32, usize, f32)]) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros((1, 4 + num_classes, ANCHORS));
    for (a, &(cx, cy, w, h, class, score)) in anchors.iter().enumerate() {
      out[(0, 0, a)] = cx;
      out[(0, 1, a)] = cy;
      out[(0, 2, a)] = w;
      out[(0, 3, a)] = h;
      out[(0, 4 + class, a)] = score;
    }
    out
  }

  #[test]
  fn decode_applies_threshold() {
    let out = head(
      3,
      &[
        (100.0, 100.0, 20.0, 20.0, 0, 0.39),
        (200.0, 200.0, 20.0, 20.0, 1, 0.41),
      ],
    );
    let items = decode_head(out.view(), 0.40, None).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].class_id, 1);
    assert_eq!(items[0].bbox, [190.0, 190.0, 210.0, 210.0]);
  }

  #[test]
  fn decode_applies_class_allow_list() {
    let out = head(
      20,
      &[
        (50.0, 50.0, 10.0, 10.0, 2, 0.9),
        (150.0, 50.0, 10.0, 10.0, 9, 0.9),
        (250.0, 50.0, 10.0, 10.0, 16, 0.9),
      ],
    );
    let items = decode_head(out.view(), 0.4, Some(&[0, 2, 5, 7, 15, 16])).unwrap();
    let ids: Vec<u32> = items.iter().map(|i| i.class_id).collect();
    assert_eq!(ids, vec![2, 16]);
  }

  #[test]
  fn decode_handles_transposed_head() {
    let standard = head(3, &[(10.0, 10.0, 4.0, 4.0, 2, 0.8)]);
    let mut transposed = Array3::<f32>::zeros((1, ANCHORS, 7));
    for c in 0..7 {
      transposed[(0, 0, c)] = standard[(0, c, 0)];
    }
    let items = decode_head(transposed.view(), 0.5, None).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].class_id, 2);
  }

  #[test]
  fn decode_rejects_heads_without_classes() {
    let out = Array3::<f32>::zeros((1, 4, 10));
    assert!(decode_head(out.view(), 0.1, None).is_err());
  }

  #[test]
  fn rescale_maps_to_source_and_clamps() {
    let item = DetectItem {
      class_id: 0,
      score: 0.5,
      bbox: [-10.0, 100.0, 700.0, 200.0],
    };
    let scaled = rescale(item, (2.0, 0.5), (1280, 320));
    assert_eq!(scaled.bbox, [0.0, 50.0, 1280.0, 100.0]);
  }

  #[test]
  fn missing_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = Yolov8Builder::new(dir.path().join("traffic_custom.onnx")).build();
    assert!(matches!(result, Err(DetectorError::ModelMissing(_))));
  }
}
