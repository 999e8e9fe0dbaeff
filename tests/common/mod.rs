// 该文件是 Lukou （路口） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

#![allow(dead_code)]

use std::{io::Cursor, path::Path, sync::Arc};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use lukou::{
  model::{DetectItem, DetectResult, Detector, DetectorError, Labels},
  service::{DetectionService, ServiceConfig},
};

/// 返回固定结果的检测器，遵守阈值和类别过滤
pub struct StubDetector {
  labels: Labels,
  items: Vec<DetectItem>,
}

impl StubDetector {
  pub fn new(items: Vec<DetectItem>) -> Self {
    StubDetector {
      labels: Labels::coco(),
      items,
    }
  }
}

impl Detector for StubDetector {
  fn labels(&self) -> &Labels {
    &self.labels
  }

  fn predict(
    &self,
    _image: &DynamicImage,
    confidence_threshold: f32,
    classes: Option<&[u32]>,
  ) -> Result<DetectResult, DetectorError> {
    Ok(
      self
        .items
        .iter()
        .filter(|item| item.score > confidence_threshold)
        .filter(|item| classes.is_none_or(|c| c.contains(&item.class_id)))
        .cloned()
        .collect::<Vec<_>>()
        .into(),
    )
  }
}

pub fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
  DetectItem {
    class_id,
    score,
    bbox,
  }
}

/// 交通标志：stop sign；通用目标：person、car 以及不在白名单里的 chair
pub fn stub_service(config: ServiceConfig) -> Arc<DetectionService> {
  let traffic = StubDetector::new(vec![
    item(11, 0.874, [10.0, 40.0, 40.0, 100.0]),
    item(9, 0.05, [0.0, 0.0, 5.0, 5.0]),
  ]);
  let objects = StubDetector::new(vec![
    item(0, 0.91, [60.0, 40.0, 100.0, 100.0]),
    item(2, 0.30, [0.0, 0.0, 10.0, 10.0]),
    item(56, 0.99, [0.0, 0.0, 10.0, 10.0]),
  ]);
  Arc::new(DetectionService::new(
    Arc::new(traffic),
    Arc::new(objects),
    config,
  ))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  let image = RgbImage::from_pixel(width, height, Rgb([90, 90, 90]));
  let mut bytes = Vec::new();
  DynamicImage::ImageRgb8(image)
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    .unwrap();
  bytes
}

pub fn write_file(path: &Path, bytes: &[u8]) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, bytes).unwrap();
}
