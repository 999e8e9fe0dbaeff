// 该文件是 Lukou （路口） 项目的一部分。
// src/frame.rs - NCHW 模型输入帧
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

use image::{DynamicImage, imageops::FilterType};
use tract_onnx::prelude::{Tensor, tract_ndarray};

const RGB_CHANNELS: usize = 3;

/// 缩放到网络输入尺寸后的 RGB 帧，按 NCHW 排列并归一化到 [0, 1]
///
/// 同时记录原图尺寸，用于把检测框还原到原图像素坐标。
#[derive(Debug, Clone)]
pub struct RgbNchwFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
  source_width: u32,
  source_height: u32,
}

impl<const W: u32, const H: u32> From<&DynamicImage> for RgbNchwFrame<W, H> {
  fn from(image: &DynamicImage) -> Self {
    let (source_width, source_height) = (image.width(), image.height());
    let resized = image::imageops::resize(&image.to_rgb8(), W, H, FilterType::Triangle);

    let plane = (W as usize) * (H as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = (y as usize) * (W as usize) + (x as usize);
      for c in 0..RGB_CHANNELS {
        data[c * plane + idx] = pixel[c] as f32 / 255.0;
      }
    }

    Self {
      data: data.into_boxed_slice(),
      source_width,
      source_height,
    }
  }
}

impl<const W: u32, const H: u32> RgbNchwFrame<W, H> {
  pub fn source_size(&self) -> (u32, u32) {
    (self.source_width, self.source_height)
  }

  /// 网络输入坐标到原图坐标的缩放系数 (x, y)
  pub fn scale(&self) -> (f32, f32) {
    (
      self.source_width as f32 / W as f32,
      self.source_height as f32 / H as f32,
    )
  }

  pub fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  /// 数据已是 NCHW 排列，直接作为 `[1, 3, H, W]` 张量
  pub fn into_tensor(self) -> Result<Tensor, tract_ndarray::ShapeError> {
    let array = tract_ndarray::Array4::from_shape_vec(
      (1, RGB_CHANNELS, H as usize, W as usize),
      self.data.into_vec(),
    )?;
    Ok(array.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn frame_is_planar_and_normalised() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([255, 0, 51])));
    let frame = RgbNchwFrame::<4, 4>::from(&image);

    let plane = 16;
    assert_eq!(frame.as_nchw().len(), 3 * plane);
    assert!((frame.as_nchw()[0] - 1.0).abs() < 1e-6);
    assert!(frame.as_nchw()[plane].abs() < 1e-6);
    assert!((frame.as_nchw()[2 * plane] - 0.2).abs() < 1e-6);
  }

  #[test]
  fn scale_maps_back_to_source() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(1280, 320));
    let frame = RgbNchwFrame::<640, 640>::from(&image);
    assert_eq!(frame.scale(), (2.0, 0.5));
    assert_eq!(frame.source_size(), (1280, 320));
  }

  #[test]
  fn tensor_has_nchw_shape() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
    let tensor = RgbNchwFrame::<8, 6>::from(&image).into_tensor().unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 6, 8]);
  }

  #[test]
  fn tensor_keeps_channel_planes() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([0, 255, 102])));
    let tensor = RgbNchwFrame::<4, 2>::from(&image).into_tensor().unwrap();
    let view = tensor
      .to_array_view::<f32>()
      .unwrap()
      .into_dimensionality::<tract_ndarray::Ix4>()
      .unwrap();

    assert!(view[(0, 0, 1, 3)].abs() < 1e-6);
    assert!((view[(0, 1, 1, 3)] - 1.0).abs() < 1e-6);
    assert!((view[(0, 2, 0, 0)] - 0.4).abs() < 1e-6);
  }
}
