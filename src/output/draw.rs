// 该文件是 Lukou （路口） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::debug;

use crate::{
  detection::{Detection, DetectionResponse},
  output::RenderError,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 13.0;
const LABEL_WIDTH: u32 = 150;
const LABEL_HEIGHT: u32 = 20;
const LABEL_TEXT_OFFSET_X: i32 = 5;
const LABEL_TEXT_OFFSET_Y: i32 = 15;
const STROKE_WIDTH: u32 = 3;

pub const SIGN_COLOR: Rgb<u8> = Rgb([255, 0, 0]); // 红色
pub const OBJECT_COLOR: Rgb<u8> = Rgb([0, 0, 255]); // 蓝色
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]); // 白色

pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  stroke_width: u32,
  label_width: u32,
  label_height: u32,
}

impl Draw {
  pub fn new() -> Result<Self, RenderError> {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    Ok(Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      stroke_width: STROKE_WIDTH,
      label_width: LABEL_WIDTH,
      label_height: LABEL_HEIGHT,
    })
  }

  /// 先画交通标志（红色）再画通用目标（蓝色），后画的覆盖先画的
  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectionResponse) {
    for sign in &result.traffic_signs {
      self.draw_bbox_with_label(image, sign, SIGN_COLOR);
    }
    for object in &result.general_objects {
      self.draw_bbox_with_label(image, object, OBJECT_COLOR);
    }
  }

  // 边框向内加粗；标签背景紧贴边框左上角上方，超出画布的部分被裁掉
  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
    let Some((x, y, width, height)) = clamp_bbox(&detection.bbox, image.width(), image.height())
    else {
      debug!("跳过画布外的检测框: {:?}", detection.bbox);
      return;
    };

    for inset in 0..self.stroke_width {
      let (w, h) = (
        width.saturating_sub(2 * inset),
        height.saturating_sub(2 * inset),
      );
      if w == 0 || h == 0 {
        break;
      }
      let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(w, h);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label_y = y - self.label_height as i32;
    let background = Rect::at(x, label_y).of_size(self.label_width, self.label_height);
    draw_filled_rect_mut(image, background, color);

    draw_text_mut(
      image,
      TEXT_COLOR,
      x + LABEL_TEXT_OFFSET_X,
      y - LABEL_TEXT_OFFSET_Y,
      self.font_scale,
      &self.font,
      &detection.caption(),
    );
  }
}

/// 检测框裁剪到画布内，返回左上角与宽高；裁剪后为空则返回 `None`
fn clamp_bbox(bbox: &[f32; 4], width: u32, height: u32) -> Option<(i32, i32, u32, u32)> {
  if width == 0 || height == 0 {
    return None;
  }
  let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);

  // `as i32` 对超范围和 NaN 取饱和值
  let x_min = (bbox[0].floor() as i32).clamp(0, max_x);
  let y_min = (bbox[1].floor() as i32).clamp(0, max_y);
  let x_max = (bbox[2].ceil() as i32).clamp(0, max_x);
  let y_max = (bbox[3].ceil() as i32).clamp(0, max_y);

  if x_min >= x_max || y_min >= y_max {
    return None;
  }

  Some((
    x_min,
    y_min,
    (x_max - x_min + 1) as u32,
    (y_max - y_min + 1) as u32,
  ))
}
