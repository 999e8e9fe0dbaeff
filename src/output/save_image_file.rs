// 该文件是 Lukou （路口） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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

use tracing::info;

use crate::{
  detection::DetectionResponse,
  output::{Render, RenderError, draw::Draw},
};

const OUTPUT_PREFIX: &str = "result_";

/// 输出文件名 `result_<原文件名>`，不保留子目录结构
pub fn output_file_name(source: &Path) -> Result<String, RenderError> {
  source
    .file_name()
    .and_then(|name| name.to_str())
    .map(|name| format!("{}{}", OUTPUT_PREFIX, name))
    .ok_or_else(|| RenderError::InvalidFileName(source.display().to_string()))
}

/// 在原图上绘制检测结果并保存到输出目录
pub struct SaveImageFileOutput {
  directory: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(directory: impl AsRef<Path>) -> Result<Self, RenderError> {
    Ok(SaveImageFileOutput {
      directory: directory.as_ref().to_path_buf(),
      draw: Draw::new()?,
    })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn save_image(&self, image: image::RgbImage, file_name: &str) -> Result<PathBuf, RenderError> {
    if !self.directory.as_os_str().is_empty() {
      std::fs::create_dir_all(&self.directory)?;
    }

    let path = self.directory.join(file_name);
    image.save(&path)?;

    info!("保存标注图像到文件: {}", path.display());

    Ok(path)
  }
}

impl Render for SaveImageFileOutput {
  type Error = RenderError;

  fn render_result(&self, source: &Path, result: &DetectionResponse) -> Result<PathBuf, Self::Error> {
    let file_name = output_file_name(source)?;
    let mut image = image::open(source)?.to_rgb8();
    self.draw.draw_detections(&mut image, result);
    self.save_image(image, &file_name)
  }
}
