// 该文件是 Lukou （路口） 项目的一部分。
// src/input/image_directory.rs - 递归搜索目录中的图像文件
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

use thiserror::Error;
use tracing::{debug, warn};

/// 识别的图像扩展名，不区分大小写
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("输入路径不是目录: {0}")]
  NotADirectory(String),
}

pub fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// 输入根目录下的全部图像文件，按路径排序
#[derive(Debug, Clone, Default)]
pub struct ImageDirectoryInput {
  root: PathBuf,
  files: Vec<PathBuf>,
}

impl ImageDirectoryInput {
  /// 递归搜索 `root`
  ///
  /// 根目录不存在时返回空集合；无法读取的子目录记录警告后跳过。
  pub fn discover(root: impl AsRef<Path>) -> Result<Self, InputError> {
    let root = root.as_ref().to_path_buf();

    if !root.exists() {
      warn!("输入目录不存在: {}", root.display());
      return Ok(ImageDirectoryInput {
        root,
        files: Vec::new(),
      });
    }
    if !root.is_dir() {
      return Err(InputError::NotADirectory(root.display().to_string()));
    }

    let mut files = Vec::new();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
      let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if dir == root => return Err(e.into()),
        Err(e) => {
          warn!("无法读取目录 {}: {}", dir.display(), e);
          continue;
        }
      };

      for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
          pending.push(path);
        } else if is_image_file(&path) {
          files.push(path);
        }
      }
    }

    files.sort();
    debug!("在 {} 中找到 {} 张图像", root.display(), files.len());

    Ok(ImageDirectoryInput { root, files })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl IntoIterator for ImageDirectoryInput {
  type Item = PathBuf;
  type IntoIter = std::vec::IntoIter<PathBuf>;

  fn into_iter(self) -> Self::IntoIter {
    self.files.into_iter()
  }
}
