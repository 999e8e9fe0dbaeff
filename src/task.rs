// 该文件是 Lukou （路口） 项目的一部分。
// src/task.rs - 批处理任务
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

use tracing::{error, info, warn};

use crate::{
  client::{Submission, Transport},
  input::ImageDirectoryInput,
  output::Render,
};

pub trait Task<I, T, O>: Sized {
  type Output;
  fn run_task(self, input: I, transport: T, output: O) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// 服务返回非 200 状态
  Server,
  /// 连接失败、读取文件失败或响应格式错误
  Connection,
  /// 绘制或保存失败
  Render,
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
  pub path: PathBuf,
  pub kind: FailureKind,
  pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
  pub discovered: usize,
  pub annotated: Vec<PathBuf>,
  pub failures: Vec<BatchFailure>,
}

impl BatchReport {
  fn fail(&mut self, path: &Path, kind: FailureKind, message: String) {
    self.failures.push(BatchFailure {
      path: path.to_path_buf(),
      kind,
      message,
    });
  }
}

/// 逐个提交图像，单个文件失败不会中断批处理，也不会重试
#[derive(Debug, Default)]
pub struct BatchTask;

impl<T, O> Task<ImageDirectoryInput, T, O> for BatchTask
where
  T: Transport,
  O: Render,
  O::Error: std::fmt::Display,
{
  type Output = BatchReport;

  fn run_task(self, input: ImageDirectoryInput, transport: T, output: O) -> BatchReport {
    let mut report = BatchReport {
      discovered: input.len(),
      ..BatchReport::default()
    };

    if input.is_empty() {
      warn!("在 '{}' 中没有找到图像, 请检查目录名称", input.root().display());
      return report;
    }

    info!("开始批处理: {} ({} 张图像)", input.root().display(), input.len());

    for path in input {
      process_one(&path, &transport, &output, &mut report);
    }

    info!(
      "批处理完成: 共 {} 张, 成功标注 {} 张, 失败 {} 张",
      report.discovered,
      report.annotated.len(),
      report.failures.len()
    );
    report
  }
}

fn process_one<T, O>(path: &Path, transport: &T, output: &O, report: &mut BatchReport)
where
  T: Transport,
  O: Render,
  O::Error: std::fmt::Display,
{
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy())
    .unwrap_or_default();
  let subfolder = path
    .parent()
    .and_then(|p| p.file_name())
    .map(|n| n.to_string_lossy())
    .unwrap_or_default();
  info!("处理中: [{}] {}...", subfolder, file_name);

  let response = match transport.submit(path) {
    Ok(Submission::Detected(response)) => response,
    Ok(Submission::Rejected { status, body }) => {
      error!("服务错误 ({}): {}", status, body);
      report.fail(path, FailureKind::Server, body);
      return;
    }
    Err(e) => {
      error!("连接失败: {}", e);
      report.fail(path, FailureKind::Connection, e.to_string());
      return;
    }
  };

  if !response.traffic_signs.is_empty() {
    info!("交通标志: {:?}", response.sign_labels());
  }
  if !response.general_objects.is_empty() {
    info!("通用目标: {:?}", response.object_labels());
  }

  match output.render_result(path, &response) {
    Ok(written) => report.annotated.push(written),
    Err(e) => {
      error!("无法绘制检测框: {}", e);
      report.fail(path, FailureKind::Render, e.to_string());
    }
  }
}
