// 该文件是 Lukou （路口） 项目的一部分。
// src/bin/batch_client.rs - 批量检测客户端入口
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use lukou::{
  FromUrl,
  args::ClientArgs,
  client::HttpTransport,
  input::ImageDirectoryInput,
  output::SaveImageFileOutput,
  task::{BatchTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = ClientArgs::parse();

  info!("检测服务地址: {}", args.api_url);
  info!("输入目录: {}", args.input.display());
  info!("输出目录: {}", args.output.display());

  let transport = HttpTransport::from_url(&args.api_url)?;
  let input = ImageDirectoryInput::discover(&args.input)?;
  let output = SaveImageFileOutput::new(&args.output)?;

  let now = std::time::Instant::now();
  let report = BatchTask.run_task(input, &transport, &output);
  info!(
    "耗时 {:.2?}, 标注结果保存在 '{}' ({} 张)",
    now.elapsed(),
    output.directory().display(),
    report.annotated.len()
  );

  Ok(())
}
