// 该文件是 Lukou （路口） 项目的一部分。
// src/bin/detect_server.rs - 检测服务入口
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

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use lukou::{
  args::ServerArgs,
  fetch,
  model::{Detector, Yolov8Builder},
  server,
  service::{DetectionService, Loaded, load_with_fallback},
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = ServerArgs::parse();

  info!("监听地址: {}", args.listen);
  info!("专用模型: {}", args.custom_model.display());
  info!("通用模型: {}", args.generic_model.display());

  fetch::ensure_artifact(&args.generic_model, &args.generic_model_url).await?;

  let custom = args.custom_model.clone();
  let generic = args.generic_model.clone();
  let (traffic, objects) = tokio::task::spawn_blocking(move || {
    let loaded = load_with_fallback(&custom, &generic, |path| Yolov8Builder::new(path).build())?;
    let detectors: (Arc<dyn Detector>, Arc<dyn Detector>) = match loaded {
      // 回退时两个检测器共用同一个通用模型
      Loaded::GenericFallback { detector, .. } => {
        let shared: Arc<dyn Detector> = Arc::new(detector);
        (shared.clone(), shared)
      }
      Loaded::Custom(detector) => (
        Arc::new(detector),
        Arc::new(Yolov8Builder::new(&generic).build()?),
      ),
    };
    anyhow::Ok(detectors)
  })
  .await??;

  let service = Arc::new(DetectionService::new(
    traffic,
    objects,
    args.service_config(),
  ));

  let listener = TcpListener::bind(args.listen).await?;
  server::serve(listener, service).await?;

  Ok(())
}
