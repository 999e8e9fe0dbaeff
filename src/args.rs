// 该文件是 Lukou （路口） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use url::Url;

use crate::service::{
  DEFAULT_MAX_PAYLOAD_BYTES, OBJECT_CONFIDENCE_THRESHOLD, ServiceConfig,
  TRAFFIC_SIGN_CONFIDENCE_THRESHOLD,
};

pub const DEFAULT_GENERIC_MODEL_URL: &str =
  "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";

/// 置信度阈值必须在 [0, 1] 之间
fn parse_confidence(value: &str) -> Result<f32, String> {
  let threshold: f32 = value
    .parse()
    .map_err(|e| format!("无效的置信度 '{}': {}", value, e))?;
  if (0.0..=1.0).contains(&threshold) {
    Ok(threshold)
  } else {
    Err(format!("置信度 {} 超出范围 [0.0, 1.0]", threshold))
  }
}

/// 检测服务参数配置
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
  /// 监听地址
  #[arg(long, env = "LUKOU_LISTEN", default_value = "0.0.0.0:8000", value_name = "ADDR")]
  pub listen: SocketAddr,

  /// 交通标志专用模型文件路径（缺失时回退到通用模型）
  #[arg(
    long,
    env = "LUKOU_CUSTOM_MODEL",
    default_value = "traffic_custom.onnx",
    value_name = "FILE"
  )]
  pub custom_model: PathBuf,

  /// 通用模型文件路径（缺失时自动下载）
  #[arg(
    long,
    env = "LUKOU_GENERIC_MODEL",
    default_value = "yolov8n.onnx",
    value_name = "FILE"
  )]
  pub generic_model: PathBuf,

  /// 通用模型下载地址
  #[arg(
    long,
    env = "LUKOU_GENERIC_MODEL_URL",
    default_value = DEFAULT_GENERIC_MODEL_URL,
    value_name = "URL"
  )]
  pub generic_model_url: Url,

  /// 交通标志置信度阈值 (0.0 - 1.0)
  #[arg(
    long,
    env = "LUKOU_SIGN_CONFIDENCE",
    value_parser = parse_confidence,
    default_value_t = TRAFFIC_SIGN_CONFIDENCE_THRESHOLD,
    value_name = "THRESHOLD"
  )]
  pub sign_confidence: f32,

  /// 通用目标置信度阈值 (0.0 - 1.0)
  #[arg(
    long,
    env = "LUKOU_OBJECT_CONFIDENCE",
    value_parser = parse_confidence,
    default_value_t = OBJECT_CONFIDENCE_THRESHOLD,
    value_name = "THRESHOLD"
  )]
  pub object_confidence: f32,

  /// 单张图像最大字节数
  #[arg(
    long,
    env = "LUKOU_MAX_PAYLOAD_BYTES",
    default_value_t = DEFAULT_MAX_PAYLOAD_BYTES,
    value_name = "BYTES"
  )]
  pub max_payload_bytes: usize,
}

impl ServerArgs {
  pub fn service_config(&self) -> ServiceConfig {
    ServiceConfig {
      sign_confidence: self.sign_confidence,
      object_confidence: self.object_confidence,
      max_payload_bytes: self.max_payload_bytes,
    }
  }
}

/// 批处理客户端参数配置
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ClientArgs {
  /// 检测服务地址
  #[arg(
    long,
    env = "LUKOU_API_URL",
    default_value = "http://localhost:8000/detect",
    value_name = "URL"
  )]
  pub api_url: Url,

  /// 输入图像根目录（递归搜索 *.jpg, *.jpeg, *.png）
  #[arg(long, env = "LUKOU_INPUT", default_value = "test_images", value_name = "DIR")]
  pub input: PathBuf,

  /// 标注结果输出目录
  #[arg(long, env = "LUKOU_OUTPUT", default_value = "results", value_name = "DIR")]
  pub output: PathBuf,
}
