// 该文件是 Lukou （路口） 项目的一部分。
// tests/end_to_end.rs - 服务与批处理客户端联调
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

#![cfg(all(feature = "server", feature = "client"))]

mod common;

use url::Url;

use lukou::{
  FromUrl,
  client::{HttpTransport, Submission, Transport},
  input::ImageDirectoryInput,
  output::{
    SaveImageFileOutput,
    draw::{OBJECT_COLOR, SIGN_COLOR},
  },
  server::{DETECT_PATH, serve},
  service::ServiceConfig,
  task::{BatchTask, FailureKind, Task},
};

/// 在独立线程的运行时上启动服务，返回检测地址
fn spawn_server() -> Url {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  listener.set_nonblocking(true).unwrap();
  let addr = listener.local_addr().unwrap();

  std::thread::spawn(move || {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
      let listener = tokio::net::TcpListener::from_std(listener).unwrap();
      serve(listener, common::stub_service(ServiceConfig::default()))
        .await
        .unwrap();
    });
  });

  Url::parse(&format!("http://{}{}", addr, DETECT_PATH)).unwrap()
}

#[test]
fn single_submission_round_trip() {
  let transport = HttpTransport::from_url(&spawn_server()).unwrap();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("frame.png");
  common::write_file(&path, &common::png_bytes(48, 48));

  match transport.submit(&path).unwrap() {
    Submission::Detected(response) => {
      assert_eq!(response.sign_labels(), vec!["stop sign"]);
      assert_eq!(response.object_labels(), vec!["person"]);
    }
    other => panic!("unexpected submission: {:?}", other),
  }
}

#[test]
fn batch_annotates_every_readable_image() {
  let transport = HttpTransport::from_url(&spawn_server()).unwrap();
  let dir = tempfile::tempdir().unwrap();
  let input_root = dir.path().join("test_images");
  let output_root = dir.path().join("results");

  common::write_file(&input_root.join("day/a.png"), &common::png_bytes(120, 120));
  common::write_file(&input_root.join("night/b.PNG"), &common::png_bytes(150, 130));
  common::write_file(&input_root.join("night/broken.jpg"), b"not a jpeg");
  common::write_file(&input_root.join("notes.txt"), b"ignored");

  let input = ImageDirectoryInput::discover(&input_root).unwrap();
  assert_eq!(input.len(), 3);
  let output = SaveImageFileOutput::new(&output_root).unwrap();

  let report = BatchTask.run_task(input, &transport, &output);
  assert_eq!(report.discovered, 3);
  assert_eq!(report.annotated.len(), 2);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].kind, FailureKind::Server);
  assert!(report.failures[0].message.contains("detail"));

  let annotated = image::open(output_root.join("result_a.png"))
    .unwrap()
    .to_rgb8();
  assert_eq!(annotated.dimensions(), (120, 120));
  assert_eq!(*annotated.get_pixel(10, 70), SIGN_COLOR);
  assert_eq!(*annotated.get_pixel(60, 70), OBJECT_COLOR);

  let annotated = image::open(output_root.join("result_b.PNG")).unwrap();
  assert_eq!((annotated.width(), annotated.height()), (150, 130));
  assert!(!output_root.join("result_broken.jpg").exists());
}

#[test]
fn empty_input_creates_no_output() {
  let transport = HttpTransport::from_url(&spawn_server()).unwrap();
  let dir = tempfile::tempdir().unwrap();
  let output_root = dir.path().join("results");

  let input = ImageDirectoryInput::discover(dir.path().join("missing")).unwrap();
  let output = SaveImageFileOutput::new(&output_root).unwrap();
  let report = BatchTask.run_task(input, &transport, &output);

  assert_eq!(report.discovered, 0);
  assert!(!output_root.exists());
}

#[test]
fn unreachable_service_is_a_connection_failure() {
  // 绑定后立即释放，端口上没有服务
  let addr = std::net::TcpListener::bind("127.0.0.1:0")
    .unwrap()
    .local_addr()
    .unwrap();
  let url = Url::parse(&format!("http://{}{}", addr, DETECT_PATH)).unwrap();
  let transport = HttpTransport::from_url(&url).unwrap();

  let dir = tempfile::tempdir().unwrap();
  common::write_file(&dir.path().join("in/a.png"), &common::png_bytes(8, 8));
  let input = ImageDirectoryInput::discover(dir.path().join("in")).unwrap();
  let output = SaveImageFileOutput::new(dir.path().join("out")).unwrap();

  let report = BatchTask.run_task(input, &transport, &output);
  assert!(report.annotated.is_empty());
  assert_eq!(report.failures[0].kind, FailureKind::Connection);
}
