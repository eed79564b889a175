// 该文件是 Guanwu （观物） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use guanwu::assets::{DirAssetStore, Provisioner};
use guanwu::input::create_input_source;
use guanwu::labels::LabelTable;
use guanwu::net::{ModelFiles, NetworkLoader};
use guanwu::output::create_output_writer;
use guanwu::session::DetectorSession;
use guanwu::task::{OneShotTask, PreviewTask, Task};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("资源目录: {}", args.assets);
  info!("输入来源: {}", args.input);
  info!("输出: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  run(args)
}

#[cfg(feature = "opencv_dnn")]
fn run(args: args::Args) -> Result<()> {
  run_with_loader(guanwu::net::CaffeDnnLoader, args)
}

#[cfg(not(feature = "opencv_dnn"))]
fn run(_args: args::Args) -> Result<()> {
  anyhow::bail!("未启用任何推理后端（需要 opencv_dnn 特性），无法加载模型")
}

#[cfg_attr(not(feature = "opencv_dnn"), allow(dead_code))]
fn run_with_loader<L: NetworkLoader>(loader: L, args: args::Args) -> Result<()> {
  // 把打包资源复制到可写暂存目录，推理库按路径读取
  info!("正在暂存模型资源...");
  let store = DirAssetStore::new(&args.assets);
  let provisioner = Provisioner::session_under(&args.staging);
  let files = ModelFiles {
    definition: provisioner.provision(&store, &args.definition)?,
    weights: provisioner.provision(&store, &args.weights)?,
  };

  let mut session = DetectorSession::new(loader, files, LabelTable::voc(), args.confidence);

  info!("正在打开输入源...");
  let input = create_input_source(&args.input)?;
  info!("输入源已打开: {}x{}", input.width(), input.height());

  info!("正在创建输出...");
  let mut output = create_output_writer(&args.output)?;

  if args.oneshot {
    OneShotTask.run_task(input, &mut session, output.as_mut())
  } else {
    let frame_number = (args.max_frames > 0).then_some(args.max_frames as usize);
    PreviewTask::default()
      .with_frame_number(frame_number)
      .run_task(input, &mut session, output.as_mut())
  }
}
