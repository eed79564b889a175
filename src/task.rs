// 该文件是 Guanwu （观物） 项目的一部分。
// src/task.rs - 会话任务驱动
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

use std::{thread, time::Duration};

use anyhow::Result;
use tracing::{info, warn};

use crate::input::InputSource;
use crate::net::NetworkLoader;
use crate::output::OutputWriter;
use crate::session::DetectorSession;

/// 任务：驱动采集源 → 会话 → 输出的一轮完整流程
///
/// 会话的启动（on_camera_started，此时才知道帧尺寸）与收尾
/// （on_camera_stopped）都由任务负责，帧在任务线程里逐帧串行处理。
pub trait Task: Sized {
  fn run_task<L: NetworkLoader>(
    self,
    input: Box<dyn InputSource>,
    session: &mut DetectorSession<L>,
    output: &mut dyn OutputWriter,
  ) -> Result<()>;
}

/// 单帧任务：取第一帧、处理、写出后结束
pub struct OneShotTask;

impl Task for OneShotTask {
  fn run_task<L: NetworkLoader>(
    self,
    mut input: Box<dyn InputSource>,
    session: &mut DetectorSession<L>,
    output: &mut dyn OutputWriter,
  ) -> Result<()> {
    info!("开始任务...");
    session.on_camera_started(input.width(), input.height())?;

    let frame = input
      .next()
      .ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始处理...");

    let now = std::time::Instant::now();
    let processed = session.on_camera_frame(&frame);
    info!(
      "处理完成，耗时: {:.2?}, 检测到 {} 个目标",
      now.elapsed(),
      processed.detections.len()
    );

    output.write_frame(&processed.image, &processed.detections)?;
    output.finish()?;
    session.on_camera_stopped();

    Ok(())
  }
}

/// 连续预览任务：逐帧处理直到输入结束、到达帧数上限或收到中断
#[derive(Default, Debug)]
pub struct PreviewTask {
  frame_number: Option<usize>,
}

impl PreviewTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl Task for PreviewTask {
  fn run_task<L: NetworkLoader>(
    self,
    mut input: Box<dyn InputSource>,
    session: &mut DetectorSession<L>,
    output: &mut dyn OutputWriter,
  ) -> Result<()> {
    info!("开始任务...");
    session.on_camera_started(input.width(), input.height())?;

    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .expect("Error setting Ctrl-C handler");

    let mut frame_index = 0usize;
    let mut now = std::time::Instant::now();
    while let Some(frame_result) = input.next() {
      let frame = frame_result?;
      frame_index = (frame_index + 1) % usize::MAX;
      info!("处理第 {} 帧图像", frame_index);

      let processed = session.on_camera_frame(&frame);
      let elapsed_a = now.elapsed();
      output.write_frame(&processed.image, &processed.detections)?;
      let elapsed_b = now.elapsed();
      now = std::time::Instant::now();
      info!(
        "检测 {} 个目标，耗时: {:.2?} / {:.2?}",
        processed.detections.len(),
        elapsed_a,
        elapsed_b
      );

      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    output.finish()?;
    session.on_camera_stopped();

    info!("任务完成，退出");
    Ok(())
  }
}
