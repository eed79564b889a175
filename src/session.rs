// 该文件是 Guanwu （观物） 项目的一部分。
// src/session.rs - 检测会话与状态机
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

use image::RgbImage;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::blob::{Blob, drop_alpha};
use crate::detect::{DecodeError, Detection, decode};
use crate::input::Frame;
use crate::labels::LabelTable;
use crate::net::{ModelFiles, Network, NetworkLoader};
use crate::output::draw::Annotator;

/// 会话状态
///
/// Unloaded → Loading → Ready | Passthrough → Stopped。
/// 模型每会话只加载一次，Ready 之后不会再回到 Loading。
/// 加载失败进入 Passthrough：帧原样透传、不画任何检测框。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Unloaded,
  Loading,
  Ready,
  Passthrough,
  Stopped,
}

enum Stage<N> {
  Unloaded,
  Loading,
  Ready(N),
  Passthrough,
  Stopped,
}

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("会话已经启动，模型每个会话只加载一次")]
  AlreadyStarted,
}

/// 单帧处理中的失败，只影响当前帧
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("推理失败: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
  #[error("解码失败: {0}")]
  Decode(#[from] DecodeError),
}

/// 一帧的处理结果：标注后的帧 + 通过阈值的检测列表
pub struct ProcessedFrame {
  pub image: RgbImage,
  pub detections: Vec<Detection>,
}

/// 检测会话
///
/// 持有网络的唯一所有权，模型加载之后不可变。逐帧串行处理：
/// 预处理 → 推理 → 解码 → 标注，每帧处理完才接受下一帧
/// （process 按 &mut self 独占，推理调用不可重入）。
pub struct DetectorSession<L: NetworkLoader> {
  loader: L,
  files: ModelFiles,
  labels: LabelTable,
  threshold: f32,
  annotator: Annotator,
  stage: Stage<L::Net>,
  frame_size: Option<(u32, u32)>,
}

impl<L: NetworkLoader> DetectorSession<L> {
  pub fn new(loader: L, files: ModelFiles, labels: LabelTable, threshold: f32) -> Self {
    Self {
      loader,
      files,
      labels,
      threshold,
      annotator: Annotator::new(),
      stage: Stage::Unloaded,
      frame_size: None,
    }
  }

  pub fn state(&self) -> SessionState {
    match self.stage {
      Stage::Unloaded => SessionState::Unloaded,
      Stage::Loading => SessionState::Loading,
      Stage::Ready(_) => SessionState::Ready,
      Stage::Passthrough => SessionState::Passthrough,
      Stage::Stopped => SessionState::Stopped,
    }
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 会话开始时采集面报告的帧尺寸
  pub fn frame_size(&self) -> Option<(u32, u32)> {
    self.frame_size
  }

  /// 采集面报告会话开始（此时才知道帧尺寸），在这里完成一次性加载。
  ///
  /// 加载失败不致命：记录错误并转入 Passthrough，之后的帧原样透传。
  pub fn on_camera_started(&mut self, width: u32, height: u32) -> Result<SessionState, SessionError> {
    if !matches!(self.stage, Stage::Unloaded) {
      return Err(SessionError::AlreadyStarted);
    }

    self.frame_size = Some((width, height));
    self.stage = Stage::Loading;
    info!("相机会话开始 ({}x{}), 加载模型...", width, height);

    match self.loader.load(&self.files.definition, &self.files.weights) {
      Ok(net) => {
        info!("网络加载完成");
        self.stage = Stage::Ready(net);
      }
      Err(e) => {
        error!("模型加载失败，本会话不做检测: {}", e);
        self.stage = Stage::Passthrough;
      }
    }

    Ok(self.state())
  }

  /// 处理一帧：预处理 → 推理 → 解码 → 标注
  ///
  /// 单帧失败不会终止会话：告警后返回未标注的原帧。
  pub fn on_camera_frame(&mut self, frame: &Frame) -> ProcessedFrame {
    let mut image = drop_alpha(&frame.image);

    let Self {
      stage,
      labels,
      threshold,
      annotator,
      ..
    } = self;

    match stage {
      Stage::Ready(net) => match Self::run_detection(net, &image, labels, *threshold) {
        Ok(detections) => {
          annotator.draw_detections(&mut image, &detections);
          ProcessedFrame { image, detections }
        }
        Err(e) => {
          warn!("第 {} 帧处理失败，跳过该帧: {}", frame.index, e);
          ProcessedFrame {
            image,
            detections: Vec::new(),
          }
        }
      },
      Stage::Passthrough => ProcessedFrame {
        image,
        detections: Vec::new(),
      },
      _ => {
        warn!("会话未就绪（收到第 {} 帧），帧原样透传", frame.index);
        ProcessedFrame {
          image,
          detections: Vec::new(),
        }
      }
    }
  }

  /// 采集面报告会话结束，释放网络
  pub fn on_camera_stopped(&mut self) {
    info!("相机会话结束");
    self.stage = Stage::Stopped;
  }

  fn run_detection(
    net: &mut L::Net,
    image: &RgbImage,
    labels: &LabelTable,
    threshold: f32,
  ) -> Result<Vec<Detection>, PipelineError> {
    let blob = Blob::from_rgb(image);
    let raw = net
      .forward(&blob)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;
    let detections = decode(&raw, labels, threshold, image.width(), image.height())?;
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbaImage;
  use std::convert::Infallible;
  use std::path::{Path, PathBuf};

  // 返回固定输出的打桩网络
  struct StubNet {
    raw: Vec<f32>,
  }

  impl Network for StubNet {
    type Error = Infallible;

    fn forward(&mut self, _blob: &Blob) -> Result<Vec<f32>, Infallible> {
      Ok(self.raw.clone())
    }
  }

  struct StubLoader {
    raw: Vec<f32>,
  }

  impl NetworkLoader for StubLoader {
    type Net = StubNet;
    type Error = std::io::Error;

    fn load(&self, _definition: &Path, _weights: &Path) -> Result<StubNet, std::io::Error> {
      Ok(StubNet {
        raw: self.raw.clone(),
      })
    }
  }

  struct FailingLoader;

  impl NetworkLoader for FailingLoader {
    type Net = StubNet;
    type Error = std::io::Error;

    fn load(&self, _definition: &Path, _weights: &Path) -> Result<StubNet, std::io::Error> {
      Err(std::io::Error::other("模型文件损坏"))
    }
  }

  fn files() -> ModelFiles {
    ModelFiles {
      definition: PathBuf::from("deploy.prototxt"),
      weights: PathBuf::from("deploy.caffemodel"),
    }
  }

  fn frame(w: u32, h: u32) -> Frame {
    Frame {
      image: RgbaImage::from_pixel(w, h, image::Rgba([90, 90, 90, 255])),
      index: 0,
      timestamp_ms: 0,
    }
  }

  #[test]
  fn state_machine_happy_path() {
    let raw = vec![0.0, 8.0, 0.5, 0.1, 0.1, 0.5, 0.5];
    let mut session =
      DetectorSession::new(StubLoader { raw }, files(), LabelTable::voc(), 0.2);
    assert_eq!(session.state(), SessionState::Unloaded);

    let state = session.on_camera_started(300, 300).unwrap();
    assert_eq!(state, SessionState::Ready);
    assert_eq!(session.frame_size(), Some((300, 300)));

    let processed = session.on_camera_frame(&frame(300, 300));
    assert_eq!(processed.detections.len(), 1);
    assert_eq!(processed.detections[0].label, "cat");

    session.on_camera_stopped();
    assert_eq!(session.state(), SessionState::Stopped);
  }

  #[test]
  fn double_start_is_an_error() {
    let mut session = DetectorSession::new(
      StubLoader { raw: Vec::new() },
      files(),
      LabelTable::voc(),
      0.2,
    );
    session.on_camera_started(300, 300).unwrap();
    assert!(matches!(
      session.on_camera_started(300, 300),
      Err(SessionError::AlreadyStarted)
    ));
  }

  #[test]
  fn failed_load_degrades_to_passthrough() {
    let mut session = DetectorSession::new(FailingLoader, files(), LabelTable::voc(), 0.2);
    let state = session.on_camera_started(300, 300).unwrap();
    assert_eq!(state, SessionState::Passthrough);

    let input = frame(64, 64);
    let expected = drop_alpha(&input.image);
    let processed = session.on_camera_frame(&input);
    assert!(processed.detections.is_empty());
    assert_eq!(processed.image.as_raw(), expected.as_raw());
  }

  #[test]
  fn bad_frame_does_not_kill_the_session() {
    // 输出长度不是 7 的倍数 → 该帧解码失败，但会话保持 Ready
    let mut session = DetectorSession::new(
      StubLoader {
        raw: vec![0.0; 5],
      },
      files(),
      LabelTable::voc(),
      0.2,
    );
    session.on_camera_started(300, 300).unwrap();

    let input = frame(64, 64);
    let expected = drop_alpha(&input.image);
    let processed = session.on_camera_frame(&input);
    assert!(processed.detections.is_empty());
    assert_eq!(processed.image.as_raw(), expected.as_raw());
    assert_eq!(session.state(), SessionState::Ready);
  }

  #[test]
  fn frame_before_start_is_passed_through() {
    let mut session = DetectorSession::new(
      StubLoader { raw: Vec::new() },
      files(),
      LabelTable::voc(),
      0.2,
    );
    let processed = session.on_camera_frame(&frame(32, 32));
    assert!(processed.detections.is_empty());
    assert_eq!(session.state(), SessionState::Unloaded);
  }
}
