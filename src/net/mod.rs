// 该文件是 Guanwu （观物） 项目的一部分。
// src/net/mod.rs - 推理网络接口
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

use crate::blob::Blob;

#[cfg(feature = "opencv_dnn")]
mod opencv_dnn;
#[cfg(feature = "opencv_dnn")]
pub use self::opencv_dnn::{CaffeDnnError, CaffeDnnLoader, CaffeDnnNet};

/// 已加载的推理网络
///
/// forward 是同步阻塞调用，也是每帧的主要耗时。推理库不保证可重入，
/// 调用方必须逐帧串行调用（会话按 &mut 独占网络，由借用检查器保证）。
pub trait Network {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 设置输入张量并执行一次前向传播，返回平铺的原始输出
  fn forward(&mut self, blob: &Blob) -> Result<Vec<f32>, Self::Error>;
}

/// 网络装载器：从模型定义文件与权重文件构建网络
///
/// 每个相机会话只调用一次，且必须在第一帧到达之前完成。
pub trait NetworkLoader {
  type Net: Network;
  type Error: std::error::Error + Send + Sync + 'static;

  fn load(&self, definition: &Path, weights: &Path) -> Result<Self::Net, Self::Error>;
}

/// 暂存后的模型文件路径对
#[derive(Debug, Clone)]
pub struct ModelFiles {
  /// 模型定义文件（网络结构）
  pub definition: PathBuf,
  /// 模型权重文件
  pub weights: PathBuf,
}
