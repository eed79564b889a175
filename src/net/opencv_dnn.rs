// 该文件是 Guanwu （观物） 项目的一部分。
// src/net/opencv_dnn.rs - OpenCV DNN 推理后端
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

use opencv::core::{Mat, Scalar};
use opencv::dnn;
use opencv::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::blob::{Blob, SSD_INPUT_HEIGHT, SSD_INPUT_WIDTH};
use crate::net::{Network, NetworkLoader};

#[derive(Error, Debug)]
pub enum CaffeDnnError {
  #[error("OpenCV 错误: {0}")]
  Cv(#[from] opencv::Error),
  #[error("模型路径不是合法的 UTF-8: {0}")]
  BadPath(PathBuf),
}

/// 通过 OpenCV DNN 装载 Caffe 两件套（定义 + 权重）
pub struct CaffeDnnLoader;

impl NetworkLoader for CaffeDnnLoader {
  type Net = CaffeDnnNet;
  type Error = CaffeDnnError;

  fn load(&self, definition: &Path, weights: &Path) -> Result<CaffeDnnNet, CaffeDnnError> {
    let proto = definition
      .to_str()
      .ok_or_else(|| CaffeDnnError::BadPath(definition.to_path_buf()))?;
    let model = weights
      .to_str()
      .ok_or_else(|| CaffeDnnError::BadPath(weights.to_path_buf()))?;

    info!("加载 Caffe 模型: {} + {}", proto, model);
    let net = dnn::read_net_from_caffe(proto, model)?;
    info!("网络加载完成");

    Ok(CaffeDnnNet { net })
  }
}

pub struct CaffeDnnNet {
  net: dnn::Net,
}

impl Network for CaffeDnnNet {
  type Error = CaffeDnnError;

  fn forward(&mut self, blob: &Blob) -> Result<Vec<f32>, CaffeDnnError> {
    debug!("设置网络输入");
    let flat = Mat::from_slice(blob.data())?;
    let shape = [1, 3, SSD_INPUT_HEIGHT as i32, SSD_INPUT_WIDTH as i32];
    let input = flat.reshape_nd(1, &shape)?;
    self.net.set_input(&input, "", 1.0, Scalar::default())?;

    debug!("执行前向传播");
    let output = self.net.forward_single("")?;

    let flattened = output.reshape(1, 1)?;
    Ok(flattened.data_typed::<f32>()?.to_vec())
  }
}
