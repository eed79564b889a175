// 该文件是 Guanwu （观物） 项目的一部分。
// src/blob.rs - 帧预处理与输入张量
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

use image::{Rgb, RgbImage, RgbaImage, imageops};

/// MobileNet-SSD 固定输入宽度
pub const SSD_INPUT_WIDTH: u32 = 300;
/// MobileNet-SSD 固定输入高度
pub const SSD_INPUT_HEIGHT: u32 = 300;
/// 归一化缩放系数（模型训练时的常量，运行时不可配置）
pub const SSD_SCALE_FACTOR: f32 = 0.007843;
/// 归一化均值（逐通道）
pub const SSD_MEAN: f32 = 127.5;

const BLOB_CHANNELS: usize = 3;

/// 丢弃 alpha 通道，把采集层送来的 4 通道帧转成 3 通道
pub fn drop_alpha(frame: &RgbaImage) -> RgbImage {
  let mut rgb = RgbImage::new(frame.width(), frame.height());
  for (dst, src) in rgb.pixels_mut().zip(frame.pixels()) {
    *dst = Rgb([src[0], src[1], src[2]]);
  }
  rgb
}

/// 网络输入张量，固定形状 1x3x300x300（NCHW，f32）
///
/// 每帧构建一次、推理后即丢弃。缩放到 300x300 时不做 letterbox，
/// 宽高比失真是该模型已知的近似处理方式。
#[derive(Debug, Clone)]
pub struct Blob {
  data: Box<[f32]>,
}

impl Blob {
  /// 从 3 通道帧构建输入张量
  ///
  /// 步骤固定：缩放到 300x300（三角滤波），逐通道 (v - 127.5) * 0.007843。
  pub fn from_rgb(image: &RgbImage) -> Self {
    let resized = imageops::resize(
      image,
      SSD_INPUT_WIDTH,
      SSD_INPUT_HEIGHT,
      imageops::FilterType::Triangle,
    );

    let plane = (SSD_INPUT_WIDTH * SSD_INPUT_HEIGHT) as usize;
    let mut data = vec![0f32; BLOB_CHANNELS * plane].into_boxed_slice();

    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = y as usize * SSD_INPUT_WIDTH as usize + x as usize;
      for c in 0..BLOB_CHANNELS {
        data[c * plane + idx] = (pixel[c] as f32 - SSD_MEAN) * SSD_SCALE_FACTOR;
      }
    }

    Self { data }
  }

  /// 张量数据，平铺为 NCHW 顺序
  pub fn data(&self) -> &[f32] {
    &self.data
  }

  /// 张量形状 [批, 通道, 高, 宽]
  pub fn shape(&self) -> [usize; 4] {
    [
      1,
      BLOB_CHANNELS,
      SSD_INPUT_HEIGHT as usize,
      SSD_INPUT_WIDTH as usize,
    ]
  }

  /// 按 (通道, 行, 列) 读取单个值
  pub fn at(&self, channel: usize, y: usize, x: usize) -> f32 {
    let plane = (SSD_INPUT_WIDTH * SSD_INPUT_HEIGHT) as usize;
    self.data[channel * plane + y * SSD_INPUT_WIDTH as usize + x]
  }
}
