// 该文件是 Guanwu （观物） 项目的一部分。
// src/input/mod.rs - 采集输入源模块
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

#[cfg(feature = "read_image_file")]
mod image_source;
#[cfg(feature = "v4l2_input")]
mod v4l2_source;

use anyhow::Result;
use image::RgbaImage;

#[cfg(feature = "read_image_file")]
pub use image_source::ImageSource;
#[cfg(feature = "v4l2_input")]
pub use v4l2_source::V4l2Source;

/// 帧数据
///
/// 采集层保证缓冲形状合法：4 通道 RGBA，宽高在会话开始时已知。
pub struct Frame {
  /// RGBA 图像数据
  pub image: RgbaImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// V4L2 摄像头
  V4l2,
}

/// 采集输入源 trait
///
/// 对应采集面的三个回调：宽高在迭代开始前可查（会话开始），
/// 逐帧由迭代器产出，迭代结束即会话结束。
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建输入源
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  // 检查是否是 V4L2 设备
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    #[cfg(feature = "v4l2_input")]
    {
      let device_path = if source.starts_with("v4l2://") {
        source.trim_start_matches("v4l2://")
      } else {
        source
      };
      return Ok(Box::new(V4l2Source::new(device_path)?));
    }
    #[cfg(not(feature = "v4l2_input"))]
    anyhow::bail!("未启用 v4l2_input 特性，无法打开摄像头: {}", source);
  }

  // 检查是否是图片文件
  let lower = source.to_lowercase();
  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
    || lower.ends_with(".webp")
  {
    #[cfg(feature = "read_image_file")]
    return Ok(Box::new(ImageSource::new(source)?));
    #[cfg(not(feature = "read_image_file"))]
    anyhow::bail!("未启用 read_image_file 特性，无法读取图片: {}", source);
  }

  anyhow::bail!("无法识别的输入来源: {}", source)
}
