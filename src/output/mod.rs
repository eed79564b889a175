// 该文件是 Guanwu （观物） 项目的一部分。
// src/output/mod.rs - 输出模块
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

pub mod draw;

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "save_image_file")]
mod image_output;

#[cfg(feature = "directory_record")]
pub use directory_record::DirectoryRecordOutput;
#[cfg(feature = "save_image_file")]
pub use image_output::ImageOutput;

use anyhow::Result;
use image::RgbImage;

use crate::detect::Detection;

/// 输出写入器 trait：显示面的替身
///
/// 会话产出的已标注帧逐帧交给写入器，检测列表一并给出，
/// 供记录型输出落盘检测数据。
pub trait OutputWriter {
  /// 写入一帧（已标注）
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 创建输出写入器：图片扩展名写单张图片，其余视为记录目录
pub fn create_output_writer(output_path: &str) -> Result<Box<dyn OutputWriter>> {
  let lower = output_path.to_lowercase();

  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
  {
    #[cfg(feature = "save_image_file")]
    return Ok(Box::new(ImageOutput::new(output_path)?));
    #[cfg(not(feature = "save_image_file"))]
    anyhow::bail!("未启用 save_image_file 特性，无法保存图片: {}", output_path);
  }

  #[cfg(feature = "directory_record")]
  return Ok(Box::new(DirectoryRecordOutput::new(output_path, false)));
  #[cfg(not(feature = "directory_record"))]
  anyhow::bail!("未启用 directory_record 特性，无法写入记录目录: {}", output_path)
}
