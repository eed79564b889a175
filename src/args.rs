// 该文件是 Guanwu （观物） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;

/// Guanwu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 资源目录（打包的模型定义与权重文件所在目录）
  #[arg(long, value_name = "DIR")]
  pub assets: String,

  /// 模型定义文件的资源名
  #[arg(long, default_value = "MobileNetSSD_deploy.prototxt", value_name = "NAME")]
  pub definition: String,

  /// 模型权重文件的资源名
  #[arg(long, default_value = "MobileNetSSD_deploy.caffemodel", value_name = "NAME")]
  pub weights: String,

  /// 暂存目录（推理库只接受文件路径，资源先复制到这里）
  #[arg(long, default_value = "staging", value_name = "DIR")]
  pub staging: String,

  /// 输入来源（图片文件或 V4L2 摄像头设备路径）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.webp
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出（图片文件路径或记录目录）
  #[arg(long, value_name = "OUTPUT")]
  pub output: String,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 最大处理帧数（仅对摄像头有效，0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 只处理一帧后退出
  #[arg(long)]
  pub oneshot: bool,
}
