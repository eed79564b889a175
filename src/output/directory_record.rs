// 该文件是 Guanwu （观物） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use image::RgbImage;
use tracing::debug;

use super::OutputWriter;
use crate::detect::Detection;

/// 目录记录输出
///
/// 把标注后的帧按 年/月/日 的目录结构落盘，旁边写一份同名的
/// JSON 检测记录，便于事后回看会话。默认只记录有检测的帧，
/// always 置真则每帧都记。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  always: bool,
  frame_counter: u16,
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, always: bool) -> Self {
    Self {
      directory: directory.into(),
      always,
      frame_counter: 0,
    }
  }

  fn next_frame_id(&mut self) -> u16 {
    self.frame_counter = self.frame_counter.wrapping_add(1);
    self.frame_counter
  }

  fn frame_path(&mut self) -> Result<PathBuf> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)
        .with_context(|| format!("无法创建记录目录: {}", directory.display()))?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.next_frame_id()
    )))
  }

  fn record_json(detections: &[Detection]) -> serde_json::Value {
    let records: Vec<serde_json::Value> = detections
      .iter()
      .map(|det| {
        serde_json::json!({
          "class_id": det.class_id,
          "label": det.label,
          "confidence": det.confidence,
          "box": [det.left, det.top, det.right, det.bottom],
        })
      })
      .collect();
    serde_json::json!({ "detections": records })
  }
}

impl OutputWriter for DirectoryRecordOutput {
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()> {
    if detections.is_empty() && !self.always {
      debug!("无检测，跳过记录");
      return Ok(());
    }

    let path = self.frame_path()?;
    image
      .save(&path)
      .with_context(|| format!("无法保存记录帧: {}", path.display()))?;

    let record = Self::record_json(detections);
    let record_path = path.with_extension("json");
    std::fs::write(&record_path, serde_json::to_string_pretty(&record)?)
      .with_context(|| format!("无法写入检测记录: {}", record_path.display()))?;

    debug!("帧已记录到 {}", path.display());
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection() -> Detection {
    Detection {
      class_id: 15,
      label: "person".to_string(),
      confidence: 0.75,
      left: 10,
      top: 20,
      right: 110,
      bottom: 220,
    }
  }

  fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("guanwu-record-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
  }

  fn find_files(root: &PathBuf, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
      let Ok(entries) = std::fs::read_dir(&dir) else {
        continue;
      };
      for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
          pending.push(path);
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
          found.push(path);
        }
      }
    }
    found
  }

  #[test]
  fn records_frame_and_json() {
    let root = scratch_dir("basic");
    let mut output = DirectoryRecordOutput::new(&root, false);
    let image = RgbImage::from_pixel(32, 32, image::Rgb([0, 0, 0]));
    output.write_frame(&image, &[detection()]).unwrap();

    assert_eq!(find_files(&root, "png").len(), 1);
    let json_files = find_files(&root, "json");
    assert_eq!(json_files.len(), 1);

    let parsed: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&json_files[0]).unwrap()).unwrap();
    let records = parsed["detections"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["label"], "person");
    assert_eq!(records[0]["box"][2], 110);
  }

  #[test]
  fn empty_frames_are_skipped_unless_always() {
    let root = scratch_dir("skip");
    let image = RgbImage::from_pixel(16, 16, image::Rgb([0, 0, 0]));

    let mut output = DirectoryRecordOutput::new(&root, false);
    output.write_frame(&image, &[]).unwrap();
    assert!(find_files(&root, "png").is_empty());

    let mut always = DirectoryRecordOutput::new(&root, true);
    always.write_frame(&image, &[]).unwrap();
    assert_eq!(find_files(&root, "png").len(), 1);
  }
}
