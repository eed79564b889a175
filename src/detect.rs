// 该文件是 Guanwu （观物） 项目的一部分。
// src/detect.rs - 检测结果解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::debug;

use crate::labels::LabelTable;

/// 原始输出的记录宽度：[批号, 类别, 置信度, xmin, ymin, xmax, ymax]
pub const DETECTION_RECORD_WIDTH: usize = 7;
/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.2;

/// 解码后的单个检测：像素坐标矩形 + 已解析的类别名
///
/// 坐标由归一化值乘以帧宽高后截断得到，可能超出帧边界，
/// 绘制层负责裁剪。
#[derive(Debug, Clone)]
pub struct Detection {
  pub class_id: usize,
  pub label: String,
  pub confidence: f32,
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("输出张量长度 {len} 不是记录宽度 {DETECTION_RECORD_WIDTH} 的整数倍")]
  MalformedOutput { len: usize },
  #[error("类别编号 {class_id} 超出标签表范围 (共 {classes} 类)")]
  ClassOutOfRange { class_id: i64, classes: usize },
}

/// 原始输出张量按固定宽度记录重排后的视图
///
/// 构建时校验长度，之后的字段访问不再需要边界检查。
pub struct DetectionSet<'a> {
  data: &'a [f32],
}

impl<'a> DetectionSet<'a> {
  pub fn from_raw(data: &'a [f32]) -> Result<Self, DecodeError> {
    if data.len() % DETECTION_RECORD_WIDTH != 0 {
      return Err(DecodeError::MalformedOutput { len: data.len() });
    }
    Ok(Self { data })
  }

  /// 记录条数
  pub fn len(&self) -> usize {
    self.data.len() / DETECTION_RECORD_WIDTH
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 按原始顺序遍历记录
  pub fn records(&self) -> impl Iterator<Item = DetectionRecord<'a>> {
    self
      .data
      .chunks_exact(DETECTION_RECORD_WIDTH)
      .map(DetectionRecord)
  }
}

/// 单条 7 字段记录的类型化视图
pub struct DetectionRecord<'a>(&'a [f32]);

impl DetectionRecord<'_> {
  /// 类别编号（字段 1，截断取整）
  pub fn class_id(&self) -> i64 {
    self.0[1] as i64
  }

  /// 置信度（字段 2）
  pub fn confidence(&self) -> f32 {
    self.0[2]
  }

  /// 归一化包围框 [xmin, ymin, xmax, ymax]
  pub fn bbox(&self) -> [f32; 4] {
    [self.0[3], self.0[4], self.0[5], self.0[6]]
  }
}

/// 把原始输出解码为检测列表
///
/// 置信度不大于阈值的记录整条跳过；保留记录的类别编号必须落在
/// 标签表内，否则整体解码失败。输出顺序与记录顺序一致，
/// 不去重、不做 NMS：同一目标出现多个重叠框是该网络原始输出的
/// 既有行为。
pub fn decode(
  raw: &[f32],
  labels: &LabelTable,
  threshold: f32,
  frame_width: u32,
  frame_height: u32,
) -> Result<Vec<Detection>, DecodeError> {
  let set = DetectionSet::from_raw(raw)?;
  let mut detections = Vec::new();

  for record in set.records() {
    let confidence = record.confidence();
    if confidence <= threshold {
      continue;
    }

    let class_id = record.class_id();
    let label = if class_id >= 0 {
      labels.name(class_id as usize)
    } else {
      None
    };
    let Some(label) = label else {
      return Err(DecodeError::ClassOutOfRange {
        class_id,
        classes: labels.len(),
      });
    };

    debug!("检测到类别 {} ({}), 置信度 {:.3}", class_id, label, confidence);

    let [xmin, ymin, xmax, ymax] = record.bbox();
    detections.push(Detection {
      class_id: class_id as usize,
      label: label.to_string(),
      confidence,
      left: (xmin * frame_width as f32) as i32,
      top: (ymin * frame_height as f32) as i32,
      right: (xmax * frame_width as f32) as i32,
      bottom: (ymax * frame_height as f32) as i32,
    });
  }

  Ok(detections)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(class_id: f32, confidence: f32, bbox: [f32; 4]) -> [f32; 7] {
    [0.0, class_id, confidence, bbox[0], bbox[1], bbox[2], bbox[3]]
  }

  #[test]
  fn cat_scenario() {
    let raw = record(8.0, 0.5, [0.1, 0.1, 0.5, 0.5]);
    let detections = decode(&raw, &LabelTable::voc(), 0.2, 300, 300).unwrap();
    assert_eq!(detections.len(), 1);
    let det = &detections[0];
    assert_eq!(det.class_id, 8);
    assert_eq!(det.label, "cat");
    assert_eq!(
      (det.left, det.top, det.right, det.bottom),
      (30, 30, 150, 150)
    );
    assert_eq!(format!("{}: {}", det.label, det.confidence), "cat: 0.5");
  }

  #[test]
  fn threshold_is_strict() {
    let labels = LabelTable::voc();
    // 恰好等于阈值：不产出
    let raw = record(8.0, 0.2, [0.1, 0.1, 0.5, 0.5]);
    assert!(decode(&raw, &labels, 0.2, 300, 300).unwrap().is_empty());
    // 略高于阈值：产出
    let raw = record(8.0, 0.2 + f32::EPSILON, [0.1, 0.1, 0.5, 0.5]);
    assert_eq!(decode(&raw, &labels, 0.2, 300, 300).unwrap().len(), 1);
  }

  #[test]
  fn low_confidence_record_is_skipped() {
    let raw = record(8.0, 0.15, [0.1, 0.1, 0.5, 0.5]);
    assert!(decode(&raw, &LabelTable::voc(), 0.2, 300, 300).unwrap().is_empty());
  }

  #[test]
  fn class_out_of_range_fails_loudly() {
    let labels = LabelTable::voc();
    let raw = record(21.0, 0.9, [0.1, 0.1, 0.5, 0.5]);
    let err = decode(&raw, &labels, 0.2, 300, 300).unwrap_err();
    assert!(matches!(
      err,
      DecodeError::ClassOutOfRange { class_id: 21, classes: 21 }
    ));

    let raw = record(-1.0, 0.9, [0.1, 0.1, 0.5, 0.5]);
    assert!(matches!(
      decode(&raw, &labels, 0.2, 300, 300),
      Err(DecodeError::ClassOutOfRange { class_id: -1, .. })
    ));
  }

  #[test]
  fn out_of_range_below_threshold_is_never_read() {
    // 阈值过滤在类别检查之前：被跳过的记录不会触发越界错误
    let raw = record(99.0, 0.1, [0.1, 0.1, 0.5, 0.5]);
    assert!(decode(&raw, &LabelTable::voc(), 0.2, 300, 300).unwrap().is_empty());
  }

  #[test]
  fn malformed_length_is_rejected() {
    let raw = [0.0f32; 10];
    assert!(matches!(
      DetectionSet::from_raw(&raw),
      Err(DecodeError::MalformedOutput { len: 10 })
    ));
  }

  #[test]
  fn order_is_preserved_without_dedup() {
    let mut raw = Vec::new();
    raw.extend_from_slice(&record(15.0, 0.9, [0.0, 0.0, 0.5, 0.5]));
    raw.extend_from_slice(&record(12.0, 0.3, [0.2, 0.2, 0.8, 0.8]));
    raw.extend_from_slice(&record(15.0, 0.4, [0.0, 0.0, 0.5, 0.5]));
    let detections = decode(&raw, &LabelTable::voc(), 0.2, 100, 100).unwrap();
    let ids: Vec<usize> = detections.iter().map(|d| d.class_id).collect();
    assert_eq!(ids, vec![15, 12, 15]);
  }

  #[test]
  fn pixel_rects_stay_inside_frame_for_valid_inputs() {
    let cases = [
      [0.0, 0.0, 1.0, 1.0],
      [0.25, 0.5, 0.75, 0.5],
      [0.999, 0.001, 1.0, 0.002],
    ];
    for bbox in cases {
      let raw = record(1.0, 0.8, bbox);
      let det = &decode(&raw, &LabelTable::voc(), 0.2, 640, 480).unwrap()[0];
      assert!(0 <= det.left && det.left <= det.right && det.right <= 640);
      assert!(0 <= det.top && det.top <= det.bottom && det.bottom <= 480);
    }
  }
}
