// 该文件是 Guanwu （观物） 项目的一部分。
// src/labels.rs - 类别标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// Pascal VOC 数据集类别名称，索引 0 为背景占位
pub const VOC_CLASSES: [&str; 21] = [
  "background",
  "aeroplane",
  "bicycle",
  "bird",
  "boat",
  "bottle",
  "bus",
  "car",
  "cat",
  "chair",
  "cow",
  "diningtable",
  "dog",
  "horse",
  "motorbike",
  "person",
  "pottedplant",
  "sheep",
  "sofa",
  "train",
  "tvmonitor",
];

/// 有序类别标签表，按类别编号查询
///
/// 标签表在会话期间不变。类别编号越界由调用方（解码器）显式报错，
/// 这里只返回 None。
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  /// 内置的 VOC 21 类标签表（MobileNet-SSD Caffe 模型的训练类别）
  pub fn voc() -> Self {
    Self::from_names(VOC_CLASSES.iter().map(|name| name.to_string()))
  }

  /// 从自定义名称序列构建标签表
  pub fn from_names<I>(names: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    Self {
      names: names.into_iter().collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 按类别编号查询名称，越界返回 None
  pub fn name(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(|name| name.as_str())
  }
}

impl Default for LabelTable {
  fn default() -> Self {
    Self::voc()
  }
}
