// 该文件是 Guanwu （观物） 项目的一部分。
// src/output/draw.rs - 检测结果标注
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detect::Detection;

// 标注常量
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_FONT_SIZE: f32 = 16.0;

/// 检测框与标签的绘制器
///
/// 对每个检测：绿色空心矩形框 + 框上方白底黑字的
/// `"<类别名>: <置信度>"` 标签。纯副作用渲染，
/// 对合法的 Detection 不会失败；没有检测时帧保持原样。
pub struct Annotator {
  font: FontArc,
  scale: PxScale,
}

impl Default for Annotator {
  fn default() -> Self {
    Self::new()
  }
}

impl Annotator {
  pub fn new() -> Self {
    // 使用内置的默认字体数据
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载内嵌字体");

    Self {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  /// 把所有检测按顺序画到帧上
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      self.draw_one(image, detection);
    }
  }

  fn draw_one(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    // 像素矩形可能部分越界，绘制前裁剪到帧内
    let left = detection.left.clamp(0, w - 1);
    let top = detection.top.clamp(0, h - 1);
    let right = detection.right.clamp(0, w - 1);
    let bottom = detection.bottom.clamp(0, h - 1);

    if right > left && bottom > top {
      // 两个角点都是框的一部分，矩形按闭区间落笔
      let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }

    let label = format!("{}: {}", detection.label, detection.confidence);
    let (text_width, text_height) = text_size(self.scale, &self.font, &label);

    // 标签背景贴在检测框上沿的正上方，超出帧边界时收窄
    let bg_left = left;
    let bg_top = (top - text_height as i32).max(0);
    let bg_width = (text_width as i32).min(w - bg_left);
    let bg_height = (text_height as i32).min(h - bg_top);

    if bg_width > 0 && bg_height > 0 {
      let rect = Rect::at(bg_left, bg_top).of_size(bg_width as u32, bg_height as u32);
      draw_filled_rect_mut(image, rect, LABEL_BACKGROUND);
      draw_text_mut(
        image,
        LABEL_TEXT_COLOR,
        bg_left,
        bg_top,
        self.scale,
        &self.font,
        &label,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gray_frame(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([90, 90, 90]))
  }

  fn detection(left: i32, top: i32, right: i32, bottom: i32) -> Detection {
    Detection {
      class_id: 8,
      label: "cat".to_string(),
      confidence: 0.5,
      left,
      top,
      right,
      bottom,
    }
  }

  #[test]
  fn no_detections_leaves_frame_untouched() {
    let frame = gray_frame(64, 64);
    let mut annotated = frame.clone();
    Annotator::new().draw_detections(&mut annotated, &[]);
    assert_eq!(frame.as_raw(), annotated.as_raw());
  }

  #[test]
  fn box_edges_are_green() {
    let mut frame = gray_frame(100, 100);
    Annotator::new().draw_detections(&mut frame, &[detection(10, 30, 60, 80)]);
    // 左边框中段（远离标签区域）
    assert_eq!(frame.get_pixel(10, 55), &Rgb([0, 255, 0]));
    // 下边框
    assert_eq!(frame.get_pixel(35, 80), &Rgb([0, 255, 0]));
    // 框内部不填充
    assert_eq!(frame.get_pixel(35, 55), &Rgb([90, 90, 90]));
  }

  #[test]
  fn label_background_sits_above_the_box() {
    let mut frame = gray_frame(200, 200);
    Annotator::new().draw_detections(&mut frame, &[detection(20, 100, 120, 180)]);
    // 框上沿正上方出现非原色像素（白底或黑字）
    let changed = (0..100u32)
      .flat_map(|y| (20..120u32).map(move |x| (x, y)))
      .any(|(x, y)| frame.get_pixel(x, y) != &Rgb([90, 90, 90]));
    assert!(changed);
  }

  #[test]
  fn partially_out_of_frame_detection_does_not_panic() {
    let mut frame = gray_frame(50, 50);
    let annotator = Annotator::new();
    annotator.draw_detections(&mut frame, &[detection(-10, -10, 70, 70)]);
    annotator.draw_detections(&mut frame, &[detection(45, 0, 49, 3)]);
    // 退化矩形（右下与左上重合）也应被安全跳过
    annotator.draw_detections(&mut frame, &[detection(30, 30, 30, 30)]);
  }
}
