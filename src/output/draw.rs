// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use thiserror::Error;

use crate::detection::MergedDetection;
use crate::pipeline::TiledDetection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
// 按类别索引轮换的边框颜色
const CLASS_PALETTE: [[u8; 3]; 6] = [
  [0, 0, 255],
  [255, 0, 0],
  [0, 160, 0],
  [255, 128, 0],
  [160, 0, 160],
  [0, 160, 160],
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取错误: {0}")]
  FontIoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  FontInvalid(#[from] ab_glyph::InvalidFont),
}

/// 在整图上绘制合并后的检测框
///
/// 未配置字体时只画边框，不画类别标签。
pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: None,
    }
  }
}

impl Draw {
  /// 从字体文件加载标签字体
  pub fn with_font_file(path: &std::path::Path) -> Result<Self, DrawError> {
    let font_data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(font_data)?;
    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &TiledDetection) {
    for det in result.detections.iter() {
      let color = CLASS_PALETTE[(det.class_id as usize) % CLASS_PALETTE.len()];
      self.draw_bbox_with_label(image, det, color);
    }
  }

  // bbox 为整图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, det: &MergedDetection, color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x_min = (det.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (det.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (det.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (det.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框（加粗为2像素）
    for thickness in 0..2 {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);

      for x in x_min_t..=x_max_t {
        *image.get_pixel_mut(x as u32, y_min_t as u32) = Rgb(color);
        *image.get_pixel_mut(x as u32, y_max_t as u32) = Rgb(color);
      }
      for y in y_min_t..=y_max_t {
        *image.get_pixel_mut(x_min_t as u32, y as u32) = Rgb(color);
        *image.get_pixel_mut(x_max_t as u32, y as u32) = Rgb(color);
      }
    }

    let Some(font) = &self.font else {
      return;
    };

    // 标签文本放在边框上方
    let label = format!("{} {:.2}", det.class_name, det.confidence);
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]);

    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(color));
      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}
