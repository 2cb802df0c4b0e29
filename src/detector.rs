// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/detector.rs - 检测器接口与内置墨迹检测器
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

use std::collections::BTreeMap;
use std::convert::Infallible;

use image::imageops;
use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::detection::RawDetection;
use crate::{FromUrl, FromUrlWithScheme};

/// 外部检测器接口
///
/// 编排器对检测器的实现方式（模型结构、权重、批处理）完全无感，
/// 只依赖该签名：输入一个瓦片图像与置信度阈值，返回瓦片局部坐标
/// 的候选检测。瓦片推理可能在多个工作线程上并发进行，实现必须
/// 可跨线程共享。
pub trait Detector: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(
    &self,
    tile: &RgbImage,
    confidence_threshold: f32,
  ) -> Result<Vec<RawDetection>, Self::Error>;
}

/// 默认墨迹灰度阈值，低于该值的像素视为前景
pub const DEFAULT_INK_THRESHOLD: u8 = 128;
/// 默认最小连通域像素数
pub const DEFAULT_MIN_AREA: u32 = 64;
/// 内置检测器输出的类别名称
pub const CONTOUR_CLASS_NAME: &str = "component";

#[derive(Error, Debug)]
pub enum ContourDetectorError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("检测器参数 '{name}' 无效: {value}")]
  InvalidParameter { name: String, value: String },
}

/// 内置连通域墨迹检测器
///
/// 将瓦片二值化为墨迹/底色，提取八连通前景区域的外接框作为候选检测。
/// 置信度取连通域的填充率（前景像素数 / 外接框面积）。输出只依赖
/// 瓦片像素内容，同一瓦片的结果完全可重现，因此也适合作为编排器
/// 测试所需的确定性检测器。
#[derive(Debug, Clone)]
pub struct ContourDetector {
  /// 墨迹灰度阈值
  ink_threshold: u8,
  /// 最小连通域像素数
  min_area: u32,
}

impl Default for ContourDetector {
  fn default() -> Self {
    Self {
      ink_threshold: DEFAULT_INK_THRESHOLD,
      min_area: DEFAULT_MIN_AREA,
    }
  }
}

impl ContourDetector {
  pub fn new(ink_threshold: u8, min_area: u32) -> Self {
    Self {
      ink_threshold,
      min_area,
    }
  }

  fn binarize(&self, tile: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(tile);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
      if gray.get_pixel(x, y)[0] <= self.ink_threshold {
        Luma([255u8])
      } else {
        Luma([0u8])
      }
    })
  }
}

impl FromUrlWithScheme for ContourDetector {
  const SCHEME: &'static str = "contour";
}

impl FromUrl for ContourDetector {
  type Error = ContourDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ContourDetectorError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let mut detector = ContourDetector::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "ink" => {
          detector.ink_threshold =
            value
              .parse()
              .map_err(|_| ContourDetectorError::InvalidParameter {
                name: "ink".to_string(),
                value: value.to_string(),
              })?;
        }
        "min_area" => {
          detector.min_area =
            value
              .parse()
              .map_err(|_| ContourDetectorError::InvalidParameter {
                name: "min_area".to_string(),
                value: value.to_string(),
              })?;
        }
        _ => {}
      }
    }

    Ok(detector)
  }
}

impl Detector for ContourDetector {
  type Error = Infallible;

  fn detect(
    &self,
    tile: &RgbImage,
    confidence_threshold: f32,
  ) -> Result<Vec<RawDetection>, Self::Error> {
    if tile.width() == 0 || tile.height() == 0 {
      return Ok(Vec::new());
    }

    let binary = self.binarize(tile);
    let labeled = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    // 按标签号累积外接框，BTreeMap 保证输出顺序确定
    let mut regions: BTreeMap<u32, (u32, u32, u32, u32, u32)> = BTreeMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
      let label = label[0];
      if label == 0 {
        continue;
      }
      regions
        .entry(label)
        .and_modify(|(min_x, min_y, max_x, max_y, count)| {
          *min_x = (*min_x).min(x);
          *min_y = (*min_y).min(y);
          *max_x = (*max_x).max(x);
          *max_y = (*max_y).max(y);
          *count += 1;
        })
        .or_insert((x, y, x, y, 1));
    }

    let detections: Vec<RawDetection> = regions
      .into_values()
      .filter(|&(_, _, _, _, count)| count >= self.min_area)
      .filter_map(|(min_x, min_y, max_x, max_y, count)| {
        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        let confidence = (count as f32 / (width * height) as f32).clamp(0.0, 1.0);
        if confidence < confidence_threshold {
          return None;
        }
        Some(RawDetection {
          // 外接框右下边界取开区间
          bbox: [
            min_x as f32,
            min_y as f32,
            (max_x + 1) as f32,
            (max_y + 1) as f32,
          ],
          confidence,
          class_id: 0,
          class_name: CONTOUR_CLASS_NAME.to_string(),
        })
      })
      .collect();

    debug!("瓦片 {}x{} 检出 {} 个连通域", tile.width(), tile.height(), detections.len());

    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  /// 白底图像上画一个黑色实心矩形
  fn blueprint_with_rect(w: u32, h: u32, rect: (u32, u32, u32, u32)) -> RgbImage {
    let mut image = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    let (x0, y0, x1, y1) = rect;
    for y in y0..y1 {
      for x in x0..x1 {
        image.put_pixel(x, y, Rgb([0, 0, 0]));
      }
    }
    image
  }

  #[test]
  fn solid_rectangle_is_detected_with_exact_bbox() {
    let image = blueprint_with_rect(100, 80, (20, 10, 50, 40));
    let detector = ContourDetector::new(128, 16);
    let detections = detector.detect(&image, 0.25).unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, [20.0, 10.0, 50.0, 40.0]);
    assert_eq!(detections[0].confidence, 1.0);
    assert_eq!(detections[0].class_name, CONTOUR_CLASS_NAME);
  }

  #[test]
  fn blank_tile_yields_no_detections() {
    let image = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
    let detector = ContourDetector::default();
    assert!(detector.detect(&image, 0.25).unwrap().is_empty());
  }

  #[test]
  fn regions_below_min_area_are_ignored() {
    let image = blueprint_with_rect(64, 64, (10, 10, 13, 13));
    let detector = ContourDetector::new(128, 64);
    assert!(detector.detect(&image, 0.25).unwrap().is_empty());
  }

  #[test]
  fn separate_rectangles_produce_separate_detections() {
    let mut image = blueprint_with_rect(120, 60, (10, 10, 30, 30));
    for y in 20..50 {
      for x in 70..100 {
        image.put_pixel(x, y, Rgb([0, 0, 0]));
      }
    }
    let detector = ContourDetector::new(128, 16);
    let detections = detector.detect(&image, 0.25).unwrap();
    assert_eq!(detections.len(), 2);
  }

  #[test]
  fn from_url_parses_parameters() {
    let url = Url::parse("contour://detector?ink=100&min_area=32").unwrap();
    let detector = ContourDetector::from_url(&url).unwrap();
    assert_eq!(detector.ink_threshold, 100);
    assert_eq!(detector.min_area, 32);
  }

  #[test]
  fn from_url_rejects_wrong_scheme() {
    let url = Url::parse("yolo://detector").unwrap();
    assert!(matches!(
      ContourDetector::from_url(&url),
      Err(ContourDetectorError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn from_url_rejects_bad_parameter_value() {
    let url = Url::parse("contour://detector?ink=dark").unwrap();
    assert!(matches!(
      ContourDetector::from_url(&url),
      Err(ContourDetectorError::InvalidParameter { .. })
    ));
  }
}
