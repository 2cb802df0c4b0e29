// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/detection.rs - 检测结果数据模型与坐标映射
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

use serde::{Deserialize, Serialize};

/// 单个瓦片上的原始检测结果，坐标为瓦片局部像素
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
  /// 边界框 [x_min, y_min, x_max, y_max]，瓦片局部像素坐标
  pub bbox: [f32; 4],
  /// 置信度 (0.0 - 1.0)
  pub confidence: f32,
  /// 类别索引
  pub class_id: u32,
  /// 类别名称
  pub class_name: String,
}

/// 映射到整图像素坐标后的检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalDetection {
  /// 边界框 [x_min, y_min, x_max, y_max]，整图像素坐标
  pub bbox: [f32; 4],
  /// 置信度 (0.0 - 1.0)
  pub confidence: f32,
  /// 类别索引
  pub class_id: u32,
  /// 类别名称
  pub class_name: String,
}

/// NMS 合并后的最终检测结果，结构与 [`GlobalDetection`] 一致
pub type MergedDetection = GlobalDetection;

impl RawDetection {
  /// 将瓦片局部坐标映射到整图坐标
  ///
  /// 纯平移：四个坐标各加上瓦片偏移量，置信度与类别原样保留。
  /// 此处不做任何越界裁剪，裁剪属于合并阶段或调用方的职责。
  pub fn to_global(&self, x_offset: u32, y_offset: u32) -> GlobalDetection {
    let (dx, dy) = (x_offset as f32, y_offset as f32);
    GlobalDetection {
      bbox: [
        self.bbox[0] + dx,
        self.bbox[1] + dy,
        self.bbox[2] + dx,
        self.bbox[3] + dy,
      ],
      confidence: self.confidence,
      class_id: self.class_id,
      class_name: self.class_name.clone(),
    }
  }
}

impl GlobalDetection {
  /// 边界框是否退化（空框或反向框）
  pub fn is_degenerate(&self) -> bool {
    self.bbox[2] <= self.bbox[0] || self.bbox[3] <= self.bbox[1]
  }

  /// 边界框面积（像素）
  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]) * (self.bbox[3] - self.bbox[1])
  }

  /// 将边界框裁剪到整图范围内
  pub fn clamp_to(mut self, width: u32, height: u32) -> Self {
    let (w, h) = (width as f32, height as f32);
    self.bbox[0] = self.bbox[0].clamp(0.0, w);
    self.bbox[1] = self.bbox[1].clamp(0.0, h);
    self.bbox[2] = self.bbox[2].clamp(0.0, w);
    self.bbox[3] = self.bbox[3].clamp(0.0, h);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(bbox: [f32; 4]) -> RawDetection {
    RawDetection {
      bbox,
      confidence: 0.8,
      class_id: 3,
      class_name: "duct".to_string(),
    }
  }

  #[test]
  fn to_global_adds_tile_offset_exactly() {
    let det = raw([30.0, 100.0, 70.0, 140.0]);
    let global = det.to_global(360, 0);
    assert_eq!(global.bbox, [390.0, 100.0, 430.0, 140.0]);
    assert_eq!(global.confidence, det.confidence);
    assert_eq!(global.class_id, det.class_id);
    assert_eq!(global.class_name, det.class_name);
  }

  #[test]
  fn to_global_with_zero_offset_is_identity() {
    let det = raw([1.5, 2.5, 3.5, 4.5]);
    let global = det.to_global(0, 0);
    assert_eq!(global.bbox, det.bbox);
  }

  #[test]
  fn clamp_to_keeps_inner_box_untouched() {
    let det = raw([10.0, 20.0, 30.0, 40.0]).to_global(0, 0);
    let clamped = det.clamp_to(100, 100);
    assert_eq!(clamped.bbox, [10.0, 20.0, 30.0, 40.0]);
  }

  #[test]
  fn clamp_to_cuts_overhanging_box() {
    let det = raw([-5.0, 90.0, 120.0, 130.0]).to_global(0, 0);
    let clamped = det.clamp_to(100, 100);
    assert_eq!(clamped.bbox, [0.0, 90.0, 100.0, 100.0]);
  }

  #[test]
  fn degenerate_boxes_are_detected() {
    assert!(raw([10.0, 10.0, 10.0, 20.0]).to_global(0, 0).is_degenerate());
    assert!(raw([10.0, 20.0, 20.0, 20.0]).to_global(0, 0).is_degenerate());
    assert!(raw([30.0, 10.0, 20.0, 20.0]).to_global(0, 0).is_degenerate());
    assert!(!raw([10.0, 10.0, 20.0, 20.0]).to_global(0, 0).is_degenerate());
  }
}
