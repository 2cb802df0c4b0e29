// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/merge.rs - 类别感知 NMS 合并
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::detection::{GlobalDetection, MergedDetection};

/// 默认 NMS IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

#[derive(Error, Debug)]
pub enum MergeConfigError {
  #[error("IoU 阈值必须在 (0, 1] 区间内: {0}")]
  IouThresholdOutOfRange(f32),
  #[error("置信度阈值必须在 [0, 1) 区间内: {0}")]
  ConfidenceThresholdOutOfRange(f32),
}

/// NMS 合并策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeConfig {
  /// 去重 IoU 阈值 (0.0 - 1.0]，严格大于该值的同类重叠框被抑制
  pub iou_threshold: f32,
  /// 传递给检测器的置信度阈值 (0.0 - 1.0)
  pub confidence_threshold: f32,
}

impl Default for MergeConfig {
  fn default() -> Self {
    Self {
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }
}

impl MergeConfig {
  pub fn validate(&self) -> Result<(), MergeConfigError> {
    if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
      return Err(MergeConfigError::IouThresholdOutOfRange(self.iou_threshold));
    }
    if !(0.0..1.0).contains(&self.confidence_threshold) {
      return Err(MergeConfigError::ConfidenceThresholdOutOfRange(
        self.confidence_threshold,
      ));
    }
    Ok(())
  }
}

/// 合并结果与非致命诊断信息
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
  /// 去重后的检测结果
  pub detections: Vec<MergedDetection>,
  /// 因边界框退化而被丢弃的检测数量
  pub dropped_invalid: usize,
}

/// 计算两个边界框的 IoU
///
/// union 面积不为正时（零面积框）返回 0，避免除零。
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
  let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
  let intersection = inter_w * inter_h;

  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

/// 类别感知贪心 NMS
///
/// 按 class_id 分组，组内按置信度降序做贪心抑制；置信度相同时保留
/// 先出现的检测，保证结果确定。不同类别之间不做任何抑制：同一物体
/// 被预测为两个类别属于模型问题，不是瓦片重叠导致的重复。
/// 退化边界框（x_max ≤ x_min 或 y_max ≤ y_min）被丢弃并计数，
/// 不影响其余检测的合并。
pub fn merge_detections(detections: Vec<GlobalDetection>, config: &MergeConfig) -> MergeOutcome {
  let mut dropped_invalid = 0usize;

  // 按类别分组，组内保持输入顺序
  let mut class_groups: BTreeMap<u32, Vec<GlobalDetection>> = BTreeMap::new();
  for det in detections {
    if det.is_degenerate() {
      warn!("丢弃退化边界框: class={} bbox={:?}", det.class_name, det.bbox);
      dropped_invalid += 1;
      continue;
    }
    class_groups.entry(det.class_id).or_default().push(det);
  }

  let mut merged = Vec::new();
  for (_, mut group) in class_groups {
    // 稳定排序：置信度相同的检测维持输入先后顺序
    group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    while !group.is_empty() {
      let best = group.remove(0);
      group.retain(|det| iou(&best.bbox, &det.bbox) <= config.iou_threshold);
      merged.push(best);
    }
  }

  MergeOutcome {
    detections: merged,
    dropped_invalid,
  }
}
