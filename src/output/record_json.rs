// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/output/record_json.rs - JSON 检测记录输出
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

use std::path::Path;

use chrono::Utc;
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::output::Render;
use crate::pipeline::TiledDetection;
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum RecordJsonError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 单条检测记录，字段与检测服务的持久化模式对齐
#[derive(Serialize)]
struct DetectionRecord<'a> {
  bbox_x1: f32,
  bbox_y1: f32,
  bbox_x2: f32,
  bbox_y2: f32,
  confidence: f32,
  class_id: u32,
  class_name: &'a str,
}

#[derive(Serialize)]
struct RunRecord<'a> {
  generated_at: String,
  image_width: u32,
  image_height: u32,
  tile_count: usize,
  raw_candidates: usize,
  dropped_invalid: usize,
  detections: Vec<DetectionRecord<'a>>,
}

/// 将合并后的检测结果写为 JSON 文件
pub struct RecordJsonOutput {
  path: String,
}

impl FromUrlWithScheme for RecordJsonOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for RecordJsonOutput {
  type Error = RecordJsonError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordJsonError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(RecordJsonOutput {
      path: url.path().to_string(),
    })
  }
}

impl Render for RecordJsonOutput {
  type Error = RecordJsonError;

  fn render_result(&self, _image: &RgbImage, result: &TiledDetection) -> Result<(), Self::Error> {
    let record = RunRecord {
      generated_at: Utc::now().to_rfc3339(),
      image_width: result.image_width,
      image_height: result.image_height,
      tile_count: result.tile_count,
      raw_candidates: result.raw_candidates,
      dropped_invalid: result.dropped_invalid,
      detections: result
        .detections
        .iter()
        .map(|det| DetectionRecord {
          bbox_x1: det.bbox[0],
          bbox_y1: det.bbox[1],
          bbox_x2: det.bbox[2],
          bbox_y2: det.bbox[3],
          confidence: det.confidence,
          class_id: det.class_id,
          class_name: &det.class_name,
        })
        .collect(),
    };

    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&self.path, json)?;
    info!("保存检测记录到文件: {}", self.path);

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::GlobalDetection;

  #[test]
  fn record_serializes_schema_fields() {
    let result = TiledDetection {
      detections: vec![GlobalDetection {
        bbox: [390.0, 100.0, 430.0, 140.0],
        confidence: 0.9,
        class_id: 3,
        class_name: "duct".to_string(),
      }],
      image_width: 800,
      image_height: 400,
      tile_count: 2,
      raw_candidates: 2,
      dropped_invalid: 0,
    };

    let record = RunRecord {
      generated_at: Utc::now().to_rfc3339(),
      image_width: result.image_width,
      image_height: result.image_height,
      tile_count: result.tile_count,
      raw_candidates: result.raw_candidates,
      dropped_invalid: result.dropped_invalid,
      detections: result
        .detections
        .iter()
        .map(|det| DetectionRecord {
          bbox_x1: det.bbox[0],
          bbox_y1: det.bbox[1],
          bbox_x2: det.bbox[2],
          bbox_y2: det.bbox[3],
          confidence: det.confidence,
          class_id: det.class_id,
          class_name: &det.class_name,
        })
        .collect(),
    };

    let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
    assert_eq!(json["detections"][0]["bbox_x1"], 390.0);
    assert_eq!(json["detections"][0]["class_name"], "duct");
    assert_eq!(json["tile_count"], 2);
  }
}
