// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/pipeline.rs - 分片推理编排
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

use image::{DynamicImage, RgbImage};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::detection::{GlobalDetection, MergedDetection};
use crate::detector::Detector;
use crate::merge::{MergeConfig, MergeConfigError, merge_detections};
use crate::tile::{Tile, TileConfigError, TileGridConfig, TileId, extract_tiles};

/// 网格或合并配置无效，在任何切片工作开始前拒绝
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("网格配置无效: {0}")]
  Grid(#[from] TileConfigError),
  #[error("合并配置无效: {0}")]
  Merge(#[from] MergeConfigError),
}

#[derive(Error, Debug)]
pub enum TiledDetectionError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  #[error("输入图像无效: {0}")]
  InvalidImage(String),
  #[error("网格配置无效: {0}")]
  Grid(#[from] TileConfigError),
  /// 单个瓦片推理失败会放弃整个请求：静默丢失一个瓦片的检测
  /// 会造成整图覆盖完整的假象
  #[error("瓦片 {tile} 推理失败: {source}")]
  TileInference { tile: TileId, source: E },
}

/// 一次分片推理的最终结果与统计信息
#[derive(Debug, Clone, Serialize)]
pub struct TiledDetection {
  /// 去重后的检测结果，坐标为整图像素
  pub detections: Vec<MergedDetection>,
  /// 整图宽度
  pub image_width: u32,
  /// 整图高度
  pub image_height: u32,
  /// 瓦片数量
  pub tile_count: usize,
  /// NMS 前的候选检测总数
  pub raw_candidates: usize,
  /// 因边界框退化而被丢弃的检测数量
  pub dropped_invalid: usize,
}

/// 分片推理编排器
///
/// 流水线：整图归一化 → 网格切片 → 逐瓦片调用外部检测器 →
/// 坐标映射回整图 → 全局类别感知 NMS。合并必须等待所有瓦片
/// 完成后全局执行一次：跨三个以上瓦片的物体只有在完整候选集
/// 上才能正确去重。
#[derive(Debug, Clone)]
pub struct TiledDetector {
  grid: TileGridConfig,
  merge: MergeConfig,
}

impl Default for TiledDetector {
  fn default() -> Self {
    Self {
      grid: TileGridConfig::default(),
      merge: MergeConfig::default(),
    }
  }
}

impl TiledDetector {
  /// 创建编排器，配置无效时立即拒绝
  pub fn new(grid: TileGridConfig, merge: MergeConfig) -> Result<Self, ConfigError> {
    grid.validate()?;
    merge.validate()?;
    Ok(Self { grid, merge })
  }

  pub fn grid_config(&self) -> &TileGridConfig {
    &self.grid
  }

  pub fn merge_config(&self) -> &MergeConfig {
    &self.merge
  }

  /// 将输入图像归一化为三通道 RGB
  ///
  /// 灰度与带透明通道的图像转为三通道；其余位深（16 位、浮点）不支持。
  pub fn normalize_image<E>(image: &DynamicImage) -> Result<RgbImage, TiledDetectionError<E>>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    if image.width() == 0 || image.height() == 0 {
      return Err(TiledDetectionError::InvalidImage(format!(
        "图像尺寸为零: {}x{}",
        image.width(),
        image.height()
      )));
    }

    match image {
      DynamicImage::ImageLuma8(_)
      | DynamicImage::ImageLumaA8(_)
      | DynamicImage::ImageRgb8(_)
      | DynamicImage::ImageRgba8(_) => Ok(image.to_rgb8()),
      other => Err(TiledDetectionError::InvalidImage(format!(
        "不支持的像素格式: {:?}",
        other.color()
      ))),
    }
  }

  /// 主入口：切片、逐瓦片推理并全局合并
  pub fn detect_with_tiling<D: Detector>(
    &self,
    image: &DynamicImage,
    detector: &D,
  ) -> Result<TiledDetection, TiledDetectionError<D::Error>> {
    let rgb = Self::normalize_image(image)?;
    let (width, height) = rgb.dimensions();

    let tiles = extract_tiles(&rgb, &self.grid)?;
    info!("从 {}x{} 图像生成 {} 个瓦片", width, height, tiles.len());

    let run_tile = |tile: &Tile| -> Result<Vec<GlobalDetection>, TiledDetectionError<D::Error>> {
      let raw = detector
        .detect(&tile.image, self.merge.confidence_threshold)
        .map_err(|source| TiledDetectionError::TileInference {
          tile: tile.bounds.id,
          source,
        })?;
      debug!("瓦片 {} 报告 {} 个候选", tile.bounds.id, raw.len());

      Ok(
        raw
          .iter()
          .map(|det| {
            det
              .to_global(tile.bounds.x_start, tile.bounds.y_start)
              .clamp_to(width, height)
          })
          .collect(),
      )
    };

    // 逐瓦片推理互不依赖，可以并行分发；collect 按瓦片行优先顺序
    // 归并结果，与完成顺序无关，保证 NMS 平局裁决的确定性。
    #[cfg(feature = "parallel")]
    let per_tile: Vec<Vec<GlobalDetection>> = tiles
      .par_iter()
      .map(run_tile)
      .collect::<Result<Vec<_>, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let per_tile: Vec<Vec<GlobalDetection>> = tiles
      .iter()
      .map(run_tile)
      .collect::<Result<Vec<_>, _>>()?;

    let all_detections: Vec<GlobalDetection> = per_tile.into_iter().flatten().collect();
    let raw_candidates = all_detections.len();
    info!("NMS 前候选总数: {}", raw_candidates);

    // 合并屏障：所有瓦片结果就绪后全局执行一次 NMS
    let outcome = merge_detections(all_detections, &self.merge);
    if outcome.dropped_invalid > 0 {
      warn!("丢弃 {} 个退化检测", outcome.dropped_invalid);
    }
    info!("NMS 后最终检测数: {}", outcome.detections.len());

    Ok(TiledDetection {
      detections: outcome.detections,
      image_width: width,
      image_height: height,
      tile_count: tiles.len(),
      raw_candidates,
      dropped_invalid: outcome.dropped_invalid,
    })
  }
}
