// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/tile.rs - 瓦片网格划分
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

use image::RgbImage;
use image::imageops;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认网格行数
pub const DEFAULT_GRID_ROWS: u32 = 2;
/// 默认网格列数
pub const DEFAULT_GRID_COLS: u32 = 4;
/// 默认瓦片重叠比例
pub const DEFAULT_OVERLAP_RATIO: f32 = 0.1;

#[derive(Error, Debug)]
pub enum TileConfigError {
  #[error("网格行列数必须为正数: rows={rows}, cols={cols}")]
  EmptyGrid { rows: u32, cols: u32 },
  #[error("重叠比例必须在 [0, 1) 区间内: {0}")]
  OverlapOutOfRange(f32),
  #[error("网格过密，瓦片尺寸为零: {width}x{height} 图像无法划分为 {rows}x{cols} 网格")]
  GridTooFine {
    width: u32,
    height: u32,
    rows: u32,
    cols: u32,
  },
}

/// 瓦片网格划分策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileGridConfig {
  /// 网格行数
  pub rows: u32,
  /// 网格列数
  pub cols: u32,
  /// 相邻瓦片的重叠比例 (0.0 - 1.0，不含 1.0)
  pub overlap_ratio: f32,
}

impl Default for TileGridConfig {
  fn default() -> Self {
    Self {
      rows: DEFAULT_GRID_ROWS,
      cols: DEFAULT_GRID_COLS,
      overlap_ratio: DEFAULT_OVERLAP_RATIO,
    }
  }
}

impl TileGridConfig {
  pub fn validate(&self) -> Result<(), TileConfigError> {
    if self.rows == 0 || self.cols == 0 {
      return Err(TileConfigError::EmptyGrid {
        rows: self.rows,
        cols: self.cols,
      });
    }
    if !(0.0..1.0).contains(&self.overlap_ratio) {
      return Err(TileConfigError::OverlapOutOfRange(self.overlap_ratio));
    }
    Ok(())
  }
}

/// 瓦片在网格中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileId {
  pub row: u32,
  pub col: u32,
}

impl std::fmt::Display for TileId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "tile_{}_{}", self.row, self.col)
  }
}

/// 瓦片在整图中的像素范围，半开区间 [x_start, x_end) × [y_start, y_end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBounds {
  pub id: TileId,
  pub x_start: u32,
  pub y_start: u32,
  pub x_end: u32,
  pub y_end: u32,
}

impl TileBounds {
  pub fn width(&self) -> u32 {
    self.x_end - self.x_start
  }

  pub fn height(&self) -> u32 {
    self.y_end - self.y_start
  }
}

/// 一个带像素数据的瓦片，像素为源图对应范围的独立拷贝
#[derive(Debug, Clone)]
pub struct Tile {
  pub bounds: TileBounds,
  pub image: RgbImage,
}

/// 计算整图的瓦片划分，按行优先顺序返回 rows*cols 个瓦片范围
///
/// 名义瓦片尺寸为整图尺寸对行列数的整除；每个瓦片向四周扩展
/// `floor(名义尺寸 * overlap_ratio)` 像素的重叠边缘，并裁剪到图像边界。
/// 末行末列的瓦片延伸到图像边缘，保证整除余数像素也被覆盖，
/// 即所有瓦片范围的并集恰好等于整图范围。
pub fn plan_tiles(
  width: u32,
  height: u32,
  config: &TileGridConfig,
) -> Result<Vec<TileBounds>, TileConfigError> {
  config.validate()?;

  let tile_width = width / config.cols;
  let tile_height = height / config.rows;
  if tile_width == 0 || tile_height == 0 {
    return Err(TileConfigError::GridTooFine {
      width,
      height,
      rows: config.rows,
      cols: config.cols,
    });
  }

  let overlap_x = (tile_width as f32 * config.overlap_ratio).floor() as u32;
  let overlap_y = (tile_height as f32 * config.overlap_ratio).floor() as u32;

  let mut bounds = Vec::with_capacity((config.rows * config.cols) as usize);
  for row in 0..config.rows {
    for col in 0..config.cols {
      let x_start = (col * tile_width).saturating_sub(overlap_x);
      let y_start = (row * tile_height).saturating_sub(overlap_y);
      let x_end = if col + 1 == config.cols {
        width
      } else {
        width.min((col + 1) * tile_width + overlap_x)
      };
      let y_end = if row + 1 == config.rows {
        height
      } else {
        height.min((row + 1) * tile_height + overlap_y)
      };

      bounds.push(TileBounds {
        id: TileId { row, col },
        x_start,
        y_start,
        x_end,
        y_end,
      });
    }
  }

  Ok(bounds)
}

/// 按划分结果从源图中裁剪出各瓦片的像素数据
///
/// 源图只读共享，每个瓦片持有自己的一份像素拷贝。
pub fn extract_tiles(
  image: &RgbImage,
  config: &TileGridConfig,
) -> Result<Vec<Tile>, TileConfigError> {
  let bounds = plan_tiles(image.width(), image.height(), config)?;

  let tiles = bounds
    .into_iter()
    .map(|b| {
      let cropped =
        imageops::crop_imm(image, b.x_start, b.y_start, b.width(), b.height()).to_image();
      Tile {
        bounds: b,
        image: cropped,
      }
    })
    .collect();

  Ok(tiles)
}
