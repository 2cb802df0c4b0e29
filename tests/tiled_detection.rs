// 该文件是 Lantu （蓝图切片） 项目的一部分。
// tests/tiled_detection.rs - 分片推理端到端测试
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

use image::{DynamicImage, Rgb, RgbImage};

use lantu::detector::ContourDetector;
use lantu::merge::MergeConfig;
use lantu::pipeline::TiledDetector;
use lantu::tile::TileGridConfig;

/// 白底图纸上画若干黑色实心矩形
fn blueprint(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> DynamicImage {
  let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
  for &(x0, y0, x1, y1) in rects {
    for y in y0..y1 {
      for x in x0..x1 {
        image.put_pixel(x, y, Rgb([0, 0, 0]));
      }
    }
  }
  DynamicImage::ImageRgb8(image)
}

fn pipeline(rows: u32, cols: u32) -> TiledDetector {
  TiledDetector::new(
    TileGridConfig {
      rows,
      cols,
      overlap_ratio: 0.1,
    },
    MergeConfig::default(),
  )
  .unwrap()
}

#[test]
fn object_in_overlap_zone_is_reported_once() {
  // 800x400 图像按 1x2 划分: 瓦片 0 覆盖 x∈[0,440), 瓦片 1 覆盖 x∈[360,800)。
  // 矩形 x∈[380,430) 完整落在两个瓦片的重叠区内，两侧各检出一次，
  // 合并后必须只剩一个检测。
  let image = blueprint(800, 400, &[(380, 100, 430, 140)]);
  let detector = ContourDetector::new(128, 64);

  let result = pipeline(1, 2).detect_with_tiling(&image, &detector).unwrap();

  assert_eq!(result.tile_count, 2);
  assert_eq!(result.raw_candidates, 2);
  assert_eq!(result.detections.len(), 1);
  assert_eq!(result.detections[0].bbox, [380.0, 100.0, 430.0, 140.0]);
  assert_eq!(result.dropped_invalid, 0);
}

#[test]
fn objects_in_tile_interiors_are_all_reported() {
  let image = blueprint(
    800,
    400,
    &[(50, 50, 120, 120), (600, 200, 700, 300)],
  );
  let detector = ContourDetector::new(128, 64);

  let result = pipeline(1, 2).detect_with_tiling(&image, &detector).unwrap();

  assert_eq!(result.detections.len(), 2);
  let mut boxes: Vec<[f32; 4]> = result.detections.iter().map(|d| d.bbox).collect();
  boxes.sort_by(|a, b| a[0].total_cmp(&b[0]));
  assert_eq!(boxes[0], [50.0, 50.0, 120.0, 120.0]);
  assert_eq!(boxes[1], [600.0, 200.0, 700.0, 300.0]);
}

#[test]
fn blank_drawing_yields_empty_result() {
  let image = blueprint(800, 400, &[]);
  let detector = ContourDetector::default();

  let result = pipeline(2, 4).detect_with_tiling(&image, &detector).unwrap();

  assert_eq!(result.tile_count, 8);
  assert_eq!(result.raw_candidates, 0);
  assert!(result.detections.is_empty());
}

#[test]
fn default_grid_merges_duplicates_on_larger_drawing() {
  // 2x4 默认网格, 物体放在第 0/1 列瓦片的重叠区附近
  let image = blueprint(1600, 800, &[(380, 100, 430, 140)]);
  let detector = ContourDetector::new(128, 64);

  let result = pipeline(2, 4).detect_with_tiling(&image, &detector).unwrap();

  assert_eq!(result.tile_count, 8);
  assert_eq!(result.detections.len(), 1);
  assert_eq!(result.detections[0].bbox, [380.0, 100.0, 430.0, 140.0]);
}
