// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use lantu::FromUrl;
use lantu::detector::ContourDetector;
use lantu::input::ImageFileInput;
use lantu::merge::MergeConfig;
use lantu::output::{OutputWrapper, Render};
use lantu::pipeline::TiledDetector;
use lantu::tile::TileGridConfig;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入图纸: {}", args.input);
  info!("检测器: {}", args.detector);
  info!(
    "网格: {}x{}, 重叠比例: {}, IoU 阈值: {}, 置信度阈值: {}",
    args.rows, args.cols, args.overlap, args.iou_threshold, args.confidence
  );

  let grid = TileGridConfig {
    rows: args.rows,
    cols: args.cols,
    overlap_ratio: args.overlap,
  };
  let merge = MergeConfig {
    iou_threshold: args.iou_threshold,
    confidence_threshold: args.confidence,
  };
  let pipeline = TiledDetector::new(grid, merge)?;

  let detector = ContourDetector::from_url(&args.detector)?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  info!("加载图纸...");
  let image = ImageFileInput::from_url(&args.input)?.into_image();

  info!("开始分片推理...");
  let now = std::time::Instant::now();
  let result = pipeline.detect_with_tiling(&image, &detector)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  for det in &result.detections {
    info!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}, {:.0})",
      det.class_name,
      det.confidence * 100.0,
      det.bbox[0],
      det.bbox[1],
      det.bbox[2],
      det.bbox[3]
    );
  }

  if !outputs.is_empty() {
    let normalized = TiledDetector::normalize_image::<std::convert::Infallible>(&image)
      .map_err(|e| anyhow::anyhow!("{}", e))?;
    for output in &outputs {
      output.render_result(&normalized, &result)?;
    }
  }

  info!(
    "处理完成: {} 个瓦片, {} 个候选, {} 个最终检测, {} 个退化丢弃",
    result.tile_count,
    result.raw_candidates,
    result.detections.len(),
    result.dropped_invalid
  );

  Ok(())
}
