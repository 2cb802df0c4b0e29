// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use lantu::merge::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use lantu::tile::{DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, DEFAULT_OVERLAP_RATIO};

/// Lantu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图纸
  /// 支持格式: image:///path/to/drawing.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出目标，可指定多个
  /// 支持格式:
  /// - 标注图像: image:///path/to/annotated.png?font=/path/to/font.ttf
  /// - JSON 记录: json:///path/to/detections.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,

  /// 检测器配置
  /// 支持格式: contour://detector?ink=128&min_area=64
  #[arg(long, default_value = "contour://detector", value_name = "DETECTOR")]
  pub detector: Url,

  /// 瓦片网格行数
  #[arg(long, default_value_t = DEFAULT_GRID_ROWS, value_name = "ROWS")]
  pub rows: u32,

  /// 瓦片网格列数
  #[arg(long, default_value_t = DEFAULT_GRID_COLS, value_name = "COLS")]
  pub cols: u32,

  /// 相邻瓦片重叠比例 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_OVERLAP_RATIO, value_name = "RATIO")]
  pub overlap: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
}
