// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use image::RgbImage;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::output::Render;
use crate::output::draw::{Draw, DrawError};
use crate::pipeline::TiledDetection;
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将合并后的检测结果画在整图副本上并保存为图像文件
///
/// URL 查询参数 `font` 可指定标签字体文件路径，缺省时只画边框。
pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let draw = match url.query_pairs().find(|(k, _)| k == "font") {
      Some((_, font_path)) => Draw::with_font_file(Path::new(font_path.as_ref()))?,
      None => Draw::default(),
    };

    Ok(SaveImageFileOutput {
      path: url.path().to_string(),
      draw,
    })
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, image: &RgbImage, result: &TiledDetection) -> Result<(), Self::Error> {
    let mut annotated = image.clone();
    self.draw.draw_detections_on_image(&mut annotated, result);

    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    annotated.save(&self.path)?;
    warn!("保存标注图像到文件: {}", self.path);

    Ok(())
  }
}
