// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/input.rs - 图纸文件输入
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

use image::{DynamicImage, ImageReader};
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for InputError {
  fn from(err: std::io::Error) -> Self {
    InputError::IoError(err)
  }
}

impl From<image::ImageError> for InputError {
  fn from(err: image::ImageError) -> Self {
    InputError::ImageLoadError(err)
  }
}

/// 从本地文件加载整张图纸
///
/// 像素格式在进入流水线前由编排器统一归一化，这里保留原始解码结果。
pub struct ImageFileInput {
  image: DynamicImage,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let image = ImageReader::open(url.path())?.decode()?;
    Ok(ImageFileInput { image })
  }
}

impl ImageFileInput {
  pub fn into_image(self) -> DynamicImage {
    self.image
  }

  pub fn image(&self) -> &DynamicImage {
    &self.image
  }
}
