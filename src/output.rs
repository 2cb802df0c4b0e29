// 该文件是 Lantu （蓝图切片） 项目的一部分。
// src/output.rs - 输出定义
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
use thiserror::Error;
use url::Url;

use crate::FromUrl;
#[cfg(any(feature = "save_image_file", feature = "record_json"))]
use crate::FromUrlWithScheme;
use crate::pipeline::TiledDetection;

pub trait Render: Sized {
  type Error;
  fn render_result(&self, image: &RgbImage, result: &TiledDetection) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "record_json")]
mod record_json;
#[cfg(feature = "record_json")]
pub use self::record_json::{RecordJsonError, RecordJsonOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "record_json")]
  #[error("JSON 记录输出错误: {0}")]
  RecordJsonError(#[from] RecordJsonError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFile(SaveImageFileOutput),
  #[cfg(feature = "record_json")]
  RecordJson(RecordJsonOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFile(output))
      }
      #[cfg(feature = "record_json")]
      RecordJsonOutput::SCHEME => {
        let output = RecordJsonOutput::from_url(url)?;
        Ok(OutputWrapper::RecordJson(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, image: &RgbImage, result: &TiledDetection) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFile(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
      #[cfg(feature = "record_json")]
      OutputWrapper::RecordJson(output) => output
        .render_result(image, result)
        .map_err(OutputError::from),
    }
  }
}
