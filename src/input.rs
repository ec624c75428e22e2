// 该文件是 Zhilu （指路） 项目的一部分。
// src/input.rs - 相机输入
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

//! 相机输入都是 `Iterator<Item = RgbFrame>`：每轮导引取一次，
//! 返回 `None` 表示本轮没有帧，跳过障碍物检测，并不代表相机已关闭。

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "gstreamer_input")]
mod gstreamer_input;
#[cfg(feature = "gstreamer_input")]
pub use self::gstreamer_input::{GStreamerInput, GStreamerInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "gstreamer_input")]
  #[error("GStreamer 相机错误: {0}")]
  GStreamerInputError(#[from] GStreamerInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 不接相机时使用，永远没有帧
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

impl FromUrlWithScheme for NoCamera {
  const SCHEME: &'static str = "none";
}

impl FromUrl for NoCamera {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch);
    }
    Ok(NoCamera)
  }
}

impl Iterator for NoCamera {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    None
  }
}

pub enum InputWrapper {
  NoCamera(NoCamera),
  #[cfg(feature = "gstreamer_input")]
  GStreamerInput(GStreamerInput),
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() == NoCamera::SCHEME {
      return Ok(InputWrapper::NoCamera(NoCamera::from_url(url)?));
    }
    #[cfg(feature = "gstreamer_input")]
    {
      if url.scheme() == GStreamerInput::SCHEME {
        let input = GStreamerInput::from_url(url)?;
        return Ok(InputWrapper::GStreamerInput(input));
      }
    }
    #[cfg(feature = "read_image_file")]
    {
      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::NoCamera(input) => input.next(),
      #[cfg(feature = "gstreamer_input")]
      InputWrapper::GStreamerInput(input) => input.next(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn none_scheme_never_yields() {
    let mut input = InputWrapper::from_url(&url::Url::parse("none:").unwrap()).unwrap();
    assert!(input.next().is_none());
    assert!(input.next().is_none());
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    assert!(matches!(
      InputWrapper::from_url(&url::Url::parse("rtsp://camera.local/stream").unwrap()),
      Err(InputError::SchemeMismatch)
    ));
  }
}
