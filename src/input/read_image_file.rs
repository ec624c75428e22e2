// 该文件是 Zhilu （指路） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

//! `image:///path/to/frame.jpg` 或 `image:///path/to/frames/`。
//!
//! 目录按文件名顺序逐张读取；带 `?repeat` 时读完后从头循环。

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("{} 中没有图像文件", .0.display())]
  Empty(PathBuf),
}

pub struct ImageFileInput {
  paths: Vec<PathBuf>,
  position: usize,
  repeat: bool,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let repeat = url.query_pairs().any(|(k, _)| k == "repeat");
    Self::open(Path::new(url.path()), repeat)
  }
}

impl ImageFileInput {
  pub fn open(path: &Path, repeat: bool) -> Result<Self, ImageFileInputError> {
    let paths = if path.is_dir() {
      let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_image(p))
        .collect();
      paths.sort();
      paths
    } else {
      // 提前检查文件可读，相机打不开属于致命错误
      std::fs::metadata(path)?;
      vec![path.to_path_buf()]
    };

    if paths.is_empty() {
      return Err(ImageFileInputError::Empty(path.to_path_buf()));
    }
    debug!("图像输入共 {} 个文件", paths.len());

    Ok(ImageFileInput {
      paths,
      position: 0,
      repeat,
    })
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

impl Iterator for ImageFileInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.position >= self.paths.len() {
      if !self.repeat {
        return None;
      }
      self.position = 0;
    }
    let path = &self.paths[self.position];
    self.position += 1;

    match ImageReader::open(path).map_err(image::ImageError::from).and_then(|r| r.decode()) {
      Ok(image) => Some(RgbFrame::from(image.to_rgb8())),
      Err(e) => {
        warn!("读取图像 {} 失败: {}", path.display(), e);
        None
      }
    }
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let mut frame = RgbFrame::with_shape(height as usize, width as usize);
    frame.as_mut().copy_from_slice(image.as_raw());
    frame
  }
}
