// 该文件是 Zhilu （指路） 项目的一部分。
// src/frame.rs - 相机帧定义
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

use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
pub struct FrameSizeMismatch {
  pub expected: usize,
  pub actual: usize,
}

/// HWC 排列的 RGB 帧
#[derive(Debug, Clone)]
pub struct RgbFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let data = vec![0u8; RGB_CHANNELS * width * height].into_boxed_slice();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn from_raw(height: usize, width: usize, data: Vec<u8>) -> Result<Self, FrameSizeMismatch> {
    let expected = RGB_CHANNELS * width * height;
    if data.len() != expected {
      return Err(FrameSizeMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn as_hwc(&self) -> &[u8] {
    &self.data
  }
}

impl AsMut<[u8]> for RgbFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}
