// 该文件是 Zhilu （指路） 项目的一部分。
// src/proximity.rs - 单目距离估计
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

//! 针孔相机模型下的距离估计：`距离 = 焦距常数 × 实际宽度 / 像素宽度`。
//!
//! 只用于判断障碍物的远近顺序，精度不是重点。

use std::collections::HashMap;
use std::fmt;

/// 焦距等效标定常数（像素）
pub const DEFAULT_FOCAL_LENGTH: f32 = 615.0;
/// 未登记类别的默认实际宽度（厘米）
pub const DEFAULT_OBJECT_WIDTH_CM: f32 = 30.0;

const KNOWN_WIDTHS_CM: [(&str, f32); 5] = [
  ("person", 40.0),
  ("chair", 50.0),
  ("car", 180.0),
  ("bottle", 7.0),
  ("cup", 8.0),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
  /// 估计距离，单位厘米
  Centimeters(f32),
  /// 像素宽度无效，无法估计
  Unknown,
}

impl Proximity {
  pub fn centimeters(&self) -> Option<f32> {
    match self {
      Proximity::Centimeters(cm) => Some(*cm),
      Proximity::Unknown => None,
    }
  }
}

impl fmt::Display for Proximity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Proximity::Centimeters(cm) => write!(f, "{} cm", cm.round() as i64),
      Proximity::Unknown => f.write_str("unknown"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ProximityEstimator {
  focal_length: f32,
  default_width_cm: f32,
  known_widths_cm: HashMap<String, f32>,
}

impl Default for ProximityEstimator {
  fn default() -> Self {
    Self {
      focal_length: DEFAULT_FOCAL_LENGTH,
      default_width_cm: DEFAULT_OBJECT_WIDTH_CM,
      known_widths_cm: KNOWN_WIDTHS_CM
        .iter()
        .map(|(label, width)| (label.to_string(), *width))
        .collect(),
    }
  }
}

impl ProximityEstimator {
  pub fn with_focal_length(mut self, focal_length: f32) -> Self {
    self.focal_length = focal_length;
    self
  }

  pub fn with_default_width(mut self, width_cm: f32) -> Self {
    self.default_width_cm = width_cm;
    self
  }

  pub fn with_known_width(mut self, label: &str, width_cm: f32) -> Self {
    self.known_widths_cm.insert(label.to_string(), width_cm);
    self
  }

  pub fn focal_length(&self) -> f32 {
    self.focal_length
  }

  pub fn real_width(&self, label: &str) -> f32 {
    self
      .known_widths_cm
      .get(label)
      .copied()
      .unwrap_or(self.default_width_cm)
  }

  pub fn estimate(&self, label: &str, pixel_width: f32) -> Proximity {
    estimate_distance(self.focal_length, self.real_width(label), pixel_width)
  }
}

pub fn estimate_distance(focal_length: f32, real_width_cm: f32, pixel_width: f32) -> Proximity {
  if !pixel_width.is_finite() || pixel_width <= 0.0 {
    return Proximity::Unknown;
  }
  Proximity::Centimeters(focal_length * real_width_cm / pixel_width)
}
