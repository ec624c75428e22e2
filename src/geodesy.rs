// 该文件是 Zhilu （指路） 项目的一部分。
// src/geodesy.rs - 经纬度点、方位角与大地距离
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

use std::fmt;

use geo::{GeodesicDistance, Point};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
  #[error("纬度超出范围 [-90, 90]: {0}")]
  LatitudeOutOfRange(f64),
  #[error("经度超出范围 [-180, 180]: {0}")]
  LongitudeOutOfRange(f64),
}

/// 十进制度表示的经纬度点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
  latitude: f64,
  longitude: f64,
}

impl GeoPoint {
  pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
    if !(-90.0..=90.0).contains(&latitude) {
      return Err(GeoError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
      return Err(GeoError::LongitudeOutOfRange(longitude));
    }
    Ok(Self {
      latitude,
      longitude,
    })
  }

  /// GeoJSON 坐标顺序为 `[经度, 纬度]`
  pub fn from_lon_lat(coordinates: [f64; 2]) -> Result<Self, GeoError> {
    Self::new(coordinates[1], coordinates[0])
  }

  pub fn latitude(&self) -> f64 {
    self.latitude
  }

  pub fn longitude(&self) -> f64 {
    self.longitude
  }

  fn to_point(self) -> Point<f64> {
    Point::new(self.longitude, self.latitude)
  }
}

impl fmt::Display for GeoPoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
  }
}

/// 从 `from` 指向 `to` 的初始大圆方位角，单位为度，范围 [0, 360)。
///
/// 正北为 0，顺时针增加。两点重合时返回 0。
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
  let lat1 = from.latitude.to_radians();
  let lat2 = to.latitude.to_radians();
  let delta_lon = (to.longitude - from.longitude).to_radians();

  let x = delta_lon.sin() * lat2.cos();
  let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
  let degrees = x.atan2(y).to_degrees();

  // atan2 的结果在 (-180, 180]，加 360 后取模即落在 [0, 360)
  (degrees + 360.0) % 360.0
}

/// WGS-84 椭球面上的大地线距离，单位为米
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
  a.to_point().geodesic_distance(&b.to_point())
}
