// 该文件是 Zhilu （指路） 项目的一部分。
// src/location/fixed.rs - 固定位置
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

use url::Url;

use super::{LocationError, LocationProvider, LocationSourceError, query_f64};
use crate::{FromUrl, FromUrlWithScheme, geodesy::GeoPoint};

/// `fixed:?lat=12.9716&lon=77.5946`，每次都返回同一位置
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
  point: GeoPoint,
}

impl FixedLocation {
  pub fn new(point: GeoPoint) -> Self {
    Self { point }
  }
}

impl FromUrlWithScheme for FixedLocation {
  const SCHEME: &'static str = "fixed";
}

impl FromUrl for FixedLocation {
  type Error = LocationSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LocationSourceError::SchemeMismatch);
    }
    let lat = query_f64(url, "lat")?;
    let lon = query_f64(url, "lon")?;
    Ok(Self::new(GeoPoint::new(lat, lon)?))
  }
}

impl LocationProvider for FixedLocation {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    Ok(self.point)
  }
}
