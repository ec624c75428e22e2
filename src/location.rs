// 该文件是 Zhilu （指路） 项目的一部分。
// src/location.rs - 定位来源
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

use crate::{FromUrl, FromUrlWithScheme, geodesy::GeoError, geodesy::GeoPoint};

/// 单次定位失败，调用方应在下一轮重试
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
  #[error("定位不可用: {0}")]
  Unavailable(String),
}

/// 构造定位来源时的错误，属于致命错误
#[derive(Error, Debug)]
pub enum LocationSourceError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("参数 {0} 无法解析: {1}")]
  InvalidParameter(&'static str, String),
  #[error("坐标无效: {0}")]
  InvalidPoint(#[from] GeoError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("轨迹文件解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[cfg(feature = "ip_location")]
  #[error("HTTP 客户端错误: {0}")]
  HttpError(#[from] reqwest::Error),
}

pub trait LocationProvider {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError>;
}

impl<L: LocationProvider + ?Sized> LocationProvider for &mut L {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    (**self).current_location()
  }
}

impl<L: LocationProvider + ?Sized> LocationProvider for Box<L> {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    (**self).current_location()
  }
}

mod fixed;
pub use self::fixed::FixedLocation;

mod replay;
pub use self::replay::ReplayLocation;

#[cfg(feature = "ip_location")]
mod ip;
#[cfg(feature = "ip_location")]
pub use self::ip::IpLocation;

pub enum LocationWrapper {
  Fixed(FixedLocation),
  Replay(ReplayLocation),
  #[cfg(feature = "ip_location")]
  Ip(IpLocation),
}

impl FromUrl for LocationWrapper {
  type Error = LocationSourceError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      FixedLocation::SCHEME => Ok(LocationWrapper::Fixed(FixedLocation::from_url(url)?)),
      ReplayLocation::SCHEME => Ok(LocationWrapper::Replay(ReplayLocation::from_url(url)?)),
      #[cfg(feature = "ip_location")]
      IpLocation::SCHEME => Ok(LocationWrapper::Ip(IpLocation::from_url(url)?)),
      _ => Err(LocationSourceError::SchemeMismatch),
    }
  }
}

impl LocationProvider for LocationWrapper {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    match self {
      LocationWrapper::Fixed(provider) => provider.current_location(),
      LocationWrapper::Replay(provider) => provider.current_location(),
      #[cfg(feature = "ip_location")]
      LocationWrapper::Ip(provider) => provider.current_location(),
    }
  }
}

fn query_f64(url: &url::Url, key: &'static str) -> Result<f64, LocationSourceError> {
  let value = url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
    .ok_or(LocationSourceError::MissingParameter(key))?;
  value
    .parse::<f64>()
    .map_err(|_| LocationSourceError::InvalidParameter(key, value))
}
