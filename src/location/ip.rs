// 该文件是 Zhilu （指路） 项目的一部分。
// src/location/ip.rs - 基于 IP 的粗略定位
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

//! `ip:` 或 `ip://ipinfo.io/json`
//!
//! 请求返回 `{"loc": "纬度,经度"}` 形式的 JSON，精度通常只有城市级别。

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::{LocationError, LocationProvider, LocationSourceError};
use crate::{FromUrl, FromUrlWithScheme, geodesy::GeoPoint};

const DEFAULT_ENDPOINT: &str = "https://ipinfo.io/json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct IpLocation {
  client: reqwest::blocking::Client,
  endpoint: String,
}

impl FromUrlWithScheme for IpLocation {
  const SCHEME: &'static str = "ip";
}

impl FromUrl for IpLocation {
  type Error = LocationSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LocationSourceError::SchemeMismatch);
    }
    let endpoint = match url.host_str() {
      Some(host) => format!("https://{}{}", host, url.path()),
      None => DEFAULT_ENDPOINT.to_string(),
    };
    let client = reqwest::blocking::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;
    Ok(Self { client, endpoint })
  }
}

pub(crate) fn parse_loc(body: &str) -> Option<GeoPoint> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  let (lat, lon) = value.get("loc")?.as_str()?.split_once(',')?;
  GeoPoint::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?).ok()
}

impl LocationProvider for IpLocation {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    let body = self
      .client
      .get(&self.endpoint)
      .send()
      .and_then(|response| response.error_for_status())
      .and_then(|response| response.text())
      .map_err(|e| {
        warn!("IP 定位请求失败: {}", e);
        LocationError::Unavailable(e.to_string())
      })?;
    debug!("IP 定位响应: {}", body);
    parse_loc(&body).ok_or_else(|| LocationError::Unavailable("响应中没有有效坐标".to_string()))
  }
}
