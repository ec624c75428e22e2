// 该文件是 Zhilu （指路） 项目的一部分。
// src/location/replay.rs - 回放定位轨迹
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

//! `replay:///path/to/track.json`
//!
//! 轨迹为 JSON 数组，元素为 `[纬度, 经度]` 或 `null`（该次定位不可用）。
//! 播放完毕后定位不可用；带 `?hold` 时一直停留在最后一个有效位置。

use std::collections::VecDeque;

use tracing::info;
use url::Url;

use super::{LocationError, LocationProvider, LocationSourceError};
use crate::{FromUrl, FromUrlWithScheme, geodesy::GeoPoint};

#[derive(Debug, Clone)]
pub struct ReplayLocation {
  fixes: VecDeque<Option<GeoPoint>>,
  last: Option<GeoPoint>,
  hold: bool,
}

impl ReplayLocation {
  pub fn new<I>(fixes: I) -> Self
  where
    I: IntoIterator<Item = Option<GeoPoint>>,
  {
    Self {
      fixes: fixes.into_iter().collect(),
      last: None,
      hold: false,
    }
  }

  pub fn with_hold(mut self, hold: bool) -> Self {
    self.hold = hold;
    self
  }

  pub fn from_json_str(text: &str) -> Result<Self, LocationSourceError> {
    let track: Vec<Option<[f64; 2]>> = serde_json::from_str(text)?;
    let fixes = track
      .into_iter()
      .map(|fix| fix.map(|[lat, lon]| GeoPoint::new(lat, lon)).transpose())
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self::new(fixes))
  }

  pub fn remaining(&self) -> usize {
    self.fixes.len()
  }
}

impl FromUrlWithScheme for ReplayLocation {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayLocation {
  type Error = LocationSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LocationSourceError::SchemeMismatch);
    }
    info!("加载定位轨迹: {}", url.path());
    let text = std::fs::read_to_string(url.path())?;
    let hold = url.query_pairs().any(|(k, _)| k == "hold");
    Ok(Self::from_json_str(&text)?.with_hold(hold))
  }
}

impl LocationProvider for ReplayLocation {
  fn current_location(&mut self) -> Result<GeoPoint, LocationError> {
    match self.fixes.pop_front() {
      Some(Some(point)) => {
        self.last = Some(point);
        Ok(point)
      }
      Some(None) => Err(LocationError::Unavailable("轨迹中该次定位缺失".to_string())),
      None => match (self.hold, self.last) {
        (true, Some(point)) => Ok(point),
        _ => Err(LocationError::Unavailable("轨迹已播放完毕".to_string())),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn replays_fixes_and_gaps() {
    let mut track = ReplayLocation::from_json_str("[[0.0, 0.0], null, [0.0, 0.0001]]").unwrap();
    assert_eq!(track.remaining(), 3);
    assert_eq!(
      track.current_location(),
      Ok(GeoPoint::new(0.0, 0.0).unwrap())
    );
    assert!(matches!(
      track.current_location(),
      Err(LocationError::Unavailable(_))
    ));
    assert_eq!(
      track.current_location(),
      Ok(GeoPoint::new(0.0, 0.0001).unwrap())
    );
    assert!(track.current_location().is_err());
  }

  #[test]
  fn hold_repeats_last_fix() {
    let mut track = ReplayLocation::from_json_str("[[1.0, 2.0], null]")
      .unwrap()
      .with_hold(true);
    track.current_location().unwrap();
    assert!(track.current_location().is_err());
    assert_eq!(
      track.current_location(),
      Ok(GeoPoint::new(1.0, 2.0).unwrap())
    );
  }

  #[test]
  fn invalid_points_are_rejected() {
    assert!(matches!(
      ReplayLocation::from_json_str("[[100.0, 0.0]]"),
      Err(LocationSourceError::InvalidPoint(_))
    ));
  }
}
