// 该文件是 Zhilu （指路） 项目的一部分。
// src/gazetteer.rs - 目的地地名表
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

//! 从 GeoJSON FeatureCollection 构建的只读地名表。
//!
//! 每个要素需要 `properties.name` 和 `[经度, 纬度]` 形式的点坐标，
//! 名称去除首尾空白并转为小写后作为键。

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geodesy::GeoPoint;
use crate::matching::best_match;

#[derive(Error, Debug)]
pub enum GazetteerError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("GeoJSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("未知目的地: {0}")]
  UnknownDestination(String),
  #[error("无法识别目的地: {0}")]
  DestinationNotRecognized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
  pub name: String,
  pub location: GeoPoint,
}

#[derive(Deserialize)]
struct FeatureCollection {
  features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
  #[serde(default)]
  properties: Option<serde_json::Map<String, Value>>,
  #[serde(default)]
  geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
  #[serde(rename = "type", default)]
  kind: Option<String>,
  #[serde(default)]
  coordinates: Value,
}

impl Feature {
  fn name(&self) -> Option<String> {
    let name = self.properties.as_ref()?.get("name")?.as_str()?;
    let name = normalize_name(name);
    (!name.is_empty()).then_some(name)
  }

  fn location(&self) -> Option<GeoPoint> {
    let geometry = self.geometry.as_ref()?;
    if geometry.kind.as_deref().is_some_and(|kind| kind != "Point") {
      return None;
    }
    let coordinates = geometry.coordinates.as_array()?;
    let lon = coordinates.first()?.as_f64()?;
    let lat = coordinates.get(1)?.as_f64()?;
    GeoPoint::from_lon_lat([lon, lat]).ok()
  }
}

pub fn normalize_name(name: &str) -> String {
  name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
  entries: BTreeMap<String, GeoPoint>,
}

impl Gazetteer {
  pub fn from_entries<I, S>(entries: I) -> Self
  where
    I: IntoIterator<Item = (S, GeoPoint)>,
    S: AsRef<str>,
  {
    let entries = entries
      .into_iter()
      .map(|(name, location)| (normalize_name(name.as_ref()), location))
      .filter(|(name, _)| !name.is_empty())
      .collect();
    Self { entries }
  }

  pub fn from_geojson_str(text: &str) -> Result<Self, GazetteerError> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    Ok(Self::from_collection(collection))
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self, GazetteerError> {
    let collection: FeatureCollection = serde_json::from_reader(reader)?;
    Ok(Self::from_collection(collection))
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GazetteerError> {
    info!("加载地名表: {}", path.as_ref().display());
    let file = std::fs::File::open(path)?;
    Self::from_reader(std::io::BufReader::new(file))
  }

  fn from_collection(collection: FeatureCollection) -> Self {
    let mut entries = BTreeMap::new();
    for (index, feature) in collection.features.iter().enumerate() {
      let Some(name) = feature.name() else {
        debug!("第 {} 个要素没有名称，跳过", index);
        continue;
      };
      let Some(location) = feature.location() else {
        warn!("要素 '{}' 的坐标无效或不是点，跳过", name);
        continue;
      };
      if entries.insert(name.clone(), location).is_some() {
        warn!("重复的地名 '{}'，以后出现的为准", name);
      }
    }
    info!("地名表共 {} 个目的地", entries.len());
    Self { entries }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn get(&self, name: &str) -> Option<GeoPoint> {
    self.entries.get(&normalize_name(name)).copied()
  }

  /// 精确查找，名称会先规范化
  pub fn lookup(&self, name: &str) -> Result<Destination, GazetteerError> {
    let name = normalize_name(name);
    match self.entries.get(&name) {
      Some(location) => Ok(Destination {
        name,
        location: *location,
      }),
      None => Err(GazetteerError::UnknownDestination(name)),
    }
  }

  /// 将语音识别出的原始文本模糊匹配到最相近的地名
  pub fn resolve(&self, spoken: &str, cutoff: f64) -> Result<Destination, GazetteerError> {
    let query = normalize_name(spoken);
    match best_match(&query, self.names(), cutoff) {
      Some((name, score)) => {
        info!("'{}' 匹配到目的地 '{}'，相似度 {:.2}", query, name, score);
        self.lookup(name)
      }
      None => Err(GazetteerError::DestinationNotRecognized(query)),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::matching::DEFAULT_SIMILARITY_CUTOFF;

  const CAMPUS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
      { "type": "Feature", "properties": { "name": "  Library " },
        "geometry": { "type": "Point", "coordinates": [77.5946, 12.9716] } },
      { "type": "Feature", "properties": { "name": "Cafeteria" },
        "geometry": { "type": "Point", "coordinates": [77.5950, 12.9720, 910.0] } },
      { "type": "Feature", "properties": { "name": "" },
        "geometry": { "type": "Point", "coordinates": [77.0, 12.0] } },
      { "type": "Feature", "properties": { "amenity": "bench" },
        "geometry": { "type": "Point", "coordinates": [77.0, 12.0] } },
      { "type": "Feature", "properties": { "name": "Ring Road" },
        "geometry": { "type": "LineString", "coordinates": [[77.0, 12.0], [77.1, 12.1]] } },
      { "type": "Feature", "properties": { "name": "Nowhere" },
        "geometry": { "type": "Point", "coordinates": [12.0, 95.0] } }
    ]
  }"#;

  #[test]
  fn loads_named_points_only() {
    let gazetteer = Gazetteer::from_geojson_str(CAMPUS).unwrap();
    assert_eq!(gazetteer.len(), 2);
    assert_eq!(
      gazetteer.names().collect::<Vec<_>>(),
      vec!["cafeteria", "library"]
    );
    let library = gazetteer.get("library").unwrap();
    assert_eq!(library.latitude(), 12.9716);
    assert_eq!(library.longitude(), 77.5946);
  }

  #[test]
  fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CAMPUS.as_bytes()).unwrap();
    let gazetteer = Gazetteer::from_path(file.path()).unwrap();
    assert!(gazetteer.get("CAFETERIA").is_some());
  }

  #[test]
  fn rejects_malformed_json() {
    assert!(matches!(
      Gazetteer::from_geojson_str("{\"features\": 3}"),
      Err(GazetteerError::JsonError(_))
    ));
  }

  #[test]
  fn lookup_normalizes_and_reports_unknown() {
    let gazetteer = Gazetteer::from_geojson_str(CAMPUS).unwrap();
    assert_eq!(gazetteer.lookup(" Library").unwrap().name, "library");
    assert!(matches!(
      gazetteer.lookup("gym"),
      Err(GazetteerError::UnknownDestination(name)) if name == "gym"
    ));
  }

  #[test]
  fn resolves_typo_and_rejects_noise() {
    let gazetteer = Gazetteer::from_geojson_str(CAMPUS).unwrap();
    let destination = gazetteer
      .resolve("Libary", DEFAULT_SIMILARITY_CUTOFF)
      .unwrap();
    assert_eq!(destination.name, "library");

    assert!(matches!(
      gazetteer.resolve("zzzz", DEFAULT_SIMILARITY_CUTOFF),
      Err(GazetteerError::DestinationNotRecognized(_))
    ));
  }
}
