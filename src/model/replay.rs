// 该文件是 Zhilu （指路） 项目的一部分。
// src/model/replay.rs - 回放检测结果的检测器
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

//! 按帧回放预先录制的检测结果，用于没有推理硬件时的演示与测试。
//!
//! 文件格式为 JSON 数组，每个元素是一帧的检测列表：
//!
//! ```json
//! [
//!   [{ "label": "person", "score": 0.91, "bbox": [120, 40, 243, 420] }],
//!   []
//! ]
//! ```
//!
//! 脚本播放完毕后返回空结果；URL 带 `?repeat` 时从头循环。

use std::sync::Mutex;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  model::{DetectItem, DetectResult, Model, WithLabel},
};

#[derive(Error, Debug)]
pub enum ReplayDetectorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测脚本解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("检测器状态锁已损坏")]
  Poisoned,
}

#[derive(Deserialize)]
struct ScriptedDetection {
  label: String,
  score: f32,
  bbox: [f32; 4],
}

pub struct ReplayDetector<T> {
  frames: Vec<Vec<DetectItem<T>>>,
  cursor: Mutex<usize>,
  repeat: bool,
}

impl<T> FromUrlWithScheme for ReplayDetector<T>
where
  T: WithLabel + Clone,
{
  const SCHEME: &'static str = "replay";
}

impl<T> FromUrl for ReplayDetector<T>
where
  T: WithLabel + Clone,
{
  type Error = ReplayDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayDetectorError::SchemeMismatch);
    }
    info!("加载检测脚本: {}", url.path());
    let text = std::fs::read_to_string(url.path())?;
    let repeat = url.query_pairs().any(|(k, _)| k == "repeat");
    Ok(Self::from_json_str(&text)?.with_repeat(repeat))
  }
}

impl<T> ReplayDetector<T>
where
  T: WithLabel + Clone,
{
  pub fn from_json_str(text: &str) -> Result<Self, ReplayDetectorError> {
    let script: Vec<Vec<ScriptedDetection>> = serde_json::from_str(text)?;
    let frames = script
      .into_iter()
      .map(|detections| {
        detections
          .into_iter()
          .filter_map(|d| match T::from_label_str(&d.label) {
            Some(kind) => Some(DetectItem {
              kind,
              score: d.score,
              bbox: d.bbox,
            }),
            None => {
              warn!("未知类别 '{}'，忽略", d.label);
              None
            }
          })
          .collect()
      })
      .collect();
    Ok(Self::from_frames(frames))
  }

  pub fn from_frames(frames: Vec<Vec<DetectItem<T>>>) -> Self {
    Self {
      frames,
      cursor: Mutex::new(0),
      repeat: false,
    }
  }

  pub fn with_repeat(mut self, repeat: bool) -> Self {
    self.repeat = repeat;
    self
  }

  pub fn frame_count(&self) -> usize {
    self.frames.len()
  }

  fn next_index(&self) -> Result<Option<usize>, ReplayDetectorError> {
    let mut cursor = self
      .cursor
      .lock()
      .map_err(|_| ReplayDetectorError::Poisoned)?;
    if *cursor >= self.frames.len() {
      if !self.repeat || self.frames.is_empty() {
        return Ok(None);
      }
      *cursor = 0;
    }
    let index = *cursor;
    *cursor += 1;
    Ok(Some(index))
  }
}

impl<T> Model for ReplayDetector<T>
where
  T: WithLabel + Clone,
{
  type Input = RgbFrame;
  type Output = DetectResult<T>;
  type Error = ReplayDetectorError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let Some(index) = self.next_index()? else {
      debug!("检测脚本已播放完毕");
      return Ok(DetectResult::default());
    };
    debug!(
      "回放第 {} 帧检测结果，输入 {}x{}",
      index,
      input.width(),
      input.height()
    );
    Ok(DetectResult::from(self.frames[index].clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;

  const SCRIPT: &str = r#"[
    [{ "label": "person", "score": 0.91, "bbox": [120, 40, 243, 420] },
     { "label": "unicorn", "score": 0.99, "bbox": [0, 0, 10, 10] }],
    []
  ]"#;

  #[test]
  fn replays_frames_in_order() {
    let detector: ReplayDetector<CocoLabel> = ReplayDetector::from_json_str(SCRIPT).unwrap();
    let frame = RgbFrame::with_shape(2, 2);
    assert_eq!(detector.frame_count(), 2);

    let first = detector.infer(&frame).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first.items[0].kind.to_label_str(), "person");
    assert_eq!(first.items[0].pixel_width(), 123.0);

    assert!(detector.infer(&frame).unwrap().is_empty());
    assert!(detector.infer(&frame).unwrap().is_empty());
  }

  #[test]
  fn repeat_cycles_script() {
    let detector: ReplayDetector<CocoLabel> = ReplayDetector::from_json_str(SCRIPT)
      .unwrap()
      .with_repeat(true);
    let frame = RgbFrame::with_shape(2, 2);
    detector.infer(&frame).unwrap();
    detector.infer(&frame).unwrap();
    assert_eq!(detector.infer(&frame).unwrap().len(), 1);
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("file:///tmp/detections.json").unwrap();
    assert!(matches!(
      ReplayDetector::<CocoLabel>::from_url(&url),
      Err(ReplayDetectorError::SchemeMismatch)
    ));
  }
}
