// 该文件是 Zhilu （指路） 项目的一部分。
// src/model.rs - 目标检测器接口
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [f32; 4], // 像素坐标 [x_min, y_min, x_max, y_max]
}

impl<T> DetectItem<T> {
  pub fn pixel_width(&self) -> f32 {
    self.bbox[2] - self.bbox[0]
  }
}

#[derive(Debug, Clone)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> Default for DetectResult<T> {
  fn default() -> Self {
    Self {
      items: Box::new([]),
    }
  }
}

impl<T> From<Vec<DetectItem<T>>> for DetectResult<T> {
  fn from(items: Vec<DetectItem<T>>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl<T> DetectResult<T> {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem<T>> {
    self.items.iter()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_id(id: u32) -> Self;
  fn from_label_str(label: &str) -> Option<Self>;
}

mod coco;
pub use self::coco::{COCO_CLASSES, CocoLabel};

mod replay;
pub use self::replay::{ReplayDetector, ReplayDetectorError};

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("回放检测器错误: {0}")]
  ReplayDetectorError(#[from] ReplayDetectorError),
  #[cfg(feature = "model_yolo26")]
  #[error("YOLO26 检测器错误: {0}")]
  Yolo26Error(#[from] Yolo26Error),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 按 URL 方案选择的障碍物检测器
pub enum DetectorWrapper<T> {
  Replay(ReplayDetector<T>),
  #[cfg(feature = "model_yolo26")]
  Yolo26(Yolo26<T>),
}

impl<T> DetectorWrapper<T>
where
  T: WithLabel + Clone,
{
  /// 不做检测，每帧都返回空结果
  pub fn disabled() -> Self {
    DetectorWrapper::Replay(ReplayDetector::from_frames(Vec::new()))
  }
}

impl<T> FromUrl for DetectorWrapper<T>
where
  T: WithLabel + Clone,
{
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == ReplayDetector::<T>::SCHEME {
      return Ok(DetectorWrapper::Replay(ReplayDetector::from_url(url)?));
    }
    #[cfg(feature = "model_yolo26")]
    {
      if url.scheme() == Yolo26Builder::SCHEME {
        let model = Yolo26Builder::from_url(url)?.build()?;
        return Ok(DetectorWrapper::Yolo26(model));
      }
    }
    Err(DetectorError::SchemeMismatch)
  }
}

impl<T> Model for DetectorWrapper<T>
where
  T: WithLabel + Clone,
{
  type Input = RgbFrame;
  type Output = DetectResult<T>;
  type Error = DetectorError;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      DetectorWrapper::Replay(model) => Ok(model.infer(frame)?),
      #[cfg(feature = "model_yolo26")]
      DetectorWrapper::Yolo26(model) => Ok(model.infer(frame)?),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pixel_width_from_bbox() {
    let item = DetectItem {
      kind: CocoLabel::from_label_id(0),
      score: 0.9,
      bbox: [100.0, 20.0, 223.0, 400.0],
    };
    assert_eq!(item.pixel_width(), 123.0);
  }

  #[test]
  fn empty_result() {
    let result: DetectResult<CocoLabel> = DetectResult::default();
    assert!(result.is_empty());
    assert_eq!(result.len(), 0);
  }

  #[test]
  fn detector_is_selected_by_scheme() {
    let disabled: DetectorWrapper<CocoLabel> = DetectorWrapper::disabled();
    assert!(disabled.infer(&RgbFrame::with_shape(2, 2)).unwrap().is_empty());

    let unknown = Url::parse("onnx:///models/yolo.onnx").unwrap();
    assert!(matches!(
      DetectorWrapper::<CocoLabel>::from_url(&unknown),
      Err(DetectorError::SchemeMismatch)
    ));

    let missing = Url::parse("replay:///no/such/detections.json").unwrap();
    assert!(matches!(
      DetectorWrapper::<CocoLabel>::from_url(&missing),
      Err(DetectorError::ReplayDetectorError(_))
    ));
  }

  #[cfg(not(feature = "model_yolo26"))]
  #[test]
  fn yolo26_requires_feature() {
    let url = Url::parse("yolo26:///models/yolo26.rknn").unwrap();
    assert!(matches!(
      DetectorWrapper::<CocoLabel>::from_url(&url),
      Err(DetectorError::SchemeMismatch)
    ));
  }
}
