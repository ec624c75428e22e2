// 该文件是 Zhilu （指路） 项目的一部分。
// src/model/yolo26.rs - RKNPU 上的 YOLO26 障碍物检测
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

//! `yolo26:///path/to/yolo26.rknn?threshold=0.25`
//!
//! 相机帧先缩放到 640x640 送入模型，检测框再按原帧尺寸换算回像素坐标，
//! 这样距离估计用到的像素宽度与相机分辨率一致。

use std::borrow::Cow;
use std::marker::PhantomData;
use std::path::PathBuf;

use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  model::{DetectItem, DetectResult, Model, WithLabel},
};

const YOLO26_NUM_INPUTS: u32 = 1;
const YOLO26_NUM_OUTPUTS: u32 = 6;
const YOLO26_CLASS_NUM: usize = 80;
const YOLO26_INPUT_SIZE: u32 = 640;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
/// 低于导引循环的置信度阈值，最终取舍由导引循环决定
const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("参数 {0} 无法解析: {1}")]
  InvalidParameter(&'static str, String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("输入帧为空")]
  EmptyFrame,
}

impl From<std::io::Error> for Yolo26Error {
  fn from(err: std::io::Error) -> Self {
    Yolo26Error::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for Yolo26Error {
  fn from(err: rknpu::Error) -> Self {
    Yolo26Error::RknnError(err)
  }
}

impl Yolo26Error {
  fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolo26Error::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolo26Builder {
  model_path: PathBuf,
  flags: InitFlags,
  threshold: f32,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = "yolo26";
}

impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::SchemeMismatch);
    }

    let threshold = match url.query_pairs().find(|(k, _)| k == "threshold") {
      Some((_, v)) => v
        .parse::<f32>()
        .map_err(|_| Yolo26Error::InvalidParameter("threshold", v.into_owned()))?,
      None => DEFAULT_SCORE_THRESHOLD,
    };

    Ok(Yolo26Builder {
      model_path: PathBuf::from(url.path()),
      flags: InitFlags::default(),
      threshold,
    })
  }
}

impl Yolo26Builder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn build<T>(self) -> Result<Yolo26<T>, Yolo26Error> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let context = Context::new(&model_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输出数量", e))?;
    if num_inputs != YOLO26_NUM_INPUTS || num_outputs != YOLO26_NUM_OUTPUTS {
      let message = format!(
        "预期 {} 个输入 {} 个输出, 实际为 {} 个输入 {} 个输出",
        YOLO26_NUM_INPUTS, YOLO26_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", message);
      return Err(Yolo26Error::invalid(&message, rknpu::Error::InvalidModel));
    }
    info!("模型加载完成，检测阈值 {}", self.threshold);

    Ok(Yolo26 {
      context,
      threshold: self.threshold,
      _label: PhantomData,
    })
  }
}

pub struct Yolo26<T> {
  context: Context,
  threshold: f32,
  _label: PhantomData<T>,
}

/// 把相机帧变成模型需要的 640x640 HWC 字节
fn model_input(frame: &RgbFrame) -> Result<Cow<'_, [u8]>, Yolo26Error> {
  let size = YOLO26_INPUT_SIZE as usize;
  if frame.width() == 0 || frame.height() == 0 {
    return Err(Yolo26Error::EmptyFrame);
  }
  if frame.width() == size && frame.height() == size {
    return Ok(Cow::Borrowed(frame.as_hwc()));
  }
  let image = RgbImage::from_raw(
    frame.width() as u32,
    frame.height() as u32,
    frame.as_hwc().to_vec(),
  )
  .ok_or(Yolo26Error::EmptyFrame)?;
  let resized = imageops::resize(
    &image,
    YOLO26_INPUT_SIZE,
    YOLO26_INPUT_SIZE,
    FilterType::Triangle,
  );
  Ok(Cow::Owned(resized.into_raw()))
}

/// 按张量大小区分回归与分类输出，两者顺序在不同转换工具下可能互换
fn split_reg_cls<'a>(
  first: &'a [f32],
  second: &'a [f32],
  spatial: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  let reg_expected = 4 * spatial;
  let cls_expected = YOLO26_CLASS_NUM * spatial;
  if first.len() == reg_expected && second.len() == cls_expected {
    Some((first, second))
  } else if first.len() == cls_expected && second.len() == reg_expected {
    Some((second, first))
  } else {
    error!(
      "输出大小不匹配: {} / {}, 期望回归 {} 分类 {}",
      first.len(),
      second.len(),
      reg_expected,
      cls_expected
    );
    None
  }
}

/// 解码三个检测头，`scale` 为原帧与模型输入的宽高比例
fn decode_heads<T: WithLabel>(
  outputs: &[Option<&[f32]>],
  threshold: f32,
  scale: (f32, f32),
) -> Vec<DetectItem<T>> {
  let input = YOLO26_INPUT_SIZE as f32;
  let (scale_x, scale_y) = scale;
  let mut items = Vec::new();

  for (head, (&(map_h, map_w), stride)) in YOLO26_HEAD_SIZES
    .iter()
    .zip(YOLO26_STRIDES)
    .enumerate()
  {
    let (Some(Some(first)), Some(Some(second))) = (outputs.get(head * 2), outputs.get(head * 2 + 1))
    else {
      debug!("检测头 {} 缺少输出，跳过", head);
      continue;
    };
    let spatial = map_h * map_w;
    let Some((reg, cls)) = split_reg_cls(first, second, spatial) else {
      continue;
    };

    for h in 0..map_h {
      for w in 0..map_w {
        let idx = h * map_w + w;

        let (max_logit, class_id) = (0..YOLO26_CLASS_NUM)
          .map(|c| (cls[c * spatial + idx], c))
          .fold((f32::MIN, 0), |best, next| if next.0 > best.0 { next } else { best });
        let score = sigmoid(max_logit);
        if score <= threshold {
          continue;
        }

        let grid_x = w as f32 + 0.5;
        let grid_y = h as f32 + 0.5;
        let x_min = ((grid_x - reg[idx]) * stride).clamp(0.0, input);
        let y_min = ((grid_y - reg[spatial + idx]) * stride).clamp(0.0, input);
        let x_max = ((grid_x + reg[2 * spatial + idx]) * stride).clamp(0.0, input);
        let y_max = ((grid_y + reg[3 * spatial + idx]) * stride).clamp(0.0, input);

        items.push(DetectItem {
          kind: T::from_label_id(class_id as u32),
          score,
          bbox: [
            x_min * scale_x,
            y_min * scale_y,
            x_max * scale_x,
            y_max * scale_y,
          ],
        });
      }
    }
  }

  items
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

impl<T: WithLabel> Model for Yolo26<T> {
  type Input = RgbFrame;
  type Output = DetectResult<T>;
  type Error = Yolo26Error;

  fn infer(&self, frame: &Self::Input) -> Result<Self::Output, Self::Error> {
    let input = model_input(frame)?;
    self
      .context
      .set_input(0, &input[..], TensorFormat::NHWC, TensorType::UInt8)?;
    self.context.run()?;
    let output = self.context.get_outputs()?;

    let outputs: Vec<Option<&[f32]>> = (0..YOLO26_NUM_OUTPUTS as usize)
      .map(|i| match output.get_f32(i) {
        Ok(data) => Some(&data[..]),
        Err(e) => {
          error!("获取第 {} 个输出失败: {}", i, e);
          None
        }
      })
      .collect();

    let input_size = YOLO26_INPUT_SIZE as f32;
    let scale = (
      frame.width() as f32 / input_size,
      frame.height() as f32 / input_size,
    );
    let items = decode_heads(&outputs, self.threshold, scale);
    debug!("检测到 {} 个物体", items.len());
    Ok(DetectResult::from(items))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::CocoLabel;

  /// 全部为负 logit 的三个检测头，按 (回归, 分类) 排列
  fn blank_heads() -> Vec<Vec<f32>> {
    YOLO26_HEAD_SIZES
      .iter()
      .flat_map(|&(h, w)| {
        let spatial = h * w;
        [vec![0.0; 4 * spatial], vec![-10.0; YOLO26_CLASS_NUM * spatial]]
      })
      .collect()
  }

  fn place(heads: &mut [Vec<f32>], head: usize, h: usize, w: usize, class: usize) {
    let (map_h, map_w) = YOLO26_HEAD_SIZES[head];
    let spatial = map_h * map_w;
    let idx = h * map_w + w;
    for k in 0..4 {
      heads[head * 2][k * spatial + idx] = 1.0;
    }
    heads[head * 2 + 1][class * spatial + idx] = 5.0;
  }

  fn views(heads: &[Vec<f32>]) -> Vec<Option<&[f32]>> {
    heads.iter().map(|t| Some(t.as_slice())).collect()
  }

  #[test]
  fn boxes_are_scaled_to_frame_pixels() {
    let mut heads = blank_heads();
    place(&mut heads, 2, 10, 10, 56);

    let items: Vec<DetectItem<CocoLabel>> = decode_heads(&views(&heads), 0.5, (2.0, 1.0));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind.to_label_str(), "chair");
    assert_eq!(items[0].bbox, [608.0, 304.0, 736.0, 368.0]);
    assert_eq!(items[0].pixel_width(), 128.0);
    assert!(items[0].score > 0.99);
  }

  #[test]
  fn swapped_outputs_and_missing_heads() {
    let mut heads = blank_heads();
    place(&mut heads, 1, 0, 0, 0);
    heads.swap(2, 3);

    let mut outputs = views(&heads);
    outputs[4] = None;
    let items: Vec<DetectItem<CocoLabel>> = decode_heads(&outputs, 0.5, (1.0, 1.0));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind.to_label_str(), "person");
    // 左上角被裁到 0
    assert_eq!(items[0].bbox, [0.0, 0.0, 24.0, 24.0]);
  }

  #[test]
  fn frames_are_resized_for_the_model() {
    let frame = RgbFrame::with_shape(480, 640);
    let input = model_input(&frame).unwrap();
    assert_eq!(input.len(), 640 * 640 * 3);

    let square = RgbFrame::with_shape(640, 640);
    assert!(matches!(model_input(&square).unwrap(), Cow::Borrowed(_)));

    assert!(matches!(
      model_input(&RgbFrame::with_shape(0, 0)),
      Err(Yolo26Error::EmptyFrame)
    ));
  }
}
