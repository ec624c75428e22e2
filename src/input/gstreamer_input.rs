// 该文件是 Zhilu （指路） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 相机输入
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

//! # GStreamer 相机输入
//!
//! 支持三种 URL：
//! - `gst://camera/dev/video0?width=640&height=480&fps=15&rotate=90`
//! - `gst://file/path/to/walk.mp4`
//! - `gst://pipeline/<URL 编码的管道描述>`，管道输出须能转换为 RGB
//!
//! 每次取帧最多等待 `timeout-ms`（默认 200 毫秒），超时视为本轮没有帧。
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use std::collections::HashMap;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame};

#[derive(Error, Debug)]
pub enum GStreamerInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("GStreamer 错误: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer 调用失败: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("管道中没有名为 sink 的元素")]
  AppSinkNotFound,
  #[error("sink 元素不是 appsink")]
  AppSinkConversionFailed,
  #[error("无法从 caps 解析视频信息")]
  VideoInfoError,
  #[error("相机输出不是 RGB 格式")]
  UnsupportedFormat,
  #[error("管道错误: {0}")]
  PipelineError(String),
  #[error("缓冲区过小: 至少需要 {expected} 字节, 实际 {actual} 字节")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("管道状态切换失败: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

const DEFAULT_PULL_TIMEOUT_MS: u64 = 200;

enum PipelineItem {
  FileSource(String),
  CameraSource {
    camera: String,
    width: u32,
    height: u32,
    fps: u32,
  },
  Raw(String),
  VideoFlip {
    method: u32,
  },
  TargetFormat,
}

impl PipelineItem {
  fn to_pipeline(&self) -> String {
    match self {
      PipelineItem::FileSource(path) => format!("filesrc location={} ! decodebin", path),
      PipelineItem::CameraSource {
        camera,
        width,
        height,
        fps,
      } => format!(
        "v4l2src device={} ! videoconvert ! video/x-raw,width={},height={},framerate={}/1",
        camera, width, height, fps
      ),
      PipelineItem::Raw(description) => description.clone(),
      PipelineItem::VideoFlip { method } => format!("videoflip method={}", method),
      PipelineItem::TargetFormat => "videoconvert ! video/x-raw,format=RGB".to_string(),
    }
  }
}

pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  pull_timeout: gst::ClockTime,
}

impl FromUrlWithScheme for GStreamerInput {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerInput {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerInputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let number = |key: &str, default: u32| {
      query
        .get(key)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
    };

    let mut items = match url.host_str() {
      Some("camera") => vec![PipelineItem::CameraSource {
        camera: url.path().to_string(),
        width: number("width", 640),
        height: number("height", 480),
        fps: number("fps", 15),
      }],
      Some("file") => vec![PipelineItem::FileSource(url.path().to_string())],
      Some("pipeline") => {
        let encoded = url.path().trim_start_matches('/');
        let description = urlencoding::decode(encoded)
          .map_err(|e| GStreamerInputError::PipelineError(e.to_string()))?;
        vec![PipelineItem::Raw(description.into_owned())]
      }
      _ => return Err(GStreamerInputError::SchemeMismatch),
    };

    if let Some(method) = query.get("rotate").and_then(|r| video_flip_method(r)) {
      items.push(PipelineItem::VideoFlip { method });
    }
    items.push(PipelineItem::TargetFormat);

    let timeout_ms = query
      .get("timeout-ms")
      .and_then(|v| v.parse::<u64>().ok())
      .unwrap_or(DEFAULT_PULL_TIMEOUT_MS);

    Self::launch(&items, gst::ClockTime::from_mseconds(timeout_ms))
  }
}

fn video_flip_method(rotate: &str) -> Option<u32> {
  match rotate {
    "90" => Some(1),
    "180" => Some(2),
    "270" => Some(3),
    _ => None,
  }
}

impl GStreamerInput {
  fn launch(
    items: &[PipelineItem],
    pull_timeout: gst::ClockTime,
  ) -> Result<Self, GStreamerInputError> {
    gst::init()?;

    let basic_pipeline = items
      .iter()
      .map(PipelineItem::to_pipeline)
      .collect::<Vec<String>>()
      .join(" ! ");
    let full_pipeline = format!(
      "{} ! appsink max-buffers=1 drop=true name=sink",
      basic_pipeline
    );
    info!("GStreamer 管道: {}", full_pipeline);

    let pipeline = gst::parse::launch(&full_pipeline)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("无法创建管道".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerInput {
      pipeline,
      appsink,
      pull_timeout,
    })
  }
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    info!("关闭相机管道");
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("停止相机管道失败: {}", e);
    }
  }
}

impl Iterator for GStreamerInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    let sample = self.appsink.try_pull_sample(self.pull_timeout)?;
    convert_sample(sample)
      .map_err(|e| {
        error!("相机帧转换失败: {}", e);
        e
      })
      .ok()
  }
}

fn convert_sample(sample: gst::Sample) -> Result<RgbFrame, GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("样本中没有缓冲区".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("样本中没有 caps".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;
  if video_info.format() != gst_video::VideoFormat::Rgb {
    return Err(GStreamerInputError::UnsupportedFormat);
  }

  let width = video_info.width() as usize;
  let height = video_info.height() as usize;
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("无法映射缓冲区: {}", e))
  })?;
  let data = map.as_slice();

  let expected_size = stride * (height.saturating_sub(1)) + width * 3;
  if data.len() < expected_size {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected: expected_size,
      actual: data.len(),
    });
  }

  // 行尾可能有对齐填充，逐行拷贝
  let mut frame = RgbFrame::with_shape(height, width);
  let row_bytes = width * 3;
  let slice = frame.as_mut();
  for h in 0..height {
    let src = &data[h * stride..h * stride + row_bytes];
    slice[h * row_bytes..(h + 1) * row_bytes].copy_from_slice(src);
  }

  Ok(frame)
}
