// 该文件是 Zhilu （指路） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use zhilu::config::{GuidanceConfig, PromptConfig};
use zhilu::proximity::ProximityEstimator;

/// Zhilu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 目的地地图（GeoJSON FeatureCollection）
  #[arg(long, value_name = "FILE")]
  pub map: PathBuf,

  /// 定位来源
  /// - fixed:?lat=12.97&lon=77.59
  /// - replay:///path/to/track.json[?hold]
  /// - ip:（需要 ip_location 特性）
  #[arg(long, value_name = "SOURCE")]
  pub location: Url,

  /// 摄像头来源
  /// - none:
  /// - image:///path/to/frames/[?repeat]
  /// - gst://camera/dev/video0（需要 gstreamer_input 特性）
  #[arg(long, value_name = "SOURCE", default_value = "none:")]
  pub camera: Url,

  /// 障碍物检测器，省略时不做障碍物提醒
  /// - replay:///path/to/detections.json[?repeat]
  /// - yolo26:///path/to/yolo26.rknn[?threshold=0.25]（需要 model_yolo26 特性）
  #[arg(long, value_name = "SOURCE")]
  pub detector: Option<Url>,

  /// 语音输入输出
  /// - console:
  /// - tts:///usr/bin/espeak?arg=-s&arg=160
  #[arg(long, value_name = "DEVICE", default_value = "console:")]
  pub voice: Url,

  /// 将播报与识别内容追加到该文件
  #[arg(long, value_name = "FILE")]
  pub transcript: Option<PathBuf>,

  /// 直接指定目的地名称，跳过语音询问
  #[arg(long, value_name = "NAME")]
  pub destination: Option<String>,

  /// 到达判定距离（米）
  #[arg(long, default_value = "3.0", value_name = "METERS")]
  pub arrival_threshold: f64,

  /// 障碍物提醒冷却时间（毫秒）
  #[arg(long, default_value = "5000", value_name = "MILLIS")]
  pub cooldown_ms: u64,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 两轮导引之间的间隔（毫秒）
  #[arg(long, default_value = "1000", value_name = "MILLIS")]
  pub interval_ms: u64,

  /// 推算朝向所需的最小位移（米），0 表示不限制
  #[arg(long, default_value = "1.0", value_name = "METERS")]
  pub min_displacement: f64,

  /// 摄像头等效焦距（像素）
  #[arg(long, default_value = "615.0", value_name = "PIXELS")]
  pub focal_length: f32,

  /// 停止导航的口令
  #[arg(long, default_value = "stop navigation", value_name = "PHRASE")]
  pub stop_phrase: String,

  /// 目的地模糊匹配的最低相似度
  #[arg(long, default_value = "0.5", value_name = "RATIO")]
  pub similarity: f64,
}

impl Args {
  pub fn guidance_config(&self) -> GuidanceConfig {
    GuidanceConfig {
      arrival_threshold_m: self.arrival_threshold,
      alert_cooldown: Duration::from_millis(self.cooldown_ms),
      confidence_threshold: self.confidence,
      cycle_interval: Duration::from_millis(self.interval_ms),
      min_heading_displacement_m: self.min_displacement,
      stop_phrase: self.stop_phrase.to_lowercase(),
      proximity: ProximityEstimator::default().with_focal_length(self.focal_length),
      ..GuidanceConfig::default()
    }
  }

  pub fn prompt_config(&self) -> PromptConfig {
    PromptConfig {
      similarity_cutoff: self.similarity,
      ..PromptConfig::default()
    }
  }
}
