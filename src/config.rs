// 该文件是 Zhilu （指路） 项目的一部分。
// src/config.rs - 导引参数
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

use std::time::Duration;

use crate::alert::DEFAULT_ALERT_COOLDOWN;
use crate::proximity::ProximityEstimator;

/// 导引循环的全部可调参数
#[derive(Debug, Clone)]
pub struct GuidanceConfig {
  /// 到达判定距离（米），严格小于才算到达
  pub arrival_threshold_m: f64,
  /// 两次障碍物提醒之间的最小间隔
  pub alert_cooldown: Duration,
  /// 检测置信度阈值，严格大于才会提醒
  pub confidence_threshold: f32,
  /// 相邻两次循环之间的最小间隔
  pub cycle_interval: Duration,
  /// 定位不可用时的首次退避时间，之后逐次翻倍
  pub retry_backoff_initial: Duration,
  /// 退避时间上限
  pub retry_backoff_max: Duration,
  /// 等待停止指令的超时
  pub stop_listen_timeout: Duration,
  /// 停止指令的最长语句时长
  pub stop_phrase_limit: Duration,
  /// 两次定位间位移小于该值（米）时不用于推算朝向，0 表示不限制
  pub min_heading_displacement_m: f64,
  /// 触发停止的短语（小写）
  pub stop_phrase: String,
  pub proximity: ProximityEstimator,
}

impl Default for GuidanceConfig {
  fn default() -> Self {
    Self {
      arrival_threshold_m: 3.0,
      alert_cooldown: DEFAULT_ALERT_COOLDOWN,
      confidence_threshold: 0.5,
      cycle_interval: Duration::from_secs(1),
      retry_backoff_initial: Duration::from_millis(500),
      retry_backoff_max: Duration::from_secs(5),
      stop_listen_timeout: Duration::from_secs(5),
      stop_phrase_limit: Duration::from_secs(3),
      min_heading_displacement_m: 1.0,
      stop_phrase: "stop navigation".to_string(),
      proximity: ProximityEstimator::default(),
    }
  }
}

/// 目的地语音采集参数
#[derive(Debug, Clone)]
pub struct PromptConfig {
  pub prompt: String,
  pub listen_timeout: Duration,
  pub phrase_limit: Duration,
  pub similarity_cutoff: f64,
}

impl Default for PromptConfig {
  fn default() -> Self {
    Self {
      prompt: "Where do you want to go?".to_string(),
      listen_timeout: Duration::from_secs(10),
      phrase_limit: Duration::from_secs(5),
      similarity_cutoff: crate::matching::DEFAULT_SIMILARITY_CUTOFF,
    }
  }
}
