// 该文件是 Zhilu （指路） 项目的一部分。
// src/alert.rs - 障碍物提醒节流
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

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::proximity::Proximity;

pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(5);

/// 单帧中检测到的一个障碍物
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
  pub label: String,
  pub pixel_width: f32,
  pub confidence: f32,
  pub proximity: Proximity,
}

impl fmt::Display for DetectedObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.proximity {
      Proximity::Centimeters(_) => write!(f, "{} {} ahead", self.label, self.proximity),
      Proximity::Unknown => write!(f, "{} ahead", self.label),
    }
  }
}

/// 冷却窗口内最多播报一次障碍物提醒
#[derive(Debug, Clone)]
pub struct AlertThrottle {
  cooldown: Duration,
  last_alert: Option<Instant>,
}

impl Default for AlertThrottle {
  fn default() -> Self {
    Self::new(DEFAULT_ALERT_COOLDOWN)
  }
}

impl AlertThrottle {
  pub fn new(cooldown: Duration) -> Self {
    Self {
      cooldown,
      last_alert: None,
    }
  }

  pub fn cooldown(&self) -> Duration {
    self.cooldown
  }

  pub fn last_alert(&self) -> Option<Instant> {
    self.last_alert
  }

  /// 返回需要播报的合并提醒；被抑制或列表为空时返回 `None` 且不改动时间戳。
  pub fn offer(&mut self, objects: &[DetectedObject], now: Instant) -> Option<String> {
    if objects.is_empty() {
      return None;
    }

    if let Some(last) = self.last_alert {
      let elapsed = now.saturating_duration_since(last);
      if elapsed <= self.cooldown {
        debug!("提醒冷却中，已过 {:.2?}，抑制 {} 个物体", elapsed, objects.len());
        return None;
      }
    }

    self.last_alert = Some(now);
    Some(alert_message(objects))
  }
}

pub fn alert_message(objects: &[DetectedObject]) -> String {
  let parts: Vec<String> = objects.iter().map(ToString::to_string).collect();
  format!("Caution! {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn object(label: &str, proximity: Proximity) -> DetectedObject {
    DetectedObject {
      label: label.to_string(),
      pixel_width: 100.0,
      confidence: 0.9,
      proximity,
    }
  }

  #[test]
  fn calls_one_second_apart_emit_once() {
    let mut throttle = AlertThrottle::default();
    let start = Instant::now();
    let objects = [object("person", Proximity::Centimeters(200.0))];

    assert!(throttle.offer(&objects, start).is_some());
    assert!(
      throttle
        .offer(&objects, start + Duration::from_secs(1))
        .is_none()
    );
    assert_eq!(throttle.last_alert(), Some(start));
  }

  #[test]
  fn calls_six_seconds_apart_both_emit() {
    let mut throttle = AlertThrottle::default();
    let start = Instant::now();
    let objects = [object("chair", Proximity::Centimeters(120.0))];

    assert!(throttle.offer(&objects, start).is_some());
    let later = start + Duration::from_secs(6);
    assert!(throttle.offer(&objects, later).is_some());
    assert_eq!(throttle.last_alert(), Some(later));
  }

  #[test]
  fn exactly_at_cooldown_is_suppressed() {
    let mut throttle = AlertThrottle::default();
    let start = Instant::now();
    let objects = [object("cup", Proximity::Centimeters(40.0))];

    assert!(throttle.offer(&objects, start).is_some());
    assert!(
      throttle
        .offer(&objects, start + DEFAULT_ALERT_COOLDOWN)
        .is_none()
    );
  }

  #[test]
  fn empty_list_never_emits_or_updates() {
    let mut throttle = AlertThrottle::default();
    let start = Instant::now();

    assert!(throttle.offer(&[], start).is_none());
    assert_eq!(throttle.last_alert(), None);

    let objects = [object("car", Proximity::Centimeters(900.0))];
    assert!(throttle.offer(&objects, start).is_some());
    assert!(throttle.offer(&[], start + Duration::from_secs(10)).is_none());
    assert_eq!(throttle.last_alert(), Some(start));
  }

  #[test]
  fn message_keeps_detection_order() {
    let objects = [
      object("person", Proximity::Centimeters(199.6)),
      object("chair", Proximity::Centimeters(75.2)),
      object("bench", Proximity::Unknown),
    ];
    assert_eq!(
      alert_message(&objects),
      "Caution! person 200 cm ahead, chair 75 cm ahead, bench ahead"
    );
  }
}
