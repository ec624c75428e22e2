// 该文件是 Zhilu （指路） 项目的一部分。
// src/session.rs - 单次导航会话状态
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

//! 导航会话只由导引循环持有和修改，不涉及任何 I/O。
//!
//! 状态转移：`Idle → Active → {Arrived, Stopped, Cancelled, Failed}`，
//! 终止状态不可再转移。

use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::alert::{AlertThrottle, DetectedObject};
use crate::config::GuidanceConfig;
use crate::direction::{Instruction, decide};
use crate::gazetteer::{Destination, Gazetteer, GazetteerError};
use crate::geodesy::{self, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Idle,
  Active,
  Arrived,
  Stopped,
  Cancelled,
  Failed,
}

impl SessionState {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      SessionState::Arrived
        | SessionState::Stopped
        | SessionState::Cancelled
        | SessionState::Failed
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      SessionState::Idle => "IDLE",
      SessionState::Active => "ACTIVE",
      SessionState::Arrived => "ARRIVED",
      SessionState::Stopped => "STOPPED",
      SessionState::Cancelled => "CANCELLED",
      SessionState::Failed => "FAILED",
    }
  }
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("目的地错误: {0}")]
  Destination(#[from] GazetteerError),
  #[error("会话状态 {from} 不能转移到 {to}")]
  InvalidTransition { from: SessionState, to: SessionState },
  #[error("会话未处于导航状态: {0}")]
  NotActive(SessionState),
}

/// 一次定位后的导引结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guidance {
  Arrived { distance_m: f64 },
  Proceed { instruction: Instruction, distance_m: f64 },
}

pub struct NavigationSession {
  destination: Destination,
  previous: Option<GeoPoint>,
  throttle: AlertThrottle,
  state: SessionState,
  arrival_threshold_m: f64,
  min_heading_displacement_m: f64,
}

impl NavigationSession {
  pub fn new(destination: Destination, config: &GuidanceConfig) -> Self {
    Self {
      destination,
      previous: None,
      throttle: AlertThrottle::new(config.alert_cooldown),
      state: SessionState::Idle,
      arrival_threshold_m: config.arrival_threshold_m,
      min_heading_displacement_m: config.min_heading_displacement_m,
    }
  }

  /// 按名称查找目的地并进入 `Active`；目的地未知时不会产生会话
  pub fn begin(
    gazetteer: &Gazetteer,
    name: &str,
    config: &GuidanceConfig,
  ) -> Result<Self, SessionError> {
    let destination = gazetteer.lookup(name)?;
    let mut session = Self::new(destination, config);
    session.start()?;
    Ok(session)
  }

  pub fn destination(&self) -> &Destination {
    &self.destination
  }

  pub fn target(&self) -> GeoPoint {
    self.destination.location
  }

  pub fn previous(&self) -> Option<GeoPoint> {
    self.previous
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn last_alert(&self) -> Option<Instant> {
    self.throttle.last_alert()
  }

  pub fn start(&mut self) -> Result<(), SessionError> {
    self.transition(SessionState::Idle, SessionState::Active)
  }

  /// 处理一次定位：判断是否到达，否则给出行进指令并更新上一次位置
  pub fn observe(&mut self, current: GeoPoint) -> Result<Guidance, SessionError> {
    self.ensure_active()?;

    let target = self.target();
    let distance_m = geodesy::distance(current, target);
    if distance_m < self.arrival_threshold_m {
      info!("距离目的地 {:.2} 米，已到达", distance_m);
      self.state = SessionState::Arrived;
      return Ok(Guidance::Arrived { distance_m });
    }

    let degraded = self.previous.is_some_and(|previous| {
      geodesy::distance(previous, current) < self.min_heading_displacement_m
    });
    let instruction = if degraded {
      // 位移过小时朝向不可信，保留原锚点让位移继续累积
      debug!("两次定位位移过小，暂不推算朝向");
      Instruction::Calculating
    } else {
      let instruction = decide(self.previous, Some(current), target);
      self.previous = Some(current);
      instruction
    };

    Ok(Guidance::Proceed {
      instruction,
      distance_m,
    })
  }

  /// 将本帧障碍物交给节流器，返回需要播报的提醒
  pub fn alert(&mut self, objects: &[DetectedObject], now: Instant) -> Option<String> {
    if self.state != SessionState::Active {
      return None;
    }
    self.throttle.offer(objects, now)
  }

  pub fn stop(&mut self) -> Result<(), SessionError> {
    self.transition(SessionState::Active, SessionState::Stopped)
  }

  pub fn cancel(&mut self) -> Result<(), SessionError> {
    self.transition(SessionState::Active, SessionState::Cancelled)
  }

  pub fn fail(&mut self) -> Result<(), SessionError> {
    if self.state.is_terminal() {
      return Err(SessionError::InvalidTransition {
        from: self.state,
        to: SessionState::Failed,
      });
    }
    self.state = SessionState::Failed;
    Ok(())
  }

  fn ensure_active(&self) -> Result<(), SessionError> {
    if self.state == SessionState::Active {
      Ok(())
    } else {
      Err(SessionError::NotActive(self.state))
    }
  }

  fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), SessionError> {
    if self.state != from {
      return Err(SessionError::InvalidTransition {
        from: self.state,
        to,
      });
    }
    debug!("会话状态 {} -> {}", from, to);
    self.state = to;
    Ok(())
  }
}

/// 行进指令的播报文本
pub fn instruction_message(instruction: Instruction, distance_m: f64) -> String {
  format!(
    "{}, {} meters remaining.",
    instruction,
    distance_m.round() as u64
  )
}

pub fn arrival_message(destination: &Destination) -> String {
  format!("You have reached {}.", destination.name)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::proximity::Proximity;

  fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
  }

  fn session_towards(target: GeoPoint, config: &GuidanceConfig) -> NavigationSession {
    let mut session = NavigationSession::new(
      Destination {
        name: "library".to_string(),
        location: target,
      },
      config,
    );
    session.start().unwrap();
    session
  }

  /// 在赤道上，目标点以西约 `meters` 米处的点
  fn west_of(target: GeoPoint, meters: f64) -> GeoPoint {
    let step = 1e-3 / geodesy::distance(point(0.0, 0.0), point(0.0, 1e-3));
    point(0.0, target.longitude() - meters * step)
  }

  #[test]
  fn begin_requires_known_destination() {
    let gazetteer = Gazetteer::from_entries([("Library", point(0.0, 0.001))]);
    let config = GuidanceConfig::default();

    let session = NavigationSession::begin(&gazetteer, "library", &config).unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.previous(), None);

    assert!(matches!(
      NavigationSession::begin(&gazetteer, "gym", &config),
      Err(SessionError::Destination(GazetteerError::UnknownDestination(_)))
    ));
  }

  #[test]
  fn first_fix_is_calculating() {
    let config = GuidanceConfig::default();
    let mut session = session_towards(point(0.0, 0.001), &config);

    let guidance = session.observe(point(0.0, 0.0)).unwrap();
    assert!(matches!(
      guidance,
      Guidance::Proceed {
        instruction: Instruction::Calculating,
        ..
      }
    ));
    assert_eq!(session.previous(), Some(point(0.0, 0.0)));
  }

  #[test]
  fn eastward_progress_is_forward() {
    let config = GuidanceConfig::default();
    let mut session = session_towards(point(0.0, 0.001), &config);

    session.observe(point(0.0, 0.0)).unwrap();
    let guidance = session.observe(point(0.0, 0.0001)).unwrap();
    match guidance {
      Guidance::Proceed {
        instruction,
        distance_m,
      } => {
        assert_eq!(instruction, Instruction::Forward);
        assert!((distance_m - 100.19).abs() < 1.0);
      }
      other => panic!("unexpected guidance {other:?}"),
    }
    assert_eq!(session.previous(), Some(point(0.0, 0.0001)));
  }

  #[test]
  fn arrival_threshold_is_strict() {
    let config = GuidanceConfig::default();
    let target = point(0.0, 0.001);

    // 构造的点与目标的实际距离会有微小误差，以实测距离为准调整
    let mut at_threshold = west_of(target, 3.0);
    let measured = geodesy::distance(at_threshold, target);
    if measured < 3.0 {
      at_threshold = west_of(target, 3.0 + (3.0 - measured) + 1e-9);
    }
    assert!(geodesy::distance(at_threshold, target) >= 3.0);

    let mut session = session_towards(target, &config);
    assert!(matches!(
      session.observe(at_threshold).unwrap(),
      Guidance::Proceed { .. }
    ));
    assert_eq!(session.state(), SessionState::Active);

    let inside = west_of(target, 2.999);
    assert!(geodesy::distance(inside, target) < 3.0);
    assert!(matches!(
      session.observe(inside).unwrap(),
      Guidance::Arrived { .. }
    ));
    assert_eq!(session.state(), SessionState::Arrived);
    assert!(matches!(
      session.observe(inside),
      Err(SessionError::NotActive(SessionState::Arrived))
    ));
  }

  #[test]
  fn tiny_displacement_keeps_anchor() {
    let config = GuidanceConfig::default();
    let mut session = session_towards(point(0.0, 0.001), &config);

    session.observe(point(0.0, 0.0)).unwrap();
    // 约 0.5 米，低于默认的 1 米
    let guidance = session.observe(point(0.0, 0.0000045)).unwrap();
    assert!(matches!(
      guidance,
      Guidance::Proceed {
        instruction: Instruction::Calculating,
        ..
      }
    ));
    assert_eq!(session.previous(), Some(point(0.0, 0.0)));

    let guidance = session.observe(point(0.0, 0.00002)).unwrap();
    assert!(matches!(
      guidance,
      Guidance::Proceed {
        instruction: Instruction::Forward,
        ..
      }
    ));
  }

  #[test]
  fn zero_displacement_guard_is_disabled() {
    let config = GuidanceConfig {
      min_heading_displacement_m: 0.0,
      ..GuidanceConfig::default()
    };
    let mut session = session_towards(point(0.0, 0.001), &config);

    session.observe(point(0.0, 0.0)).unwrap();
    session.observe(point(0.0, 0.0000045)).unwrap();
    assert_eq!(session.previous(), Some(point(0.0, 0.0000045)));
  }

  #[test]
  fn terminal_states_are_final() {
    let config = GuidanceConfig::default();
    let mut session = session_towards(point(0.0, 0.001), &config);

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.cancel().is_err());
    assert!(session.fail().is_err());
    assert!(session.start().is_err());
    assert_eq!(session.state(), SessionState::Stopped);
  }

  #[test]
  fn alerts_are_throttled_per_session() {
    let config = GuidanceConfig::default();
    let mut session = session_towards(point(0.0, 0.001), &config);
    let objects = [DetectedObject {
      label: "person".to_string(),
      pixel_width: 123.0,
      confidence: 0.8,
      proximity: Proximity::Centimeters(200.0),
    }];
    let now = Instant::now();

    assert_eq!(
      session.alert(&objects, now).as_deref(),
      Some("Caution! person 200 cm ahead")
    );
    assert_eq!(session.alert(&objects, now + Duration::from_secs(1)), None);
    assert_eq!(session.last_alert(), Some(now));

    session.cancel().unwrap();
    assert_eq!(session.alert(&objects, now + Duration::from_secs(60)), None);
  }

  #[test]
  fn messages() {
    assert_eq!(
      instruction_message(Instruction::TurnLeft, 41.6),
      "Turn Left, 42 meters remaining."
    );
    let destination = Destination {
      name: "library".to_string(),
      location: point(0.0, 0.0),
    };
    assert_eq!(arrival_message(&destination), "You have reached library.");
  }
}
