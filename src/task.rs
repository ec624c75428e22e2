// 该文件是 Zhilu （指路） 项目的一部分。
// src/task.rs - 导引循环
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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use std::{fmt, thread};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  alert::DetectedObject,
  config::{GuidanceConfig, PromptConfig},
  gazetteer::{Destination, Gazetteer, GazetteerError},
  location::{LocationError, LocationProvider},
  model::{DetectResult, Model, WithLabel},
  session::{Guidance, NavigationSession, SessionError, arrival_message, instruction_message},
  voice::{Listen, Speak},
};

pub const INVALID_DESTINATION_MESSAGE: &str = "Invalid destination. Please try again.";
pub const NOT_RECOGNIZED_MESSAGE: &str = "Destination not recognized. Try again.";
pub const STOPPED_MESSAGE: &str = "Navigation stopped.";

/// 等待期间检查取消信号的粒度
const CANCEL_POLL: Duration = Duration::from_millis(50);

pub trait Task<I, M, V>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, voice: V) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum NavigationError {
  #[error("会话错误: {0}")]
  Session(#[from] SessionError),
  #[error("目的地错误: {0}")]
  Destination(#[from] GazetteerError),
  #[error("语音输出失败: {0}")]
  Voice(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
  Arrived,
  Stopped,
  Cancelled,
}

/// 外部取消信号，可在任意线程触发
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
  pub fn new() -> Self {
    Self::default()
  }

  /// 创建信号并注册 Ctrl-C 处理；第二次注册会失败
  pub fn install_ctrlc() -> Result<Self, ctrlc::Error> {
    let signal = Self::new();
    let handle = signal.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      handle.trigger();
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(signal)
  }

  pub fn trigger(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_set(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// 等待 `duration`，期间被取消则提前返回 `true`
  pub fn wait(&self, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
      if self.is_set() {
        return true;
      }
      let now = Instant::now();
      if now >= deadline {
        return false;
      }
      thread::sleep(CANCEL_POLL.min(deadline - now));
    }
  }
}

/// 定位不可用时的指数退避
#[derive(Debug, Clone)]
struct Backoff {
  initial: Duration,
  max: Duration,
  next: Duration,
}

impl Backoff {
  fn new(initial: Duration, max: Duration) -> Self {
    Self {
      initial,
      max,
      next: initial.min(max),
    }
  }

  fn next_delay(&mut self) -> Duration {
    let delay = self.next;
    self.next = self.next.saturating_mul(2).min(self.max);
    delay
  }

  fn reset(&mut self) {
    self.next = self.initial.min(self.max);
  }
}

fn speak<V>(voice: &V, text: &str) -> Result<(), NavigationError>
where
  V: Speak,
  V::Error: std::error::Error + Send + Sync + 'static,
{
  voice
    .speak(text)
    .map_err(|e| NavigationError::Voice(Box::new(e)))
}

/// 精确查找目的地，找不到时告知用户
pub fn resolve_destination<V>(
  voice: &V,
  gazetteer: &Gazetteer,
  name: &str,
) -> Result<Destination, NavigationError>
where
  V: Speak,
  V::Error: std::error::Error + Send + Sync + 'static,
{
  match gazetteer.lookup(name) {
    Ok(destination) => Ok(destination),
    Err(e) => {
      warn!("{}", e);
      speak(voice, INVALID_DESTINATION_MESSAGE)?;
      Err(e.into())
    }
  }
}

/// 语音询问目的地并模糊匹配；没听清或匹配失败时告知用户
pub fn capture_destination<V>(
  voice: &V,
  gazetteer: &Gazetteer,
  prompt: &PromptConfig,
) -> Result<Destination, NavigationError>
where
  V: Speak + Listen,
  <V as Speak>::Error: std::error::Error + Send + Sync + 'static,
  <V as Listen>::Error: fmt::Display,
{
  speak(voice, &prompt.prompt)?;
  let heard = match voice.listen(prompt.listen_timeout, prompt.phrase_limit) {
    Ok(heard) => heard,
    Err(e) => {
      warn!("语音识别失败: {}", e);
      None
    }
  };
  let spoken = heard.unwrap_or_default();
  info!("听到目的地: '{}'", spoken);

  match gazetteer.resolve(&spoken, prompt.similarity_cutoff) {
    Ok(destination) => Ok(destination),
    Err(e) => {
      warn!("{}", e);
      speak(voice, NOT_RECOGNIZED_MESSAGE)?;
      Err(e.into())
    }
  }
}

/// 一次导航请求：持有会话与定位来源，直到进入终止状态
pub struct NavigationTask<L> {
  session: NavigationSession,
  location: L,
  config: GuidanceConfig,
  cancel: CancelSignal,
}

impl<L: LocationProvider> NavigationTask<L> {
  pub fn new(
    destination: Destination,
    location: L,
    config: GuidanceConfig,
    cancel: CancelSignal,
  ) -> Result<Self, NavigationError> {
    let mut session = NavigationSession::new(destination, &config);
    session.start()?;
    Ok(Self {
      session,
      location,
      config,
      cancel,
    })
  }

  pub fn session(&self) -> &NavigationSession {
    &self.session
  }

  fn cancelled(&mut self) -> Result<NavigationOutcome, NavigationError> {
    info!("导航被取消");
    self.session.cancel()?;
    Ok(NavigationOutcome::Cancelled)
  }

  fn guide<F, T, I, M, V>(
    &mut self,
    camera: &mut I,
    detector: &M,
    voice: &V,
  ) -> Result<NavigationOutcome, NavigationError>
  where
    T: WithLabel,
    I: Iterator<Item = F>,
    M: Model<Input = F, Output = DetectResult<T>>,
    M::Error: fmt::Display,
    V: Speak + Listen,
    <V as Speak>::Error: std::error::Error + Send + Sync + 'static,
    <V as Listen>::Error: fmt::Display,
  {
    let mut backoff = Backoff::new(
      self.config.retry_backoff_initial,
      self.config.retry_backoff_max,
    );
    let mut cycle = 0usize;

    loop {
      if self.cancel.is_set() {
        return self.cancelled();
      }

      let current = match self.location.current_location() {
        Ok(point) => {
          backoff.reset();
          point
        }
        Err(LocationError::Unavailable(reason)) => {
          let delay = backoff.next_delay();
          debug!("定位不可用（{}），{:.2?} 后重试", reason, delay);
          if self.cancel.wait(delay) {
            return self.cancelled();
          }
          continue;
        }
      };

      // 定位可能阻塞较久，期间到达的取消信号不能再换来一条指令
      if self.cancel.is_set() {
        return self.cancelled();
      }

      cycle += 1;
      let now = Instant::now();
      match self.session.observe(current)? {
        Guidance::Arrived { distance_m } => {
          info!("第 {} 轮：剩余 {:.2} 米，到达目的地", cycle, distance_m);
          speak(voice, &arrival_message(self.session.destination()))?;
          return Ok(NavigationOutcome::Arrived);
        }
        Guidance::Proceed {
          instruction,
          distance_m,
        } => {
          info!(
            "第 {} 轮：位置 {}，剩余 {:.2} 米，{}",
            cycle, current, distance_m, instruction
          );
          speak(voice, &instruction_message(instruction, distance_m))?;
        }
      }

      self.check_obstacles(camera, detector, voice)?;
      debug!("第 {} 轮导引耗时: {:.2?}", cycle, now.elapsed());

      if self.heard_stop(voice) {
        info!("用户要求停止导航");
        self.session.stop()?;
        speak(voice, STOPPED_MESSAGE)?;
        return Ok(NavigationOutcome::Stopped);
      }

      if self.cancel.is_set() || self.cancel.wait(self.config.cycle_interval) {
        return self.cancelled();
      }
    }
  }

  fn check_obstacles<F, T, I, M, V>(
    &mut self,
    camera: &mut I,
    detector: &M,
    voice: &V,
  ) -> Result<(), NavigationError>
  where
    T: WithLabel,
    I: Iterator<Item = F>,
    M: Model<Input = F, Output = DetectResult<T>>,
    M::Error: fmt::Display,
    V: Speak,
    V::Error: std::error::Error + Send + Sync + 'static,
  {
    let Some(frame) = camera.next() else {
      debug!("本轮没有图像帧，跳过障碍物检测");
      return Ok(());
    };

    let now = Instant::now();
    let result = match detector.infer(&frame) {
      Ok(result) => result,
      Err(e) => {
        warn!("障碍物检测失败: {}", e);
        return Ok(());
      }
    };
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let proximity = &self.config.proximity;
    let objects: Vec<DetectedObject> = result
      .iter()
      .filter(|item| item.score > self.config.confidence_threshold)
      .map(|item| {
        let label = item.kind.to_label_str();
        let pixel_width = item.pixel_width();
        DetectedObject {
          proximity: proximity.estimate(&label, pixel_width),
          label,
          pixel_width,
          confidence: item.score,
        }
      })
      .collect();
    debug!(
      "检测到 {} 个物体，其中 {} 个超过置信度阈值",
      result.len(),
      objects.len()
    );

    if let Some(message) = self.session.alert(&objects, Instant::now()) {
      warn!("{}", message);
      speak(voice, &message)?;
    }
    Ok(())
  }

  fn heard_stop<V>(&self, voice: &V) -> bool
  where
    V: Listen,
    V::Error: fmt::Display,
  {
    match voice.listen(self.config.stop_listen_timeout, self.config.stop_phrase_limit) {
      Ok(Some(text)) => text
        .to_lowercase()
        .contains(&self.config.stop_phrase.to_lowercase()),
      Ok(None) => false,
      Err(e) => {
        warn!("听取停止指令失败: {}", e);
        false
      }
    }
  }
}

impl<F, T, L, I, M, V> Task<I, M, V> for NavigationTask<L>
where
  T: WithLabel,
  L: LocationProvider,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectResult<T>>,
  M::Error: fmt::Display,
  V: Speak + Listen,
  <V as Speak>::Error: std::error::Error + Send + Sync + 'static,
  <V as Listen>::Error: fmt::Display,
{
  type Output = NavigationOutcome;
  type Error = NavigationError;

  /// 摄像头随任务一起移入，任何退出路径都会被释放
  fn run_task(mut self, mut input: I, model: M, voice: V) -> Result<Self::Output, Self::Error> {
    let name = self.session.destination().name.clone();
    info!("开始导航: {} ({})", name, self.session.target());

    let result = speak(&voice, &format!("Navigating to {}", name))
      .and_then(|_| self.guide(&mut input, &model, &voice));

    match &result {
      Ok(outcome) => info!("导航结束: {:?}", outcome),
      Err(e) => {
        warn!("导航失败: {}", e);
        // 会话已终止时 fail 不会生效
        let _ = self.session.fail();
      }
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::collections::VecDeque;
  use std::convert::Infallible;

  use super::*;
  use crate::frame::RgbFrame;
  use crate::geodesy::GeoPoint;
  use crate::location::ReplayLocation;
  use crate::model::{CocoLabel, ReplayDetector};

  #[derive(Default)]
  struct ScriptedVoice {
    spoken: RefCell<Vec<String>>,
    heard: RefCell<VecDeque<String>>,
  }

  impl ScriptedVoice {
    fn hearing(lines: &[&str]) -> Self {
      Self {
        spoken: RefCell::default(),
        heard: RefCell::new(lines.iter().map(|l| l.to_string()).collect()),
      }
    }
  }

  impl Speak for ScriptedVoice {
    type Error = Infallible;

    fn speak(&self, text: &str) -> Result<(), Self::Error> {
      self.spoken.borrow_mut().push(text.to_string());
      Ok(())
    }
  }

  impl Listen for ScriptedVoice {
    type Error = Infallible;

    fn listen(&self, _: Duration, _: Duration) -> Result<Option<String>, Self::Error> {
      Ok(self.heard.borrow_mut().pop_front())
    }
  }

  fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
  }

  fn quick_config() -> GuidanceConfig {
    GuidanceConfig {
      cycle_interval: Duration::ZERO,
      retry_backoff_initial: Duration::from_millis(1),
      retry_backoff_max: Duration::from_millis(4),
      ..GuidanceConfig::default()
    }
  }

  fn campus() -> Gazetteer {
    Gazetteer::from_entries([("Library", point(0.0, 0.001))])
  }

  #[test]
  fn backoff_doubles_up_to_cap_and_resets() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));
    let delays: Vec<u128> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
    assert_eq!(delays, vec![500, 1000, 2000, 4000, 5000, 5000]);
    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_millis(500));
  }

  #[test]
  fn cancel_wait_returns_early() {
    let cancel = CancelSignal::new();
    assert!(!cancel.wait(Duration::from_millis(10)));

    let remote = cancel.clone();
    let started = Instant::now();
    thread::spawn(move || {
      thread::sleep(Duration::from_millis(20));
      remote.trigger();
    });
    assert!(cancel.wait(Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(5));
  }

  #[test]
  fn unknown_destination_is_announced() {
    let voice = ScriptedVoice::default();
    let result = resolve_destination(&voice, &campus(), "gym");
    assert!(matches!(
      result,
      Err(NavigationError::Destination(GazetteerError::UnknownDestination(_)))
    ));
    assert_eq!(*voice.spoken.borrow(), vec![INVALID_DESTINATION_MESSAGE]);
  }

  #[test]
  fn captured_destination_is_fuzzy_matched() {
    let voice = ScriptedVoice::hearing(&["Libary"]);
    let destination = capture_destination(&voice, &campus(), &PromptConfig::default()).unwrap();
    assert_eq!(destination.name, "library");
    assert_eq!(*voice.spoken.borrow(), vec!["Where do you want to go?"]);

    let voice = ScriptedVoice::hearing(&["swimming pool"]);
    assert!(capture_destination(&voice, &campus(), &PromptConfig::default()).is_err());
    assert_eq!(voice.spoken.borrow().last().unwrap(), NOT_RECOGNIZED_MESSAGE);

    // 没听到任何内容
    let voice = ScriptedVoice::default();
    assert!(capture_destination(&voice, &campus(), &PromptConfig::default()).is_err());
    assert_eq!(voice.spoken.borrow().last().unwrap(), NOT_RECOGNIZED_MESSAGE);
  }

  #[test]
  fn stops_on_spoken_command() {
    let destination = campus().lookup("library").unwrap();
    let location = ReplayLocation::new([Some(point(0.0, 0.0)), Some(point(0.0, 0.0001))]);
    let task =
      NavigationTask::new(destination, location, quick_config(), CancelSignal::new()).unwrap();
    let voice = ScriptedVoice::hearing(&["", "please STOP navigation now"]);
    let detector: ReplayDetector<CocoLabel> = ReplayDetector::from_frames(Vec::new());

    let outcome = task
      .run_task(std::iter::empty::<RgbFrame>(), &detector, &voice)
      .unwrap();
    assert_eq!(outcome, NavigationOutcome::Stopped);
    assert_eq!(
      *voice.spoken.borrow(),
      vec![
        "Navigating to library",
        "Calculating route..., 111 meters remaining.",
        "Move Forward, 100 meters remaining.",
        STOPPED_MESSAGE,
      ]
    );
  }

  #[test]
  fn cancelled_before_first_cycle_is_silent() {
    let destination = campus().lookup("library").unwrap();
    let cancel = CancelSignal::new();
    cancel.trigger();
    let location = ReplayLocation::new([Some(point(0.0, 0.0))]);
    let task = NavigationTask::new(destination, location, quick_config(), cancel).unwrap();
    let voice = ScriptedVoice::default();
    let detector: ReplayDetector<CocoLabel> = ReplayDetector::from_frames(Vec::new());

    let outcome = task
      .run_task(std::iter::empty::<RgbFrame>(), &detector, &voice)
      .unwrap();
    assert_eq!(outcome, NavigationOutcome::Cancelled);
    assert_eq!(*voice.spoken.borrow(), vec!["Navigating to library"]);
  }
}
