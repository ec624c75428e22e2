// 该文件是 Zhilu （指路） 项目的一部分。
// src/voice.rs - 语音输入输出
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 播报一段文本，返回时应已播报完毕，保证提醒不会相互重叠
pub trait Speak {
  type Error;
  fn speak(&self, text: &str) -> Result<(), Self::Error>;
}

/// 在 `timeout` 内等待用户开口，最多录 `phrase_limit`；没有听到内容时返回 `None`
pub trait Listen {
  type Error;
  fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>, Self::Error>;
}

impl<S: Speak + ?Sized> Speak for &S {
  type Error = S::Error;

  fn speak(&self, text: &str) -> Result<(), Self::Error> {
    (**self).speak(text)
  }
}

impl<L: Listen + ?Sized> Listen for &L {
  type Error = L::Error;

  fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>, Self::Error> {
    (**self).listen(timeout, phrase_limit)
  }
}

#[derive(Error, Debug)]
pub enum VoiceError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("语音合成程序退出异常: {0}")]
  CommandFailed(std::process::ExitStatus),
  #[error("语音设备状态锁已损坏")]
  Poisoned,
}

mod console;
pub use self::console::ConsoleVoice;

mod tts;
pub use self::tts::TtsVoice;

mod transcript;
pub use self::transcript::Transcript;

pub enum VoiceWrapper {
  Console(ConsoleVoice),
  Tts(TtsVoice),
}

impl FromUrl for VoiceWrapper {
  type Error = VoiceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleVoice::SCHEME => Ok(VoiceWrapper::Console(ConsoleVoice::from_url(url)?)),
      TtsVoice::SCHEME => Ok(VoiceWrapper::Tts(TtsVoice::from_url(url)?)),
      _ => Err(VoiceError::SchemeMismatch),
    }
  }
}

impl Speak for VoiceWrapper {
  type Error = VoiceError;

  fn speak(&self, text: &str) -> Result<(), Self::Error> {
    match self {
      VoiceWrapper::Console(voice) => voice.speak(text),
      VoiceWrapper::Tts(voice) => voice.speak(text),
    }
  }
}

impl Listen for VoiceWrapper {
  type Error = VoiceError;

  fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>, Self::Error> {
    match self {
      VoiceWrapper::Console(voice) => voice.listen(timeout, phrase_limit),
      VoiceWrapper::Tts(voice) => voice.listen(timeout, phrase_limit),
    }
  }
}
