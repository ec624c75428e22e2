// 该文件是 Zhilu （指路） 项目的一部分。
// src/voice/tts.rs - 外部语音合成程序
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

//! `tts:///usr/bin/espeak?arg=-s&arg=160`
//!
//! 每句话启动一次合成程序，文本作为最后一个参数，等待程序退出后才返回。
//! 识别仍然走标准输入。

use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use super::{ConsoleVoice, Listen, Speak, VoiceError};
use crate::{FromUrl, FromUrlWithScheme};

pub struct TtsVoice {
  program: PathBuf,
  args: Vec<String>,
  speaking: Mutex<()>,
  listener: ConsoleVoice,
}

impl TtsVoice {
  pub fn new(program: PathBuf, args: Vec<String>, listener: ConsoleVoice) -> Self {
    Self {
      program,
      args,
      speaking: Mutex::new(()),
      listener,
    }
  }

  fn command(&self, text: &str) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args).arg(text);
    command
  }
}

impl FromUrlWithScheme for TtsVoice {
  const SCHEME: &'static str = "tts";
}

impl FromUrl for TtsVoice {
  type Error = VoiceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(VoiceError::SchemeMismatch);
    }
    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();
    info!("语音合成程序: {}", url.path());
    Ok(Self::new(
      PathBuf::from(url.path()),
      args,
      ConsoleVoice::stdin(),
    ))
  }
}

impl Speak for TtsVoice {
  type Error = VoiceError;

  fn speak(&self, text: &str) -> Result<(), Self::Error> {
    // 同一时刻只允许一句话在播
    let _guard = self.speaking.lock().map_err(|_| VoiceError::Poisoned)?;
    debug!("合成语音: {}", text);
    let status = self.command(text).status()?;
    if !status.success() {
      return Err(VoiceError::CommandFailed(status));
    }
    Ok(())
  }
}

impl Listen for TtsVoice {
  type Error = VoiceError;

  fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>, Self::Error> {
    self.listener.listen(timeout, phrase_limit)
  }
}

#[cfg(all(test, unix))]
mod tests {
  use std::io::Cursor;

  use super::*;

  fn voice(program: &str, args: &[&str]) -> TtsVoice {
    TtsVoice::new(
      PathBuf::from(program),
      args.iter().map(|a| a.to_string()).collect(),
      ConsoleVoice::with_reader(Cursor::new("")),
    )
  }

  #[test]
  fn runs_program_with_text_last() {
    let voice = voice("/bin/sh", &["-c", "test \"$0\" = 'Turn Left'"]);
    assert!(voice.speak("Turn Left").is_ok());
    assert!(matches!(
      voice.speak("Turn Right"),
      Err(VoiceError::CommandFailed(_))
    ));
  }

  #[test]
  fn missing_program_is_io_error() {
    let voice = voice("/nonexistent/espeak", &[]);
    assert!(matches!(voice.speak("hello"), Err(VoiceError::IoError(_))));
  }

  #[test]
  fn args_come_from_query() {
    let url = Url::parse("tts:///usr/bin/espeak?arg=-s&arg=160").unwrap();
    let voice = TtsVoice::from_url(&url).unwrap();
    assert_eq!(voice.program, PathBuf::from("/usr/bin/espeak"));
    assert_eq!(voice.args, vec!["-s", "160"]);
  }
}
