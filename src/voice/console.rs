// 该文件是 Zhilu （指路） 项目的一部分。
// src/voice/console.rs - 终端语音替身
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

//! `console:`：播报内容打印到标准输出，标准输入的每一行视为一次识别结果。

use std::io::BufRead;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use super::{Listen, Speak, VoiceError};
use crate::{FromUrl, FromUrlWithScheme};

pub struct ConsoleVoice {
  lines: Mutex<Receiver<String>>,
}

impl ConsoleVoice {
  pub fn stdin() -> Self {
    Self::with_reader(std::io::BufReader::new(std::io::stdin()))
  }

  /// 后台线程逐行读取 `reader`，读到结尾后听写始终返回 `None`
  pub fn with_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
      for line in reader.lines() {
        let Ok(line) = line else { break };
        if tx.send(line).is_err() {
          break;
        }
      }
      debug!("输入流已结束");
    });
    Self {
      lines: Mutex::new(rx),
    }
  }
}

impl FromUrlWithScheme for ConsoleVoice {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleVoice {
  type Error = VoiceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(VoiceError::SchemeMismatch);
    }
    Ok(Self::stdin())
  }
}

impl Speak for ConsoleVoice {
  type Error = VoiceError;

  fn speak(&self, text: &str) -> Result<(), Self::Error> {
    info!("播报: {}", text);
    println!("> {}", text);
    Ok(())
  }
}

impl Listen for ConsoleVoice {
  type Error = VoiceError;

  fn listen(&self, timeout: Duration, _phrase_limit: Duration) -> Result<Option<String>, Self::Error> {
    let lines = self.lines.lock().map_err(|_| VoiceError::Poisoned)?;
    match lines.recv_timeout(timeout) {
      Ok(line) => {
        let line = line.trim().to_string();
        debug!("听到: {}", line);
        Ok((!line.is_empty()).then_some(line))
      }
      Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  #[test]
  fn listens_line_by_line() {
    let voice = ConsoleVoice::with_reader(Cursor::new("  Library \n\nstop navigation\n"));
    let timeout = Duration::from_secs(2);
    let limit = Duration::from_secs(1);

    assert_eq!(
      voice.listen(timeout, limit).unwrap().as_deref(),
      Some("Library")
    );
    assert_eq!(voice.listen(timeout, limit).unwrap(), None);
    assert_eq!(
      voice.listen(timeout, limit).unwrap().as_deref(),
      Some("stop navigation")
    );
    assert_eq!(voice.listen(Duration::from_millis(50), limit).unwrap(), None);
  }

  #[test]
  fn speak_never_fails() {
    let voice = ConsoleVoice::with_reader(Cursor::new(""));
    assert!(voice.speak("Navigating to library").is_ok());
  }
}
