// 该文件是 Zhilu （指路） 项目的一部分。
// src/voice/transcript.rs - 语音记录
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

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use super::{Listen, Speak};

/// 把播报与听到的内容带时间戳追加到文件中，再交给内部的语音设备。
///
/// 记录失败只会告警，不影响播报。
pub struct Transcript<V> {
  file: Mutex<File>,
  inner: V,
}

impl<V> Transcript<V> {
  pub fn new<P: AsRef<Path>>(path: P, inner: V) -> std::io::Result<Self> {
    let path = path.as_ref();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    info!("语音记录写入: {}", path.display());
    Ok(Self {
      file: Mutex::new(file),
      inner,
    })
  }

  pub fn inner(&self) -> &V {
    &self.inner
  }

  fn record(&self, direction: &str, text: &str) {
    let line = format!(
      "[{}] {} {}\n",
      Local::now().format("%Y-%m-%d %H:%M:%S"),
      direction,
      text
    );
    let result = match self.file.lock() {
      Ok(mut file) => file.write_all(line.as_bytes()),
      Err(_) => {
        warn!("语音记录文件锁已损坏");
        return;
      }
    };
    if let Err(e) = result {
      warn!("写入语音记录失败: {}", e);
    }
  }
}

impl<V: Speak> Speak for Transcript<V> {
  type Error = V::Error;

  fn speak(&self, text: &str) -> Result<(), Self::Error> {
    self.record(">", text);
    self.inner.speak(text)
  }
}

impl<V: Listen> Listen for Transcript<V> {
  type Error = V::Error;

  fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>, Self::Error> {
    let heard = self.inner.listen(timeout, phrase_limit)?;
    if let Some(text) = &heard {
      self.record("<", text);
    }
    Ok(heard)
  }
}
