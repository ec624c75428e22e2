// 该文件是 Zhilu （指路） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zhilu::{
  FromUrl,
  gazetteer::Gazetteer,
  input::InputWrapper,
  location::LocationWrapper,
  model::{CocoLabel, DetectorWrapper},
  task::{CancelSignal, NavigationTask, Task, capture_destination, resolve_destination},
  voice::{Listen, Speak, Transcript, VoiceError, VoiceWrapper},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("地图文件: {}", args.map.display());
  info!("定位来源: {}", args.location);
  info!("摄像头来源: {}", args.camera);
  info!("语音设备: {}", args.voice);

  let voice = VoiceWrapper::from_url(&args.voice)?;
  match &args.transcript {
    Some(path) => navigate(&args, Transcript::new(path, voice)?),
    None => navigate(&args, voice),
  }
}

fn navigate<V>(args: &args::Args, voice: V) -> Result<()>
where
  V: Speak<Error = VoiceError> + Listen<Error = VoiceError>,
{
  let gazetteer = Gazetteer::from_path(&args.map)?;
  info!("已加载 {} 个目的地", gazetteer.len());

  let location = LocationWrapper::from_url(&args.location)?;
  let cancel = CancelSignal::install_ctrlc()?;

  let destination = match &args.destination {
    Some(name) => resolve_destination(&voice, &gazetteer, name)?,
    None => capture_destination(&voice, &gazetteer, &args.prompt_config())?,
  };

  // 目的地确定后才占用相机与推理设备
  let camera = InputWrapper::from_url(&args.camera)?;
  let detector: DetectorWrapper<CocoLabel> = match &args.detector {
    Some(url) => DetectorWrapper::from_url(url)?,
    None => DetectorWrapper::disabled(),
  };

  let outcome = NavigationTask::new(destination, location, args.guidance_config(), cancel)?
    .run_task(camera, &detector, &voice)?;
  info!("任务完成: {:?}", outcome);

  Ok(())
}
