// 该文件是 Zhilu （指路） 项目的一部分。
// src/bin/simple_resolve.rs - 在地图中查找目的地
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhilu::{
  gazetteer::Gazetteer,
  geodesy::{self, GeoPoint},
  matching::DEFAULT_SIMILARITY_CUTOFF,
};

/// 将名称（允许口误）匹配到地图中的目的地
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 目的地地图（GeoJSON FeatureCollection）
  #[arg(long, value_name = "FILE")]
  pub map: PathBuf,

  /// 最低相似度
  #[arg(long, default_value_t = DEFAULT_SIMILARITY_CUTOFF, value_name = "RATIO")]
  pub cutoff: f64,

  /// 以 `纬度,经度` 给出当前位置时，同时输出方位角与距离
  #[arg(long, value_name = "LAT,LON")]
  pub from: Option<String>,

  /// 列出全部目的地
  #[arg(long)]
  pub list: bool,

  /// 要查找的名称
  #[arg(value_name = "NAME", required_unless_present = "list")]
  pub name: Option<String>,
}

fn parse_point(text: &str) -> Result<GeoPoint> {
  let (lat, lon) = text
    .split_once(',')
    .ok_or_else(|| anyhow::anyhow!("位置格式应为 纬度,经度"))?;
  Ok(GeoPoint::new(lat.trim().parse()?, lon.trim().parse()?)?)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let gazetteer = Gazetteer::from_path(&args.map)?;
  info!("已加载 {} 个目的地", gazetteer.len());

  if args.list {
    for name in gazetteer.names() {
      println!("{}", name);
    }
  }

  let Some(name) = &args.name else {
    return Ok(());
  };
  let destination = gazetteer.resolve(name, args.cutoff)?;
  println!("{}\t{}", destination.name, destination.location);

  if let Some(from) = &args.from {
    let from = parse_point(from)?;
    println!(
      "方位角 {:.1}°\t距离 {:.1} 米",
      geodesy::bearing(from, destination.location),
      geodesy::distance(from, destination.location)
    );
  }

  Ok(())
}
