// 该文件是 Zhilu （指路） 项目的一部分。
// src/direction.rs - 行进方向判定
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

use crate::geodesy::{GeoPoint, bearing};

/// 播报给用户的行进指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
  Forward,
  TurnRight,
  Backward,
  TurnLeft,
  Calculating,
  Recalculating,
}

impl Instruction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Instruction::Forward => "Move Forward",
      Instruction::TurnRight => "Turn Right",
      Instruction::Backward => "Move Backward",
      Instruction::TurnLeft => "Turn Left",
      Instruction::Calculating => "Calculating route...",
      Instruction::Recalculating => "Recalculating...",
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 按目标方位与实际移动方位的夹角分类，夹角按顺时针计，范围 [0, 360)。
///
/// 各区间按顺序判断且互不重叠，只有 NaN 会落到 `Recalculating`。
pub fn classify(delta: f64) -> Instruction {
  if (0.0..30.0).contains(&delta) || (delta > 330.0 && delta < 360.0) {
    Instruction::Forward
  } else if (30.0..150.0).contains(&delta) {
    Instruction::TurnRight
  } else if (150.0..210.0).contains(&delta) {
    Instruction::Backward
  } else if (210.0..=330.0).contains(&delta) {
    Instruction::TurnLeft
  } else {
    Instruction::Recalculating
  }
}

/// 由上一次定位、当前定位和目标点得出行进指令。
///
/// 没有罗盘，用户的朝向由最近一次位移近似；任一位置缺失时返回 `Calculating`。
pub fn decide(
  previous: Option<GeoPoint>,
  current: Option<GeoPoint>,
  target: GeoPoint,
) -> Instruction {
  let (Some(previous), Some(current)) = (previous, current) else {
    return Instruction::Calculating;
  };

  let bearing_to_target = bearing(current, target);
  let movement_bearing = bearing(previous, current);
  let delta = (bearing_to_target - movement_bearing + 360.0) % 360.0;

  classify(delta)
}
