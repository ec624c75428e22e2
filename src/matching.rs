// 该文件是 Zhilu （指路） 项目的一部分。
// src/matching.rs - 目的地名称模糊匹配
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

//! Ratcliff/Obershelp 相似度：反复取最长公共子串，再对两侧递归，
//! 相似度为 `2 * 匹配字符数 / 两串总长`。

pub const DEFAULT_SIMILARITY_CUTOFF: f64 = 0.5;

/// 两个字符串的相似度，范围 [0, 1]，两者都为空时为 1
pub fn similarity(a: &str, b: &str) -> f64 {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let total = a.len() + b.len();
  if total == 0 {
    return 1.0;
  }
  2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
  let mut matched = 0;
  let mut pending = vec![(0, a.len(), 0, b.len())];

  while let Some((alo, ahi, blo, bhi)) = pending.pop() {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
      continue;
    }
    matched += size;
    if alo < i && blo < j {
      pending.push((alo, i, blo, j));
    }
    if i + size < ahi && j + size < bhi {
      pending.push((i + size, ahi, j + size, bhi));
    }
  }

  matched
}

/// `a[alo..ahi]` 与 `b[blo..bhi]` 的最长公共子串，长度相同时取 `a` 中最靠前、其次 `b` 中最靠前者
fn longest_match(
  a: &[char],
  b: &[char],
  alo: usize,
  ahi: usize,
  blo: usize,
  bhi: usize,
) -> (usize, usize, usize) {
  let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
  // current[j - blo + 1] 为以 a[i]、b[j] 结尾的公共子串长度
  let mut previous = vec![0usize; bhi - blo + 1];
  let mut current = vec![0usize; bhi - blo + 1];

  for i in alo..ahi {
    for j in blo..bhi {
      let k = j - blo + 1;
      if a[i] == b[j] {
        current[k] = previous[k - 1] + 1;
        let size = current[k];
        if size > best_size {
          best_i = i + 1 - size;
          best_j = j + 1 - size;
          best_size = size;
        }
      } else {
        current[k] = 0;
      }
    }
    std::mem::swap(&mut previous, &mut current);
  }

  (best_i, best_j, best_size)
}

/// 在候选中找出相似度不低于 `cutoff` 的最佳匹配；同分时取字典序较大者
pub fn best_match<'a, I>(query: &str, candidates: I, cutoff: f64) -> Option<(&'a str, f64)>
where
  I: IntoIterator<Item = &'a str>,
{
  candidates
    .into_iter()
    .map(|candidate| (candidate, similarity(query, candidate)))
    .filter(|(_, score)| *score >= cutoff)
    .max_by(|(ka, sa), (kb, sb)| sa.total_cmp(sb).then_with(|| ka.cmp(kb)))
}
