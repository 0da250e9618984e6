// 该文件是 Koutu （抠图） 项目的一部分。
// src/filter.rs - 候选框置信度与面积过滤
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::cmp::Ordering;

use tracing::debug;

use crate::geometry::CenterBox;
use crate::model::Detection;

/// 通过两级阈值筛选后的候选，保留完整的置信度向量供短语重建使用
#[derive(Debug, Clone)]
pub struct FilteredCandidate {
  pub logits: Vec<f32>,
  pub bbox: CenterBox,
}

impl FilteredCandidate {
  /// 候选置信度 = 置信度向量各分量的最大值
  pub fn score(&self) -> f32 {
    max_component(&self.logits)
  }
}

fn max_component(logits: &[f32]) -> f32 {
  logits.iter().copied().fold(f32::MIN, f32::max)
}

/// 置信度 + 面积两级过滤。
/// 候选保留条件: score > box_threshold 且 area < area_threshold；
/// 若全部落选，回退为全局最高分的单个候选（不再检查阈值），
/// 因此只要输入非空，输出必定非空。
pub fn filter_candidates(
  detection: &Detection,
  box_threshold: f32,
  area_threshold: f32,
) -> Vec<FilteredCandidate> {
  let mut survivors = Vec::new();

  for (logits, bbox) in detection.logits.iter().zip(&detection.boxes) {
    let score = max_component(logits);
    if score > box_threshold && bbox.area() < area_threshold {
      survivors.push(FilteredCandidate {
        logits: logits.clone(),
        bbox: *bbox,
      });
    }
  }

  if survivors.is_empty() {
    // 没有任何候选同时满足两个阈值时的回退
    let best = detection
      .logits
      .iter()
      .zip(&detection.boxes)
      .max_by(|(a, _), (b, _)| {
        max_component(a)
          .partial_cmp(&max_component(b))
          .unwrap_or(Ordering::Equal)
      });

    if let Some((logits, bbox)) = best {
      debug!("所有候选均未通过阈值，回退为最高分候选");
      survivors.push(FilteredCandidate {
        logits: logits.clone(),
        bbox: *bbox,
      });
    }
  }

  survivors
}
