// 该文件是 Koutu （抠图） 项目的一部分。
// src/pipeline.rs - 检测-分割流水线编排
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::caption::{self, CaptionAligner};
use crate::filter;
use crate::input::{self, ImageLoadError};
use crate::model::{AnnotatedBox, Detector, Mask, Segmenter};

pub const DEFAULT_BOX_THRESHOLD: f32 = 0.2;
pub const DEFAULT_TEXT_THRESHOLD: f32 = 0.2;
pub const DEFAULT_AREA_THRESHOLD: f32 = 0.9;

/// 流水线的三个过滤阈值。
/// 候选框阈值与词元阈值相互独立，不做别名处理
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
  pub box_threshold: f32,
  pub text_threshold: f32,
  pub area_threshold: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Thresholds {
      box_threshold: DEFAULT_BOX_THRESHOLD,
      text_threshold: DEFAULT_TEXT_THRESHOLD,
      area_threshold: DEFAULT_AREA_THRESHOLD,
    }
  }
}

/// 一次待处理的 (图像, 类别, 描述文本) 三元组
#[derive(Debug, Clone)]
pub struct PipelineInput {
  pub image_path: PathBuf,
  pub category: String,
  pub text_prompt: String,
}

/// 单个三元组的处理产物。
/// masks 与 items 按下标一一对应
#[derive(Debug)]
pub struct PipelineOutput {
  pub image: RgbImage,
  pub caption: String,
  pub items: Box<[AnnotatedBox]>,
  pub masks: Box<[Mask]>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("图像加载失败: {0}")]
  ImageLoad(#[from] ImageLoadError),
  #[error("没有与描述匹配的候选区域: 描述 '{caption}', 类别 '{category}'")]
  EmptyCandidateSet { caption: String, category: String },
  #[error("推理失败: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 检测-过滤-分割流水线。
/// 检测器与分割器句柄加载一次后只读共享，流水线自身只保存
/// 分割器的逐图像缓存状态
pub struct Pipeline<D, S, A> {
  detector: D,
  segmenter: S,
  aligner: A,
  thresholds: Thresholds,
  with_scores: bool,
}

impl<D, S, A> Pipeline<D, S, A>
where
  D: Detector,
  S: Segmenter,
  A: CaptionAligner,
{
  pub fn new(detector: D, segmenter: S, aligner: A, thresholds: Thresholds) -> Self {
    Pipeline {
      detector,
      segmenter,
      aligner,
      thresholds,
      with_scores: true,
    }
  }

  /// 是否在短语标签后附加置信度，如 "hole(0.42)"
  pub fn with_scores(mut self, with_scores: bool) -> Self {
    self.with_scores = with_scores;
    self
  }

  /// 处理单个三元组：加载 → 检测 → 过滤 → 坐标变换 → 分割。
  /// 任一阶段失败只使该三元组失败，调用方决定是否继续后续三元组
  pub fn run_one(&mut self, input: &PipelineInput) -> Result<PipelineOutput, PipelineError> {
    // 加载
    let image = input::load_rgb_image(&input.image_path)?;
    let (width, height) = image.dimensions();

    // 检测
    let caption = caption::normalize_caption(&input.text_prompt);
    debug!("归一化描述文本: '{}'", caption);
    let detection = self
      .detector
      .detect(&image, &caption)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;
    debug!("检测到 {} 个原始候选", detection.len());

    // 过滤: 置信度 + 面积
    let candidates = filter::filter_candidates(
      &detection,
      self.thresholds.box_threshold,
      self.thresholds.area_threshold,
    );
    debug!("阈值过滤后剩余 {} 个候选", candidates.len());

    // 过滤: 短语重建并剔除复述类别的候选，
    // 框序列与短语序列在剔除后保持下标对齐
    let alignment = self.aligner.align(&caption);
    let mut items = Vec::new();
    let mut boxes = Vec::new();

    for candidate in &candidates {
      let phrase = caption::extract_phrase(
        &candidate.logits,
        self.thresholds.text_threshold,
        &caption,
        &alignment,
      );

      if caption::restates_category(&phrase, &input.category) {
        debug!("剔除复述类别 '{}' 的短语: '{}'", input.category, phrase);
        continue;
      }

      let score = candidate.score();
      let label = if self.with_scores {
        caption::score_label(&phrase, score)
      } else {
        phrase
      };

      // 坐标变换: 归一化中心式 → 绝对像素角点式
      let bbox = candidate.bbox.to_pixel_corners(width, height);
      boxes.push(bbox);
      items.push(AnnotatedBox {
        bbox,
        phrase: label,
        score,
      });
    }

    if items.is_empty() {
      return Err(PipelineError::EmptyCandidateSet {
        caption,
        category: input.category.clone(),
      });
    }

    // 分割: 每张图像重新绑定分割器缓存，再按框批量出掩码
    self
      .segmenter
      .set_image(&image)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;
    let masks = self
      .segmenter
      .predict(&boxes)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;

    info!(
      "图像 {} 得到 {} 个掩码",
      input.image_path.display(),
      masks.len()
    );
    if masks.iter().all(|mask| mask.count_ones() == 0) {
      warn!("全部掩码为空: {}", input.image_path.display());
    }

    Ok(PipelineOutput {
      image,
      caption,
      items: items.into_boxed_slice(),
      masks: masks.into_boxed_slice(),
    })
  }
}

/// 一次批量运行的统计
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
  pub processed: usize,
  pub failed: usize,
  pub masks: usize,
}

/// 顺序处理全部三元组，每个三元组经 render 落盘。
/// 单个三元组失败只记录日志并计数，不影响后续三元组
pub fn run_batch<D, S, A, R>(
  pipeline: &mut Pipeline<D, S, A>,
  inputs: &[PipelineInput],
  render: &mut R,
) -> RunSummary
where
  D: Detector,
  S: Segmenter,
  A: CaptionAligner,
  R: FnMut(&PipelineInput, &PipelineOutput) -> anyhow::Result<()>,
{
  let mut summary = RunSummary::default();

  for input in inputs {
    info!(
      "处理图像: {} (类别 '{}', 描述 '{}')",
      input.image_path.display(),
      input.category,
      input.text_prompt
    );

    match pipeline.run_one(input) {
      Ok(output) => match render(input, &output) {
        Ok(()) => {
          summary.processed += 1;
          summary.masks += output.masks.len();
        }
        Err(e) => {
          error!("渲染失败: {} (图像 {})", e, input.image_path.display());
          summary.failed += 1;
        }
      },
      Err(e) => {
        error!(
          "三元组处理失败: {} (图像 {}, 描述 '{}')",
          e,
          input.image_path.display(),
          input.text_prompt
        );
        summary.failed += 1;
      }
    }
  }

  summary
}
