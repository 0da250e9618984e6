// 该文件是 Koutu （抠图） 项目的一部分。
// src/model.rs - 模型契约与推理数据类型
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

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{CenterBox, PixelBox};

/// 检测器单次 (图像, 描述文本) 调用的原始输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
  /// 每个候选的词元置信度向量，各分量取值 [0, 1]，
  /// 维度由模型决定且在同一结果内固定
  pub logits: Vec<Vec<f32>>,
  /// 与 logits 等长的归一化中心式边界框
  pub boxes: Vec<CenterBox>,
}

#[derive(Error, Debug)]
pub enum DetectionShapeError {
  #[error("候选序列长度不一致: {logits} 个置信度向量, {boxes} 个边界框")]
  LengthMismatch { logits: usize, boxes: usize },
  #[error("置信度向量维度不一致: 期望 {expected}, 第 {index} 个候选为 {found}")]
  DimMismatch {
    expected: usize,
    index: usize,
    found: usize,
  },
}

impl Detection {
  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  /// 校验两个序列等长、且全部置信度向量维度一致
  pub fn validate(&self) -> Result<(), DetectionShapeError> {
    if self.logits.len() != self.boxes.len() {
      return Err(DetectionShapeError::LengthMismatch {
        logits: self.logits.len(),
        boxes: self.boxes.len(),
      });
    }

    if let Some(first) = self.logits.first() {
      let expected = first.len();
      for (index, logits) in self.logits.iter().enumerate() {
        if logits.len() != expected {
          return Err(DetectionShapeError::DimMismatch {
            expected,
            index,
            found: logits.len(),
          });
        }
      }
    }

    Ok(())
  }
}

/// 二值分割掩码，尺寸与原图像素尺寸一致
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
  width: u32,
  height: u32,
  data: Box<[bool]>,
}

impl Mask {
  pub fn new(width: u32, height: u32) -> Self {
    let data = vec![false; (width as usize) * (height as usize)].into_boxed_slice();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn get(&self, x: u32, y: u32) -> bool {
    self.data[(y as usize) * (self.width as usize) + (x as usize)]
  }

  pub fn set(&mut self, x: u32, y: u32, value: bool) {
    self.data[(y as usize) * (self.width as usize) + (x as usize)] = value;
  }

  /// 掩码内为真的像素数量
  pub fn count_ones(&self) -> usize {
    self.data.iter().filter(|&&bit| bit).count()
  }
}

/// 过滤与坐标变换之后、带短语标签的最终框
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedBox {
  /// 绝对像素角点坐标
  pub bbox: PixelBox,
  /// 重建出的短语（可能带置信度后缀）
  pub phrase: String,
  /// 候选置信度（置信度向量最大分量）
  pub score: f32,
}

/// 开放词表检测器：图像 + 描述文本 → 候选框与词元置信度。
/// 模型内部结构与权重加载不在本 crate 职责范围内
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, image: &RgbImage, caption: &str) -> Result<Detection, Self::Error>;
}

/// 可提示分割器：先绑定图像，再按框批量产出掩码
pub trait Segmenter {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 准备该图像的内部缓存；每张图像预测前必须调用一次，
  /// 图像间的缓存状态不得复用
  fn set_image(&mut self, image: &RgbImage) -> Result<(), Self::Error>;

  /// 每个提示框一个掩码，顺序与输入框序列一致
  fn predict(&self, boxes: &[PixelBox]) -> Result<Vec<Mask>, Self::Error>;
}

mod replay;
pub use self::replay::{RectSegmenter, RectSegmenterError, ReplayDetector, ReplayError};
