// 该文件是 Koutu （抠图） 项目的一部分。
// src/model/replay.rs - 回放检测器与矩形分割器
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

use std::collections::HashMap;
use std::path::Path;

use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::geometry::PixelBox;
use crate::model::{Detection, DetectionShapeError, Detector, Mask, Segmenter};

/// 回放记录文件中的单条检测输出
#[derive(Debug, Deserialize)]
struct ReplayRecord {
  /// 归一化后的描述文本（小写、以句号结尾）
  caption: String,
  #[serde(flatten)]
  detection: Detection,
}

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("无法读取检测记录文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测记录解析失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("检测记录形状无效 (描述 '{caption}'): {source}")]
  InvalidShape {
    caption: String,
    source: DetectionShapeError,
  },
  #[error("检测记录中没有描述文本 '{0}' 的条目")]
  MissingCaption(String),
}

/// 回放检测器：从 JSON 文件加载预先导出的检测输出，按归一化描述文本索引。
/// 真实的开放词表检测模型通过 Detector 契约接入，
/// 回放后端让流水线可以在没有模型权重的环境下确定性地运行。
pub struct ReplayDetector {
  records: HashMap<String, Detection>,
}

impl ReplayDetector {
  pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
    info!("加载检测记录文件: {}", path.display());
    let data = std::fs::read_to_string(path)?;
    Self::from_json(&data)
  }

  pub fn from_json(data: &str) -> Result<Self, ReplayError> {
    let records: Vec<ReplayRecord> = serde_json::from_str(data)?;

    let mut map = HashMap::with_capacity(records.len());
    for record in records {
      record
        .detection
        .validate()
        .map_err(|source| ReplayError::InvalidShape {
          caption: record.caption.clone(),
          source,
        })?;
      debug!(
        "检测记录: '{}' 共 {} 个候选",
        record.caption,
        record.detection.len()
      );
      map.insert(record.caption, record.detection);
    }

    Ok(ReplayDetector { records: map })
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl Detector for ReplayDetector {
  type Error = ReplayError;

  fn detect(&self, _image: &RgbImage, caption: &str) -> Result<Detection, Self::Error> {
    self
      .records
      .get(caption)
      .cloned()
      .ok_or_else(|| ReplayError::MissingCaption(caption.to_string()))
  }
}

#[derive(Error, Debug)]
pub enum RectSegmenterError {
  #[error("尚未绑定图像，无法预测掩码")]
  ImageNotSet,
  #[error("提示框批量为空")]
  EmptyBatch,
}

/// 矩形分割器：掩码即提示框内部（裁剪到图像边界）。
/// 用于演示与流程验证；真实的可提示分割模型通过 Segmenter 契约接入
#[derive(Debug, Default)]
pub struct RectSegmenter {
  size: Option<(u32, u32)>,
}

impl Segmenter for RectSegmenter {
  type Error = RectSegmenterError;

  fn set_image(&mut self, image: &RgbImage) -> Result<(), Self::Error> {
    // 每张图像重新绑定，不跨图像保留状态
    self.size = Some(image.dimensions());
    Ok(())
  }

  fn predict(&self, boxes: &[PixelBox]) -> Result<Vec<Mask>, Self::Error> {
    let (width, height) = self.size.ok_or(RectSegmenterError::ImageNotSet)?;

    if boxes.is_empty() {
      return Err(RectSegmenterError::EmptyBatch);
    }

    let mut masks = Vec::with_capacity(boxes.len());
    for bbox in boxes {
      let mut mask = Mask::new(width, height);

      let x0 = bbox.x0.max(0.0).floor() as u32;
      let y0 = bbox.y0.max(0.0).floor() as u32;
      let x1 = (bbox.x1.ceil() as i64).clamp(0, width as i64) as u32;
      let y1 = (bbox.y1.ceil() as i64).clamp(0, height as i64) as u32;

      for y in y0..y1 {
        for x in x0..x1 {
          mask.set(x, y, true);
        }
      }

      masks.push(mask);
    }

    Ok(masks)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RECORD_JSON: &str = r#"[
    {
      "caption": "the black hole on the cable.",
      "logits": [[0.1, 0.9, 0.2], [0.05, 0.02, 0.01]],
      "boxes": [
        { "cx": 0.5, "cy": 0.5, "w": 0.1, "h": 0.1 },
        { "cx": 0.5, "cy": 0.5, "w": 0.9, "h": 0.9 }
      ]
    }
  ]"#;

  #[test]
  fn loads_records_keyed_by_caption() {
    let detector = ReplayDetector::from_json(RECORD_JSON).unwrap();
    assert_eq!(detector.len(), 1);

    let image = RgbImage::new(4, 4);
    let detection = detector
      .detect(&image, "the black hole on the cable.")
      .unwrap();
    assert_eq!(detection.len(), 2);
  }

  #[test]
  fn unknown_caption_is_an_error() {
    let detector = ReplayDetector::from_json(RECORD_JSON).unwrap();
    let image = RgbImage::new(4, 4);

    assert!(matches!(
      detector.detect(&image, "something else."),
      Err(ReplayError::MissingCaption(_))
    ));
  }

  #[test]
  fn malformed_record_shape_is_rejected() {
    let json = r#"[
      {
        "caption": "cable.",
        "logits": [[0.1, 0.9]],
        "boxes": []
      }
    ]"#;
    assert!(matches!(
      ReplayDetector::from_json(json),
      Err(ReplayError::InvalidShape { .. })
    ));
  }

  #[test]
  fn rect_segmenter_fills_box_interior() {
    let mut segmenter = RectSegmenter::default();
    segmenter.set_image(&RgbImage::new(10, 10)).unwrap();

    let masks = segmenter
      .predict(&[PixelBox {
        x0: 2.0,
        y0: 3.0,
        x1: 5.0,
        y1: 6.0,
      }])
      .unwrap();

    assert_eq!(masks.len(), 1);
    assert!(masks[0].get(2, 3));
    assert!(masks[0].get(4, 5));
    assert!(!masks[0].get(5, 6));
    assert_eq!(masks[0].count_ones(), 9);
  }

  #[test]
  fn rect_segmenter_clamps_to_image_bounds() {
    let mut segmenter = RectSegmenter::default();
    segmenter.set_image(&RgbImage::new(8, 8)).unwrap();

    let masks = segmenter
      .predict(&[PixelBox {
        x0: -4.0,
        y0: -4.0,
        x1: 20.0,
        y1: 20.0,
      }])
      .unwrap();

    assert_eq!(masks[0].count_ones(), 64);
  }

  #[test]
  fn predict_without_image_fails() {
    let segmenter = RectSegmenter::default();
    assert!(matches!(
      segmenter.predict(&[PixelBox {
        x0: 0.0,
        y0: 0.0,
        x1: 1.0,
        y1: 1.0,
      }]),
      Err(RectSegmenterError::ImageNotSet)
    ));
  }

  #[test]
  fn empty_prompt_batch_fails() {
    let mut segmenter = RectSegmenter::default();
    segmenter.set_image(&RgbImage::new(4, 4)).unwrap();
    assert!(matches!(
      segmenter.predict(&[]),
      Err(RectSegmenterError::EmptyBatch)
    ));
  }
}
