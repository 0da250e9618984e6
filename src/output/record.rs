// 该文件是 Koutu （抠图） 项目的一部分。
// src/output/record.rs - 最终框与短语的机器可读记录
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

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::model::AnnotatedBox;
use crate::output::OutputError;
use crate::pipeline::{PipelineInput, PipelineOutput};

/// 单张图像的处理记录：最终框、短语与置信度，
/// 以及对应掩码的像素计数（掩码本体不落盘）
#[derive(Debug, Serialize)]
pub struct ImageRecord {
  pub image: String,
  pub category: String,
  pub caption: String,
  pub generated_at: String,
  pub items: Vec<ItemRecord>,
}

#[derive(Debug, Serialize)]
pub struct ItemRecord {
  #[serde(flatten)]
  pub annotated: AnnotatedBox,
  pub mask_pixels: usize,
}

impl ImageRecord {
  pub fn new(input: &PipelineInput, output: &PipelineOutput) -> Self {
    let items = output
      .items
      .iter()
      .zip(output.masks.iter())
      .map(|(annotated, mask)| ItemRecord {
        annotated: annotated.clone(),
        mask_pixels: mask.count_ones(),
      })
      .collect();

    ImageRecord {
      image: input.image_path.display().to_string(),
      category: input.category.clone(),
      caption: output.caption.clone(),
      generated_at: Utc::now().to_rfc3339(),
      items,
    }
  }

  /// 记录写入 JSON 文件，必要时创建父目录
  pub fn write(&self, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(self)?;
    std::fs::write(path, data)?;

    Ok(())
  }
}
