// 该文件是 Koutu （抠图） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use koutu::pipeline::PipelineInput;

/// Koutu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像路径（可多个，与类别、描述文本按位置一一对应）
  #[arg(long = "input-image", value_name = "FILE", required = true, num_args = 1..)]
  pub input_images: Vec<PathBuf>,

  /// 检视的类别名称（只复述类别的短语会被剔除）
  #[arg(long, value_name = "NAME", required = true, num_args = 1..)]
  pub category: Vec<String>,

  /// 区域描述文本
  #[arg(long = "text-prompt", value_name = "TEXT", required = true, num_args = 1..)]
  pub text_prompts: Vec<String>,

  /// 检测回放记录文件（按归一化描述文本索引的检测输出 JSON）
  #[arg(long, value_name = "FILE")]
  pub detections: PathBuf,

  /// 输出目录
  #[arg(long, short = 'o', default_value = "outputs", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 候选框置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub box_threshold: f32,

  /// 词元置信度阈值 (0.0 - 1.0)，与候选框阈值相互独立
  #[arg(long, default_value = "0.2", value_name = "THRESHOLD")]
  pub text_threshold: f32,

  /// 候选框归一化面积上限 (0.0 - 1.0]
  #[arg(long, default_value = "0.9", value_name = "THRESHOLD")]
  pub area_threshold: f32,

  /// 标签字体文件路径（缺省时只画框不写标签文本）
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 短语标签不附加置信度后缀
  #[arg(long)]
  pub plain_labels: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("图像、类别与描述文本数量不一致: {images} / {categories} / {prompts}")]
  LengthMismatch {
    images: usize,
    categories: usize,
    prompts: usize,
  },
  #[error("找不到输入文件: {0}")]
  MissingFile(PathBuf),
}

impl Args {
  /// 运行级校验：序列长度一致、输入文件存在。
  /// 校验失败属于调用方式错误，在处理任何三元组之前中止整个运行
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.input_images.len() != self.category.len()
      || self.input_images.len() != self.text_prompts.len()
    {
      return Err(ConfigError::LengthMismatch {
        images: self.input_images.len(),
        categories: self.category.len(),
        prompts: self.text_prompts.len(),
      });
    }

    for path in &self.input_images {
      if !path.exists() {
        return Err(ConfigError::MissingFile(path.clone()));
      }
    }

    if !self.detections.exists() {
      return Err(ConfigError::MissingFile(self.detections.clone()));
    }

    if let Some(font) = &self.font
      && !font.exists()
    {
      return Err(ConfigError::MissingFile(font.clone()));
    }

    Ok(())
  }

  /// 按位置配对为流水线三元组
  pub fn inputs(&self) -> Vec<PipelineInput> {
    self
      .input_images
      .iter()
      .zip(&self.category)
      .zip(&self.text_prompts)
      .map(|((image_path, category), text_prompt)| PipelineInput {
        image_path: image_path.clone(),
        category: category.clone(),
        text_prompt: text_prompt.clone(),
      })
      .collect()
  }
}
