// 该文件是 Koutu （抠图） 项目的一部分。
// src/input.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageLoadError {
  #[error("无法打开图像 {path}: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("无法解码图像 {path}: {source}")]
  Decode {
    path: PathBuf,
    source: image::ImageError,
  },
}

/// 读取图像文件并转换为三通道 RGB
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, ImageLoadError> {
  let reader = ImageReader::open(path).map_err(|source| ImageLoadError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let image = reader.decode().map_err(|source| ImageLoadError::Decode {
    path: path.to_path_buf(),
    source,
  })?;

  debug!(
    "读取图像 {}: {}x{}",
    path.display(),
    image.width(),
    image.height()
  );

  Ok(image.into())
}
