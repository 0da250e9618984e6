// 该文件是 Koutu （抠图） 项目的一部分。
// src/output.rs - 输出模块：产物路径与图像保存
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

mod draw;
mod record;

pub use draw::Overlay;
pub use record::{ImageRecord, ItemRecord};

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("字体加载失败: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
}

/// 保存图像，必要时创建父目录
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), OutputError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  image.save(path)?;

  warn!("保存图像到文件: {}", path.display());

  Ok(())
}

fn file_stem(image_path: &Path) -> String {
  image_path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_else(|| "output".to_string())
}

/// 输入图像对应的叠加图产物路径，每张输入图像唯一
pub fn overlay_path(output_dir: &Path, image_path: &Path) -> PathBuf {
  output_dir.join(format!("koutu_output_{}.png", file_stem(image_path)))
}

/// 输入图像对应的机器可读记录路径
pub fn record_path(output_dir: &Path, image_path: &Path) -> PathBuf {
  output_dir.join(format!("koutu_output_{}.json", file_stem(image_path)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn artifact_paths_follow_input_stem() {
    let dir = Path::new("outputs");
    let image = Path::new("data/cable.jpg");

    assert_eq!(
      overlay_path(dir, image),
      PathBuf::from("outputs/koutu_output_cable.png")
    );
    assert_eq!(
      record_path(dir, image),
      PathBuf::from("outputs/koutu_output_cable.json")
    );
  }

  #[test]
  fn save_image_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/out.png");

    let image = RgbImage::new(4, 4);
    save_image(&image, &path).unwrap();

    assert!(path.exists());
  }
}
