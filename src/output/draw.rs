// 该文件是 Koutu （抠图） 项目的一部分。
// src/output/draw.rs - 掩码与检测框叠加绘制
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rand::Rng;
use tracing::debug;

use crate::geometry::PixelBox;
use crate::model::{AnnotatedBox, Mask};
use crate::output::OutputError;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 200, 0]; // 绿色边框
const MASK_ALPHA: f32 = 0.6;
const MASK_SATURATION: f32 = 0.8;
const MASK_VALUE: f32 = 0.9;

/// 叠加图绘制工具：半透明掩码 + 检测框 + 短语标签。
/// 未提供字体时只画框不写字
pub struct Overlay {
  font: Option<FontVec>,
  font_scale: PxScale,
  box_color: Rgb<u8>,
}

impl Default for Overlay {
  fn default() -> Self {
    Self::new()
  }
}

impl Overlay {
  pub fn new() -> Self {
    Overlay {
      font: None,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      box_color: Rgb(BOX_COLOR),
    }
  }

  /// 从字体文件加载标签字体
  pub fn with_font_file(path: &Path) -> Result<Self, OutputError> {
    let data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(data)?;
    debug!("标签字体加载完成: {}", path.display());

    Ok(Overlay {
      font: Some(font),
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      box_color: Rgb(BOX_COLOR),
    })
  }

  /// HSV 转 RGB
  fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
      (c, x, 0.0)
    } else if h < 120.0 {
      (x, c, 0.0)
    } else if h < 180.0 {
      (0.0, c, x)
    } else if h < 240.0 {
      (0.0, x, c)
    } else if h < 300.0 {
      (x, 0.0, c)
    } else {
      (c, 0.0, x)
    };

    Rgb([
      ((r + m) * 255.0) as u8,
      ((g + m) * 255.0) as u8,
      ((b + m) * 255.0) as u8,
    ])
  }

  /// 每个掩码一个独立随机色相
  fn random_mask_color<R: Rng>(rng: &mut R) -> Rgb<u8> {
    let hue = rng.gen_range(0.0..360.0);
    Self::hsv_to_rgb(hue, MASK_SATURATION, MASK_VALUE)
  }

  /// 半透明混合掩码区域
  fn blend_mask(canvas: &mut RgbImage, mask: &Mask, color: Rgb<u8>) {
    let width = canvas.width().min(mask.width());
    let height = canvas.height().min(mask.height());

    for y in 0..height {
      for x in 0..width {
        if !mask.get(x, y) {
          continue;
        }
        let pixel = canvas.get_pixel_mut(x, y);
        for channel in 0..3 {
          let base = pixel[channel] as f32;
          let tint = color[channel] as f32;
          pixel[channel] = (base * (1.0 - MASK_ALPHA) + tint * MASK_ALPHA) as u8;
        }
      }
    }
  }

  /// 绘制检测框（双层边框增加可见度）与短语标签
  fn draw_bbox_with_label(&self, canvas: &mut RgbImage, bbox: &PixelBox, label: &str) {
    let (image_w, image_h) = (canvas.width() as i32, canvas.height() as i32);

    let x_min = (bbox.x0.floor() as i32).clamp(0, image_w - 1);
    let y_min = (bbox.y0.floor() as i32).clamp(0, image_h - 1);
    let x_max = (bbox.x1.ceil() as i32).clamp(0, image_w - 1);
    let y_max = (bbox.y1.ceil() as i32).clamp(0, image_h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let width = (x_max - x_min) as u32;
    let height = (y_max - y_min) as u32;

    let rect = Rect::at(x_min, y_min).of_size(width, height);
    draw_hollow_rect_mut(canvas, rect, self.box_color);

    if width > 2 && height > 2 {
      let inner_rect =
        Rect::at(x_min + 1, y_min + 1).of_size(width.saturating_sub(2), height.saturating_sub(2));
      draw_hollow_rect_mut(canvas, inner_rect, self.box_color);
    }

    let Some(font) = &self.font else {
      return;
    };

    // 估算文本大小（粗略估计）
    let text_width = (label.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32;
    let text_height = LABEL_TEXT_HEIGHT;

    // 标签背景放在边框上方
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    // 确保标签不超出图像边界
    let max_width = (image_w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(canvas, rect, self.box_color);

      let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本
      draw_text_mut(
        canvas,
        text_color,
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        self.font_scale,
        font,
        label,
      );
    }
  }

  /// 合成叠加图：原图 + 全部掩码（各自独立随机半透明色）
  /// + 全部检测框与短语标签
  pub fn render(&self, image: &RgbImage, masks: &[Mask], items: &[AnnotatedBox]) -> RgbImage {
    let mut canvas = image.clone();
    let mut rng = rand::thread_rng();

    for mask in masks {
      let color = Self::random_mask_color(&mut rng);
      Self::blend_mask(&mut canvas, mask, color);
    }

    for item in items {
      self.draw_bbox_with_label(&mut canvas, &item.bbox, &item.phrase);
    }

    canvas
  }
}
