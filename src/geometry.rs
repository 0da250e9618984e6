// 该文件是 Koutu （抠图） 项目的一部分。
// src/geometry.rs - 边界框坐标表示与变换
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

use serde::{Deserialize, Serialize};

/// 中心式归一化边界框 (cx, cy, w, h)，各分量取值 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterBox {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
}

impl CenterBox {
  /// 归一化面积 w * h
  pub fn area(&self) -> f32 {
    self.w * self.h
  }

  /// 展开为目标图像尺寸下的绝对像素角点坐标。
  /// 先缩放到像素单位，再由中心式转为角点式。
  pub fn to_pixel_corners(&self, width: u32, height: u32) -> PixelBox {
    let (image_w, image_h) = (width as f32, height as f32);

    let cx = self.cx * image_w;
    let cy = self.cy * image_h;
    let w = self.w * image_w;
    let h = self.h * image_h;

    let x0 = cx - w / 2.0;
    let y0 = cy - h / 2.0;

    PixelBox {
      x0,
      y0,
      x1: x0 + w,
      y1: y0 + h,
    }
  }
}

/// 角点式像素边界框 (x0, y0, x1, y1)，满足 x0 < x1, y0 < y1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
  pub x0: f32,
  pub y0: f32,
  pub x1: f32,
  pub y1: f32,
}

impl PixelBox {
  pub fn width(&self) -> f32 {
    self.x1 - self.x0
  }

  pub fn height(&self) -> f32 {
    self.y1 - self.y0
  }

  /// 逆变换：角点式像素坐标还原为中心式归一化坐标
  pub fn to_center_norm(&self, width: u32, height: u32) -> CenterBox {
    let (image_w, image_h) = (width as f32, height as f32);

    let w = self.width();
    let h = self.height();

    CenterBox {
      cx: (self.x0 + w / 2.0) / image_w,
      cy: (self.y0 + h / 2.0) / image_h,
      w: w / image_w,
      h: h / image_h,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expands_center_box_to_pixel_corners() {
    // 100x200 (W x H) 图像上的 (0.5, 0.5, 0.2, 0.1)
    let bbox = CenterBox {
      cx: 0.5,
      cy: 0.5,
      w: 0.2,
      h: 0.1,
    };

    let pixel = bbox.to_pixel_corners(100, 200);

    assert_eq!(pixel.x0, 40.0);
    assert_eq!(pixel.y0, 95.0);
    assert_eq!(pixel.x1, 60.0);
    assert_eq!(pixel.y1, 105.0);
  }

  #[test]
  fn pixel_corner_round_trip_preserves_center_box() {
    let bbox = CenterBox {
      cx: 0.37,
      cy: 0.62,
      w: 0.11,
      h: 0.43,
    };

    let back = bbox.to_pixel_corners(1280, 719).to_center_norm(1280, 719);

    assert!((back.cx - bbox.cx).abs() < 1e-5);
    assert!((back.cy - bbox.cy).abs() < 1e-5);
    assert!((back.w - bbox.w).abs() < 1e-5);
    assert!((back.h - bbox.h).abs() < 1e-5);
  }

  #[test]
  fn area_is_width_times_height() {
    let bbox = CenterBox {
      cx: 0.5,
      cy: 0.5,
      w: 0.95,
      h: 0.95,
    };
    assert!((bbox.area() - 0.9025).abs() < 1e-6);
  }
}
