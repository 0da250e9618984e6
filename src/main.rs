// 该文件是 Koutu （抠图） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use koutu::caption::WordAligner;
use koutu::model::{RectSegmenter, ReplayDetector};
use koutu::output::{self, ImageRecord, Overlay};
use koutu::pipeline::{self, Pipeline, Thresholds};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  // 运行级校验失败在处理任何三元组之前中止
  args.validate()?;

  info!("检测记录文件: {}", args.detections.display());
  info!("输出目录: {}", args.output_dir.display());
  info!("候选框阈值: {}", args.box_threshold);
  info!("词元阈值: {}", args.text_threshold);
  info!("面积阈值: {}", args.area_threshold);

  let detector = ReplayDetector::from_file(&args.detections)?;
  info!("检测记录加载完成, 共 {} 条", detector.len());

  let segmenter = RectSegmenter::default();

  let thresholds = Thresholds {
    box_threshold: args.box_threshold,
    text_threshold: args.text_threshold,
    area_threshold: args.area_threshold,
  };
  let mut pipeline = Pipeline::new(detector, segmenter, WordAligner, thresholds)
    .with_scores(!args.plain_labels);

  let overlay = match &args.font {
    Some(path) => Overlay::with_font_file(path)?,
    None => {
      warn!("未提供字体文件，标签文本不会绘制");
      Overlay::new()
    }
  };

  std::fs::create_dir_all(&args.output_dir)?;

  // 保存首张原始输入图像副本
  if let Some(first) = args.input_images.first() {
    match koutu::input::load_rgb_image(first) {
      Ok(raw) => output::save_image(&raw, &args.output_dir.join("raw_image.jpg"))?,
      Err(e) => warn!("无法保存原始图像副本: {}", e),
    }
  }

  let inputs = args.inputs();
  let output_dir = args.output_dir.clone();

  let summary = pipeline::run_batch(&mut pipeline, &inputs, &mut |input, result| {
    let canvas = overlay.render(&result.image, &result.masks, &result.items);
    output::save_image(&canvas, &output::overlay_path(&output_dir, &input.image_path))?;

    let record = ImageRecord::new(input, result);
    record.write(&output::record_path(&output_dir, &input.image_path))?;

    Ok(())
  });

  info!(
    "处理完成: 成功 {} 个, 失败 {} 个, 掩码共 {} 个",
    summary.processed, summary.failed, summary.masks
  );

  Ok(())
}
