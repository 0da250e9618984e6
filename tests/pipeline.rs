// 该文件是 Koutu （抠图） 项目的一部分。
// tests/pipeline.rs - 流水线端到端测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::RgbImage;

use koutu::caption::WordAligner;
use koutu::model::{RectSegmenter, ReplayDetector};
use koutu::output::{self, ImageRecord, Overlay};
use koutu::pipeline::{self, Pipeline, PipelineInput, Thresholds};

const DETECTIONS_JSON: &str = r#"[
  {
    "caption": "the black hole on the cable.",
    "logits": [
      [0.0, 0.1, 0.9, 0.0, 0.0, 0.1, 0.0, 0.0],
      [0.0, 0.0, 0.1, 0.0, 0.0, 0.8, 0.0, 0.0]
    ],
    "boxes": [
      { "cx": 0.5, "cy": 0.5, "w": 0.2, "h": 0.2 },
      { "cx": 0.5, "cy": 0.5, "w": 0.9, "h": 0.9 }
    ]
  }
]"#;

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
  let image_path = dir.join("cable.png");
  RgbImage::from_pixel(100, 100, image::Rgb([80, 80, 80]))
    .save(&image_path)
    .unwrap();

  let detections_path = dir.join("detections.json");
  std::fs::write(&detections_path, DETECTIONS_JSON).unwrap();

  (image_path, detections_path)
}

#[test]
fn replayed_detection_produces_overlay_and_record() {
  let dir = tempfile::tempdir().unwrap();
  let (image_path, detections_path) = write_fixtures(dir.path());
  let output_dir = dir.path().join("outputs");

  let detector = ReplayDetector::from_file(&detections_path).unwrap();
  let mut pipeline = Pipeline::new(
    detector,
    RectSegmenter::default(),
    WordAligner,
    Thresholds::default(),
  );

  let inputs = vec![PipelineInput {
    image_path: image_path.clone(),
    category: "cable".to_string(),
    text_prompt: "The black hole on the cable".to_string(),
  }];

  let overlay = Overlay::new();
  let summary = pipeline::run_batch(&mut pipeline, &inputs, &mut |input, result| {
    // 第二个候选的短语复述了类别 "cable"，应只剩一个最终框
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.masks.len(), 1);
    assert_eq!(result.items[0].phrase, "hole(0.90)");

    let canvas = overlay.render(&result.image, &result.masks, &result.items);
    output::save_image(&canvas, &output::overlay_path(&output_dir, &input.image_path))?;

    let record = ImageRecord::new(input, result);
    record.write(&output::record_path(&output_dir, &input.image_path))?;

    Ok(())
  });

  assert_eq!(summary.processed, 1);
  assert_eq!(summary.failed, 0);
  assert_eq!(summary.masks, 1);

  let overlay_file = output_dir.join("koutu_output_cable.png");
  let record_file = output_dir.join("koutu_output_cable.json");
  assert!(overlay_file.exists());
  assert!(record_file.exists());

  // 叠加图尺寸与原图一致
  let saved = image::open(&overlay_file).unwrap();
  assert_eq!(saved.width(), 100);
  assert_eq!(saved.height(), 100);

  // 记录包含最终框与短语
  let record: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&record_file).unwrap()).unwrap();
  assert_eq!(record["category"], "cable");
  assert_eq!(record["caption"], "the black hole on the cable.");
  assert_eq!(record["items"].as_array().unwrap().len(), 1);
  assert_eq!(record["items"][0]["phrase"], "hole(0.90)");
  assert_eq!(record["items"][0]["mask_pixels"], 20 * 20);
}

#[test]
fn missing_replay_caption_fails_the_triple_only() {
  let dir = tempfile::tempdir().unwrap();
  let (image_path, detections_path) = write_fixtures(dir.path());

  let detector = ReplayDetector::from_file(&detections_path).unwrap();
  let mut pipeline = Pipeline::new(
    detector,
    RectSegmenter::default(),
    WordAligner,
    Thresholds::default(),
  );

  let inputs = vec![
    PipelineInput {
      image_path: image_path.clone(),
      category: "cable".to_string(),
      text_prompt: "an unknown prompt".to_string(),
    },
    PipelineInput {
      image_path,
      category: "cable".to_string(),
      text_prompt: "the black hole on the cable".to_string(),
    },
  ];

  let summary = pipeline::run_batch(&mut pipeline, &inputs, &mut |_, _| Ok(()));

  assert_eq!(summary.processed, 1);
  assert_eq!(summary.failed, 1);
}

#[test]
fn category_only_caption_yields_empty_candidate_set() {
  let dir = tempfile::tempdir().unwrap();
  let image_path = dir.path().join("cable.png");
  RgbImage::from_pixel(64, 64, image::Rgb([10, 10, 10]))
    .save(&image_path)
    .unwrap();

  // 描述文本 "cable." 的唯一候选重建出的短语恰为 "cable"
  let detections = r#"[
    {
      "caption": "cable.",
      "logits": [[0.9, 0.0, 0.0, 0.0]],
      "boxes": [{ "cx": 0.5, "cy": 0.5, "w": 0.3, "h": 0.3 }]
    }
  ]"#;
  let detections_path = dir.path().join("detections.json");
  std::fs::write(&detections_path, detections).unwrap();

  let detector = ReplayDetector::from_file(&detections_path).unwrap();
  let mut pipeline = Pipeline::new(
    detector,
    RectSegmenter::default(),
    WordAligner,
    Thresholds::default(),
  );

  let inputs = vec![PipelineInput {
    image_path,
    category: "cable".to_string(),
    text_prompt: "cable".to_string(),
  }];

  let mut rendered = 0usize;
  let summary = pipeline::run_batch(&mut pipeline, &inputs, &mut |_, _| {
    rendered += 1;
    Ok(())
  });

  assert_eq!(summary.processed, 0);
  assert_eq!(summary.failed, 1);
  assert_eq!(rendered, 0);
}
