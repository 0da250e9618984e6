// 该文件是 Koutu （抠图） 项目的一部分。
// src/caption.rs - 描述文本归一化、词元对齐与短语重建
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 检测器调用前的描述文本归一化：小写、去首尾空白、补句号
pub fn normalize_caption(raw: &str) -> String {
  let mut caption = raw.trim().to_lowercase();
  if !caption.ends_with('.') {
    caption.push('.');
  }
  caption
}

/// 单个词元对应的原文字节区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
  pub start: usize,
  pub end: usize,
}

/// 描述文本到词元位置的对齐关系。
/// 置信度向量中超出词元数量的位置视为填充位，不参与短语重建。
#[derive(Debug, Clone, Default)]
pub struct TokenAlignment {
  pub spans: Vec<TokenSpan>,
}

impl TokenAlignment {
  pub fn len(&self) -> usize {
    self.spans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  /// 第 index 个词元对应的原文片段
  pub fn slice<'a>(&self, caption: &'a str, index: usize) -> Option<&'a str> {
    self
      .spans
      .get(index)
      .map(|span| &caption[span.start..span.end])
  }
}

/// 词元对齐器：外部分词器的窄接口，
/// 负责把描述文本切成与检测器置信度向量位置对应的词元序列
pub trait CaptionAligner {
  fn align(&self, caption: &str) -> TokenAlignment;
}

/// 按单词与标点切分的简单对齐器：
/// 连续的字母数字作为一个词元，其余非空白字符各自成词元
#[derive(Debug, Clone, Copy, Default)]
pub struct WordAligner;

impl CaptionAligner for WordAligner {
  fn align(&self, caption: &str) -> TokenAlignment {
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;

    for (index, ch) in caption.char_indices() {
      if ch.is_alphanumeric() {
        if word_start.is_none() {
          word_start = Some(index);
        }
      } else {
        if let Some(start) = word_start.take() {
          spans.push(TokenSpan { start, end: index });
        }
        if !ch.is_whitespace() {
          spans.push(TokenSpan {
            start: index,
            end: index + ch.len_utf8(),
          });
        }
      }
    }

    if let Some(start) = word_start {
      spans.push(TokenSpan {
        start,
        end: caption.len(),
      });
    }

    TokenAlignment { spans }
  }
}

/// 依据词元置信度向量重建短语：
/// 置信度超过 text_threshold 的词元位置映射回原文片段，按空格连接
pub fn extract_phrase(
  logits: &[f32],
  text_threshold: f32,
  caption: &str,
  alignment: &TokenAlignment,
) -> String {
  let mut pieces = Vec::new();

  for (index, span) in alignment.spans.iter().enumerate() {
    let confidence = logits.get(index).copied().unwrap_or(0.0);
    if confidence > text_threshold {
      pieces.push(&caption[span.start..span.end]);
    }
  }

  pieces.join(" ")
}

/// 短语是否只是复述类别名（子串匹配，区分大小写）。
/// 已知的粗糙启发式：如 "cabled connector" 也会命中类别 "cable"，
/// 为保持与上游行为兼容不做修正。
pub fn restates_category(phrase: &str, category: &str) -> bool {
  phrase.contains(category)
}

/// 置信度后缀标签，如 "hole(0.42)"
pub fn score_label(phrase: &str, score: f32) -> String {
  format!("{}({:.2})", phrase, score)
}
