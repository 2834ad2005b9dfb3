//! Text splitting strategies.
//!
//! This module provides the [`TextSplitter`] trait and two implementations:
//!
//! - [`RecursiveCharacterSplitter`] — splits on the highest-priority natural
//!   boundary present, recursing into oversized pieces with lower-priority
//!   boundaries and finally a hard cut, then merges pieces back into chunks of
//!   at most `chunk_size` characters with `chunk_overlap` characters of overlap
//! - [`SeparatorSplitter`] — splits on a caller-supplied literal separator
//!
//! Lengths are measured in Unicode scalar values, so CJK text is budgeted per
//! character rather than per byte.

use std::collections::VecDeque;

use tracing::warn;

/// Default boundaries for [`RecursiveCharacterSplitter`], highest priority first.
pub const DEFAULT_SEPARATORS: [&str; 12] =
    ["\n\n", "\n", " ", ".", ",", "!", "?", "，", "、", "。", "！", "？"];

/// A strategy for splitting document text into chunk texts.
pub trait TextSplitter: Send + Sync {
    /// Split `text` into pieces, in document order.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Boundary-aware recursive splitter with overlap.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::chunking::{RecursiveCharacterSplitter, TextSplitter};
///
/// let splitter = RecursiveCharacterSplitter::new(512, 100);
/// let chunks = splitter.split(&text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter using [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of characters repeated between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator list. Empty separators are ignored.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators =
            separators.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect();
        self
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let Some(position) = separators.iter().position(|s| text.contains(s.as_str())) else {
            return split_by_size(text, self.chunk_size, self.chunk_overlap);
        };
        let separator = &separators[position];
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            chunks.extend(self.split_recursive(piece, remaining));
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Pack consecutive pieces into chunks, carrying a tail of at most
    /// `chunk_overlap` characters into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    warn!(
                        total,
                        chunk_size = self.chunk_size,
                        "created chunk larger than chunk_size"
                    );
                }
                push_trimmed(&mut chunks, window.iter().copied().collect::<String>());

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(front) = window.pop_front() else { break };
                    total -= char_len(front);
                }
            }
            window.push_back(piece);
            total += len;
        }

        push_trimmed(&mut chunks, window.into_iter().collect::<String>());
        chunks
    }
}

impl TextSplitter for RecursiveCharacterSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }
}

/// Splits on a literal separator without any size budget.
#[derive(Debug, Clone)]
pub struct SeparatorSplitter {
    separator: String,
}

impl SeparatorSplitter {
    pub fn new(separator: impl Into<String>) -> Self {
        Self { separator: separator.into() }
    }
}

impl TextSplitter for SeparatorSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        if self.separator.is_empty() {
            return vec![text.to_string()];
        }
        text.split(self.separator.as_str()).map(str::to_string).collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: String) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split text at a separator, keeping the separator attached to the start of
/// the following piece. Empty pieces are not produced.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            result.push(&text[start..pos]);
            start = pos;
        }
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Hard cut into fixed character windows with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        push_trimmed(&mut chunks, chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_kept_on_following_piece() {
        assert_eq!(split_keeping_separator("a.b.c", "."), vec!["a", ".b", ".c"]);
        assert_eq!(split_keeping_separator(".a", "."), vec![".a"]);
        assert_eq!(split_keeping_separator("\n\n\n\n", "\n\n"), vec!["\n\n", "\n\n"]);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let splitter = RecursiveCharacterSplitter::new(100, 10);
        assert_eq!(splitter.split("  hello world  "), vec!["hello world"]);
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let splitter = RecursiveCharacterSplitter::new(12, 0);
        let chunks = splitter.split("first para\n\nsecond one\n\nthird");
        assert_eq!(chunks, vec!["first para", "second one", "third"]);
    }

    #[test]
    fn overlap_repeats_trailing_words() {
        let splitter = RecursiveCharacterSplitter::new(11, 5);
        let chunks = splitter.split("aa bb cc dd ee ff");
        assert_eq!(chunks, vec!["aa bb cc dd", "dd ee ff"]);
    }

    #[test]
    fn cjk_text_falls_back_to_cjk_punctuation() {
        let splitter = RecursiveCharacterSplitter::new(8, 0);
        let chunks = splitter.split("第一条规定。第二条规定。第三条规定。");
        assert_eq!(chunks, vec!["第一条规定", "。第二条规定", "。第三条规定。"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 8));
    }

    #[test]
    fn hard_cut_when_no_separator_fits() {
        let splitter = RecursiveCharacterSplitter::new(4, 1);
        let chunks = splitter.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn literal_separator_splits_exactly() {
        let splitter = SeparatorSplitter::new("||");
        assert_eq!(splitter.split("a||b||||c"), vec!["a", "b", "", "c"]);
    }
}
