//! 回复分段与发送
//!
//! 把长回复按字符数切成连续、不重叠的片段，逐条顺序发送。
//! 不考虑单词边界，只保证不拆开 UTF-8 字符。

use tracing::debug;

use crate::core::messaging::ReplySink;
use crate::errors::Result;

/// 单条消息最大字符数
pub const MAX_SEGMENT_CHARS: usize = 1800;

/// 按字符数切分的迭代器
#[derive(Debug, Clone)]
pub struct ReplyChunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for ReplyChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let cut = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());

        let (segment, rest) = self.rest.split_at(cut);
        self.rest = rest;
        Some(segment)
    }
}

/// 切分回复文本
///
/// 空文本不产生任何片段；`max_chars` 为 0 时按 1 处理。
pub fn chunk_reply(text: &str, max_chars: usize) -> ReplyChunks<'_> {
    ReplyChunks {
        rest: text,
        max_chars: max_chars.max(1),
    }
}

/// 回复分发器
#[derive(Debug, Clone, Copy)]
pub struct ReplyDispatcher {
    max_segment_chars: usize,
}

impl ReplyDispatcher {
    pub fn new(max_segment_chars: usize) -> Self {
        Self {
            max_segment_chars: max_segment_chars.max(1),
        }
    }

    pub fn max_segment_chars(&self) -> usize {
        self.max_segment_chars
    }

    /// 顺序发送所有片段，返回发送的条数
    ///
    /// 每条发送完成后才发下一条；任意一条失败则停止并返回错误。
    pub async fn emit(&self, text: &str, sink: &dyn ReplySink) -> Result<usize> {
        let mut sent = 0;
        for segment in chunk_reply(text, self.max_segment_chars) {
            sink.reply(segment).await?;
            sent += 1;
        }
        debug!(segments = sent, "reply dispatched");
        Ok(sent)
    }
}

impl Default for ReplyDispatcher {
    fn default() -> Self {
        Self::new(MAX_SEGMENT_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_segments() {
        assert_eq!(chunk_reply("", MAX_SEGMENT_CHARS).count(), 0);
    }

    #[test]
    fn test_short_text_is_single_segment() {
        let segments: Vec<_> = chunk_reply("Hello", MAX_SEGMENT_CHARS).collect();
        assert_eq!(segments, vec!["Hello"]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_segment() {
        let text = "a".repeat(3600);
        let segments: Vec<_> = chunk_reply(&text, MAX_SEGMENT_CHARS).collect();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.len() == 1800));
    }

    #[test]
    fn test_segments_concatenate_back() {
        for len in [1usize, 1799, 1800, 1801, 5000] {
            let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
            let segments: Vec<_> = chunk_reply(&text, MAX_SEGMENT_CHARS).collect();

            assert_eq!(segments.len(), len.div_ceil(MAX_SEGMENT_CHARS));
            assert!(segments.iter().all(|s| s.chars().count() <= MAX_SEGMENT_CHARS));
            assert_eq!(segments.concat(), text);
        }
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "星".repeat(5);
        let segments: Vec<_> = chunk_reply(&text, 2).collect();
        assert_eq!(segments, vec!["星星", "星星", "星"]);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let segments: Vec<_> = chunk_reply("abc", 0).collect();
        assert_eq!(segments, vec!["a", "b", "c"]);
        assert_eq!(ReplyDispatcher::new(0).max_segment_chars(), 1);
    }
}
