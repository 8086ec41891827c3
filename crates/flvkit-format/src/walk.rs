//! 借助 PreviousTagSize 从尾部反向遍历 Tag.
//!
//! 每个 Tag 之后的 4 字节记录了 "头部 + 数据区" 的长度, 从流末尾开始
//! 依次读取这个字段即可定位前一个 Tag, 无需从头扫描. 常用于读取
//! 文件最后的若干 Tag (例如求时长).

use flvkit_core::{ByteReader, FlvError, FlvResult};

use crate::preamble::Preamble;
use crate::tag::{PREV_TAG_SIZE_LEN, TAG_HEADER_SIZE, TagHeader, TagKind};

/// Tag 在流中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpan {
    /// Tag 头部的起始偏移
    pub offset: usize,
    /// 占用字节数 (含 PreviousTagSize)
    pub size: usize,
    /// Tag 类型
    pub kind: TagKind,
    /// 时间戳 (毫秒)
    pub timestamp: u32,
}

/// 反向遍历器
#[derive(Debug, Clone)]
pub struct BackwardWalk<'a> {
    /// 完整的 FLV 数据
    data: &'a [u8],
    /// 第一个 Tag 的起始偏移
    data_start: usize,
    /// 尚未遍历部分的末尾
    end: usize,
    /// 遇到错误后停止
    done: bool,
}

/// 从完整 FLV 数据的末尾开始反向遍历 Tag
///
/// 数据必须带 PreviousTagSize, 且以完整的 Tag 结尾.
pub fn walk_backward(data: &[u8]) -> FlvResult<BackwardWalk<'_>> {
    let (_, data_start) = Preamble::decode(data, true)?;
    Ok(BackwardWalk {
        data,
        data_start,
        end: data.len(),
        done: false,
    })
}

impl BackwardWalk<'_> {
    fn step(&mut self) -> FlvResult<TagSpan> {
        let available = self.end - self.data_start;
        if available < PREV_TAG_SIZE_LEN {
            return Err(FlvError::InvalidData(format!(
                "偏移 {} 处剩余 {available} 字节, 不足以读取 PreviousTagSize",
                self.end
            )));
        }

        let size_pos = self.end - PREV_TAG_SIZE_LEN;
        let prev_size = ByteReader::new(&self.data[size_pos..self.end]).read_u32_be()? as usize;
        if prev_size < TAG_HEADER_SIZE || prev_size > size_pos - self.data_start {
            return Err(FlvError::InvalidData(format!(
                "偏移 {size_pos} 处 PreviousTagSize={prev_size} 无效"
            )));
        }

        let offset = size_pos - prev_size;
        let header = TagHeader::decode(&self.data[offset..size_pos])?;
        if TAG_HEADER_SIZE + header.data_size as usize != prev_size {
            return Err(FlvError::InvalidData(format!(
                "偏移 {offset} 处 DataSize={} 与 PreviousTagSize={prev_size} 不一致",
                header.data_size
            )));
        }

        self.end = offset;
        Ok(TagSpan {
            offset,
            size: prev_size + PREV_TAG_SIZE_LEN,
            kind: header.kind,
            timestamp: header.timestamp,
        })
    }
}

impl Iterator for BackwardWalk<'_> {
    type Item = FlvResult<TagSpan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.end <= self.data_start {
            return None;
        }
        let result = self.step();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
