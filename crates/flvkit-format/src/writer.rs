//! FLV 写入器.
//!
//! 将文件头与 Tag 依次写入任意 [`Write`] 输出:
//! - FLV Header (9 bytes)
//! - PreviousTagSize0 (4 bytes = 0)
//! - [FLV Tag + PreviousTagSize] ...

use std::io::Write;

use log::debug;

use flvkit_core::{ByteWriter, FlvError, FlvResult};

use crate::preamble::Preamble;
use crate::tag::Tag;

/// FLV 写入器
pub struct FlvWriter<W: Write> {
    /// 输出
    inner: W,
    /// 是否写入 PreviousTagSize
    trailing_size: bool,
    /// 是否已写入文件头
    header_written: bool,
    /// 已写入的 Tag 数
    tags_written: u64,
    /// 已写入的字节数
    bytes_written: u64,
}

impl<W: Write> FlvWriter<W> {
    /// 创建写入器
    pub fn new(inner: W, trailing_size: bool) -> Self {
        Self {
            inner,
            trailing_size,
            header_written: false,
            tags_written: 0,
            bytes_written: 0,
        }
    }

    /// 写入文件头 (只能写一次)
    pub fn write_header(&mut self, preamble: &Preamble) -> FlvResult<()> {
        if self.header_written {
            return Err(FlvError::InvalidArgument("FLV: 文件头已写入".into()));
        }
        let data = preamble.encode(self.trailing_size);
        self.inner.write_all(&data)?;
        self.bytes_written += data.len() as u64;
        self.header_written = true;
        Ok(())
    }

    /// 写入一个 Tag
    pub fn write_tag(&mut self, tag: &Tag) -> FlvResult<()> {
        if !self.header_written {
            return Err(FlvError::InvalidArgument(
                "FLV: 写入 Tag 前必须先写入文件头".into(),
            ));
        }
        let mut bw = ByteWriter::with_capacity(tag.total_size(self.trailing_size));
        tag.write_to(&mut bw, self.trailing_size)?;
        self.inner.write_all(bw.as_slice())?;
        self.bytes_written += bw.len() as u64;
        self.tags_written += 1;
        Ok(())
    }

    /// 已写入的 Tag 数
    pub fn tags_written(&self) -> u64 {
        self.tags_written
    }

    /// 已写入的字节数
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// 刷新输出并取回底层写入器
    pub fn finish(mut self) -> FlvResult<W> {
        self.inner.flush()?;
        debug!(
            "FLV: 写入完成, {} 个 Tag, {} 字节",
            self.tags_written, self.bytes_written
        );
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::StreamReader;
    use crate::tag::{AacPacketType, AudioTag, VideoTag};

    #[test]
    fn test_写入后可读回() {
        let tags = vec![
            Tag::video(0, VideoTag::sequence_header(vec![0x01, 0x42, 0x00, 0x1E, 0xFF])),
            Tag::audio(0, AudioTag::aac(AacPacketType::SequenceHeader, vec![0x12, 0x10])),
            Tag::audio(23, AudioTag::aac(AacPacketType::Raw, vec![0xDE, 0xAD, 0xBE, 0xEF])),
        ];

        let mut writer = FlvWriter::new(Vec::new(), true);
        writer.write_header(&Preamble::new(true, true)).unwrap();
        for tag in &tags {
            writer.write_tag(tag).unwrap();
        }
        assert_eq!(writer.tags_written(), 3);
        let expected_len = 13 + tags.iter().map(|t| t.total_size(true)).sum::<usize>();
        assert_eq!(writer.bytes_written(), expected_len as u64);

        let data = writer.finish().unwrap();
        assert_eq!(data.len(), expected_len);
        assert_eq!(StreamReader::new().feed(&data).unwrap(), tags);
    }

    #[test]
    fn test_写入顺序检查() {
        let tag = Tag::video(0, VideoTag::nalu(true, 0, vec![1]));
        let mut writer = FlvWriter::new(Vec::new(), false);
        assert!(writer.write_tag(&tag).is_err());

        writer.write_header(&Preamble::default()).unwrap();
        assert!(writer.write_header(&Preamble::default()).is_err());
        writer.write_tag(&tag).unwrap();

        let data = writer.finish().unwrap();
        assert_eq!(data.len(), 9 + 11 + 6);
    }
}
