//! FLV 文件头 (9 bytes).
//!
//! ```text
//! "FLV" (3 bytes)
//! Version (1 byte, = 1)
//! Flags (1 byte): bit2=audio, bit0=video, 其余位为 0
//! DataOffset (4 bytes, BE): 头部大小 (= 9)
//! [PreviousTagSize0 (4 bytes, BE) = 0]
//! ```

use bitflags::bitflags;
use log::debug;

use flvkit_core::{ByteReader, ByteWriter, FlvError, FlvResult};

use crate::tag::PREV_TAG_SIZE_LEN;

/// FLV 签名
pub const SIGNATURE: &[u8; 3] = b"FLV";

/// 当前唯一使用的 FLV 版本
pub const FLV_VERSION: u8 = 1;

/// 文件头固定长度
pub const PREAMBLE_SIZE: usize = 9;

/// DataOffset 允许的最大值
pub const MAX_DATA_OFFSET: usize = 64 * 1024;

bitflags! {
    /// 文件头 TypeFlags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PreambleFlags: u8 {
        /// 含视频
        const VIDEO = 0x01;
        /// 含音频
        const AUDIO = 0x04;
    }
}

/// FLV 文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    /// 版本号
    pub version: u8,
    /// 音视频标志
    pub flags: PreambleFlags,
}

impl Preamble {
    /// 按音视频标志创建文件头
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        let mut flags = PreambleFlags::empty();
        flags.set(PreambleFlags::AUDIO, has_audio);
        flags.set(PreambleFlags::VIDEO, has_video);
        Self {
            version: FLV_VERSION,
            flags,
        }
    }

    /// 是否声明含音频
    pub fn has_audio(&self) -> bool {
        self.flags.contains(PreambleFlags::AUDIO)
    }

    /// 是否声明含视频
    pub fn has_video(&self) -> bool {
        self.flags.contains(PreambleFlags::VIDEO)
    }

    /// 编码后的长度
    pub fn encoded_size(trailing_size: bool) -> usize {
        PREAMBLE_SIZE + if trailing_size { PREV_TAG_SIZE_LEN } else { 0 }
    }

    /// 编码文件头
    ///
    /// `trailing_size` 为 true 时追加 4 字节全零的 PreviousTagSize0.
    pub fn encode(&self, trailing_size: bool) -> Vec<u8> {
        let mut bw = ByteWriter::with_capacity(Self::encoded_size(trailing_size));
        bw.write_bytes(SIGNATURE);
        bw.write_u8(self.version);
        bw.write_u8(self.flags.bits());
        bw.write_u32_be(PREAMBLE_SIZE as u32);
        if trailing_size {
            bw.write_u32_be(0);
        }
        bw.finish()
    }

    /// 解码文件头
    ///
    /// 成功时返回文件头与消耗的字节数. 字节不足返回 `NeedMoreData`,
    /// 签名不符或 DataOffset 不在 9..=[`MAX_DATA_OFFSET`] 范围内返回 `InvalidPreamble`.
    /// DataOffset 大于 9 时, 扩展头部字节一并跳过.
    pub fn decode(data: &[u8], trailing_size: bool) -> FlvResult<(Self, usize)> {
        let sig_len = data.len().min(SIGNATURE.len());
        if data[..sig_len] != SIGNATURE[..sig_len] {
            return Err(FlvError::InvalidPreamble(format!(
                "签名不匹配: {:02X?}",
                &data[..sig_len]
            )));
        }

        let mut br = ByteReader::new(data);
        br.skip(SIGNATURE.len())?;
        let version = br.read_u8()?;
        let flags = br.read_u8()?;
        let data_offset = br.read_u32_be()? as usize;
        if data_offset < PREAMBLE_SIZE {
            return Err(FlvError::InvalidPreamble(format!(
                "DataOffset={data_offset} 小于文件头长度"
            )));
        }
        if data_offset > MAX_DATA_OFFSET {
            return Err(FlvError::InvalidPreamble(format!(
                "DataOffset={data_offset} 超过上限 {MAX_DATA_OFFSET}"
            )));
        }

        br.skip(data_offset - PREAMBLE_SIZE)?;
        if trailing_size {
            let _prev_tag_size = br.read_u32_be()?;
        }

        debug!("FLV: version={version} flags=0x{flags:02X} data_offset={data_offset}");

        let preamble = Self {
            version,
            flags: PreambleFlags::from_bits_truncate(flags),
        };
        Ok((preamble, br.position()))
    }
}

impl Default for Preamble {
    fn default() -> Self {
        Self::new(true, true)
    }
}
