//! 大端字节写入器.
//!
//! 与 [`ByteReader`](crate::ByteReader) 对应, 向内部缓冲区追加大端序字段.
//! 24 位字段超出范围时返回 [`FlvError::InvalidArgument`], 不做静默截断.

use byteorder::{BigEndian, ByteOrder};

use crate::{FlvError, FlvResult};

/// 24 位无符号整数上限
pub const U24_MAX: u32 = 0x00FF_FFFF;

/// 字节写入器
///
/// # 示例
/// ```
/// use flvkit_core::ByteWriter;
///
/// let mut bw = ByteWriter::new();
/// bw.write_u8(0x09);
/// bw.write_u24_be(5).unwrap();
/// assert_eq!(bw.finish(), vec![0x09, 0x00, 0x00, 0x05]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    /// 输出缓冲区
    data: Vec<u8>,
}

impl ByteWriter {
    /// 创建新的字节写入器
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// 以指定容量创建字节写入器
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// 已写入的字节数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否尚未写入任何数据
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 写入原始字节
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// 写入 u8
    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    /// 写入 u16 大端
    pub fn write_u16_be(&mut self, v: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, v);
        self.write_bytes(&buf);
    }

    /// 写入 u24 大端
    pub fn write_u24_be(&mut self, v: u32) -> FlvResult<()> {
        if v > U24_MAX {
            return Err(FlvError::InvalidArgument(format!(
                "数值 {v} 超出 24 位范围"
            )));
        }
        let mut buf = [0u8; 3];
        BigEndian::write_u24(&mut buf, v);
        self.write_bytes(&buf);
        Ok(())
    }

    /// 写入 i24 大端 (取值范围 -8388608..=8388607)
    pub fn write_i24_be(&mut self, v: i32) -> FlvResult<()> {
        if !(-0x80_0000..=0x7F_FFFF).contains(&v) {
            return Err(FlvError::InvalidArgument(format!(
                "数值 {v} 超出有符号 24 位范围"
            )));
        }
        let mut buf = [0u8; 3];
        BigEndian::write_i24(&mut buf, v);
        self.write_bytes(&buf);
        Ok(())
    }

    /// 写入 u32 大端
    pub fn write_u32_be(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, v);
        self.write_bytes(&buf);
    }

    /// 写入 IEEE 754 双精度浮点 (大端)
    pub fn write_f64_be(&mut self, v: f64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// 获取已写入的数据
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// 结束写入, 返回缓冲区
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteReader;

    #[test]
    fn test_u24_范围检查() {
        let mut bw = ByteWriter::new();
        assert!(bw.write_u24_be(U24_MAX).is_ok());
        assert!(bw.write_u24_be(U24_MAX + 1).is_err());
        assert_eq!(bw.finish(), vec![0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_i24_负数() {
        let mut bw = ByteWriter::new();
        bw.write_i24_be(-1).unwrap();
        bw.write_i24_be(0x12_3456).unwrap();
        assert!(bw.write_i24_be(0x80_0000).is_err());
        let data = bw.finish();
        assert_eq!(data, vec![0xFF, 0xFF, 0xFF, 0x12, 0x34, 0x56]);

        let mut br = ByteReader::new(&data);
        assert_eq!(br.read_i24_be().unwrap(), -1);
        assert_eq!(br.read_i24_be().unwrap(), 0x12_3456);
    }

    #[test]
    fn test_u16_u32() {
        let mut bw = ByteWriter::with_capacity(6);
        bw.write_u16_be(0x0102);
        bw.write_u32_be(0x0304_0506);
        assert_eq!(bw.len(), 6);
        assert_eq!(bw.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }
}
