//! 大端字节读取器.
//!
//! 在一段只读字节切片上维护读取游标, 所有读取操作都先做边界检查,
//! 数据不够时返回 [`FlvError::NeedMoreData`] 而不是越界访问.
//!
//! 调用方拿到的子切片直接借用源数据, 不发生拷贝.

use byteorder::{BigEndian, ByteOrder};

use crate::{FlvError, FlvResult};

/// 字节读取器
///
/// # 示例
/// ```
/// use flvkit_core::ByteReader;
///
/// let data = [0x09, 0x00, 0x00, 0x07, 0xAA];
/// let mut br = ByteReader::new(&data);
/// assert_eq!(br.read_u8().unwrap(), 9);
/// assert_eq!(br.read_u24_be().unwrap(), 7);
/// assert_eq!(br.remaining(), 1);
/// assert!(br.read_u16_be().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前读取位置
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// 创建新的字节读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 已读取的字节数
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余可读字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// 是否已读完
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// 取出接下来的 `count` 个字节
    pub fn read_bytes(&mut self, count: usize) -> FlvResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(FlvError::NeedMoreData);
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// 取出全部剩余字节
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> FlvResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// 查看下一个字节, 不移动游标
    pub fn peek_u8(&self) -> FlvResult<u8> {
        self.data.get(self.pos).copied().ok_or(FlvError::NeedMoreData)
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> FlvResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// 读取 u16 大端
    pub fn read_u16_be(&mut self) -> FlvResult<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    /// 读取 u24 大端 (3 字节无符号整数)
    pub fn read_u24_be(&mut self) -> FlvResult<u32> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    /// 读取 i24 大端 (3 字节有符号整数, 符号扩展到 i32)
    pub fn read_i24_be(&mut self) -> FlvResult<i32> {
        Ok(BigEndian::read_i24(self.read_bytes(3)?))
    }

    /// 读取 u32 大端
    pub fn read_u32_be(&mut self) -> FlvResult<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// 读取 IEEE 754 双精度浮点 (大端)
    ///
    /// 先把 8 个字节整体拷贝到定长数组, 再按大端解释位模式.
    pub fn read_f64_be(&mut self) -> FlvResult<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(f64::from_be_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_读取整数() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22];
        let mut br = ByteReader::new(&data);
        assert_eq!(br.read_u8().unwrap(), 0x12);
        assert_eq!(br.read_u16_be().unwrap(), 0x3456);
        assert_eq!(br.read_u24_be().unwrap(), 0x789ABC);
        assert_eq!(br.read_u32_be().unwrap(), 0xDEF0_1122);
        assert!(br.is_empty());
    }

    #[test]
    fn test_i24_符号扩展() {
        let mut br = ByteReader::new(&[0xFF, 0xFF, 0xFE, 0x00, 0x01, 0x00]);
        assert_eq!(br.read_i24_be().unwrap(), -2);
        assert_eq!(br.read_i24_be().unwrap(), 256);
    }

    #[test]
    fn test_读取浮点() {
        let bytes = 10.0f64.to_be_bytes();
        let mut br = ByteReader::new(&bytes);
        assert_eq!(br.read_f64_be().unwrap(), 10.0);
    }

    #[test]
    fn test_越界返回数据不足() {
        let data = [0x01, 0x02];
        let mut br = ByteReader::new(&data);
        assert!(br.read_u24_be().unwrap_err().is_need_more_data());
        // 失败的读取不移动游标
        assert_eq!(br.position(), 0);
        assert_eq!(br.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert!(br.peek_u8().is_err());
    }

    #[test]
    fn test_read_rest() {
        let data = [1, 2, 3, 4];
        let mut br = ByteReader::new(&data);
        br.skip(1).unwrap();
        assert_eq!(br.read_rest(), &[2, 3, 4]);
        assert_eq!(br.remaining(), 0);
    }
}
