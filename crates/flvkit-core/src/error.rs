//! 统一错误类型定义.
//!
//! 所有 flvkit crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// flvkit 统一错误类型
#[derive(Debug, Error)]
pub enum FlvError {
    /// 数据不足, 需要更多输入
    ///
    /// 这不是真正的失败: 调用方补充字节后重试即可.
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 文件头无效 (魔数不匹配), 对当前流是致命错误
    #[error("无效的 FLV 文件头: {0}")]
    InvalidPreamble(String),

    /// Script Data (AMF0) 内容损坏
    #[error("Script Data 格式错误: {0}")]
    MalformedScriptData(String),

    /// 无效数据 (损坏的 PreviousTagSize 等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 无效参数 (编码时字段超出取值范围等)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl FlvError {
    /// 是否只是 "数据还不够"
    pub fn is_need_more_data(&self) -> bool {
        matches!(self, FlvError::NeedMoreData)
    }
}

/// flvkit 统一 Result 类型
pub type FlvResult<T> = Result<T, FlvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_need_more_data_判定() {
        assert!(FlvError::NeedMoreData.is_need_more_data());
        assert!(!FlvError::InvalidPreamble("x".into()).is_need_more_data());
    }

    #[test]
    fn test_错误信息包含原因() {
        let err = FlvError::MalformedScriptData("未知类型 0x05".into());
        assert!(err.to_string().contains("未知类型 0x05"));
    }
}
