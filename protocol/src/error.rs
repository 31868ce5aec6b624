//! 错误类型定义

use thiserror::Error;

/// 棋盘数据解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// 去掉消息头后的数据长度不对
    #[error("Invalid payload length: expected {expected} bytes, got {actual}")]
    PayloadLength { expected: usize, actual: usize },

    /// 格子编号超出 0-63
    #[error("Invalid square index: {0}")]
    SquareIndex(u8),

    /// 无效的棋子布局字符串
    #[error("Invalid placement string: {reason}")]
    InvalidPlacement { reason: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 回复未收完连接就关闭了
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// 数据解码错误
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl ProtocolError {
    /// 是否属于传输层故障（与协议失步导致的解码错误区分）
    pub fn is_transport(&self) -> bool {
        !matches!(self, ProtocolError::Decode(_))
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
