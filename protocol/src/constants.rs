//! 协议常量定义

use std::time::Duration;

/// 复位（无回复）
pub const OP_RESET: u8 = 0x40;

/// 请求整盘数据
pub const OP_BOARD_DUMP: u8 = 0x42;

/// 请求/开启格子更新流
pub const OP_UPDATE_BOARD: u8 = 0x44;

/// 请求序列号
pub const OP_SERIAL_NUMBER: u8 = 0x45;

/// 请求固件版本
pub const OP_VERSION: u8 = 0x4d;

/// 回复消息头长度：1 字节消息 ID + 2 字节长度（大端序）
pub const HEADER_LEN: usize = 3;

/// 棋盘格子数
pub const SQUARE_COUNT: usize = 64;

/// 整盘数据帧长度
pub const BOARD_DUMP_LEN: usize = HEADER_LEN + SQUARE_COUNT;

/// 格子更新帧长度
pub const FIELD_UPDATE_LEN: usize = HEADER_LEN + 2;

/// 序列号回复长度
pub const SERIAL_NUMBER_LEN: usize = HEADER_LEN + 5;

/// 固件版本回复长度
pub const VERSION_LEN: usize = HEADER_LEN + 2;

/// 回复消息 ID 的最高位
pub const MESSAGE_BIT: u8 = 0x80;

/// 整盘数据回复 ID
pub const MSG_BOARD_DUMP: u8 = MESSAGE_BIT | 0x06;

/// 格子更新回复 ID
pub const MSG_FIELD_UPDATE: u8 = MESSAGE_BIT | 0x0e;

/// 序列号回复 ID
pub const MSG_SERIAL_NUMBER: u8 = MESSAGE_BIT | 0x11;

/// 固件版本回复 ID
pub const MSG_VERSION: u8 = MESSAGE_BIT | 0x13;

/// 默认串口波特率
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 默认轮询间隔（毫秒）
///
/// 棋盘大约 500ms 才会刷新一次；间隔过低（约 20ms）会导致串口错误
pub const POLL_INTERVAL_MS: u64 = 100;

/// 默认轮询间隔 Duration
pub const POLL_INTERVAL: Duration = Duration::from_millis(POLL_INTERVAL_MS);

/// 初始局面的棋子布局（FEN 棋盘部分）
pub const STARTING_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
