//! DGT 电子棋盘共享协议库
//!
//! 包含:
//! - 指令码、回复长度等协议常量
//! - 棋子编码表、格子顺序
//! - 整盘数据解码（局面、布局字符串、ASCII 棋盘图）
//! - 传输层（指令/回复、格子更新流的帧重组、BoardDevice trait）
//! - 对账结果与对外事件类型
//! - 棋谱记录（PGN）

mod board;
mod constants;
mod error;
mod fen;
mod message;
mod piece;
mod record;
mod transport;

pub use board::{BoardFrame, BoardState, FieldUpdate, Position};
pub use constants::*;
pub use error::{DecodeError, ProtocolError, Result};
pub use fen::Fen;
pub use message::{
    BoardEvent, Update, UpdateEvent, MSG_AMBIGUOUS_MOVE, MSG_BOARD_CHANGED, MSG_ILLEGAL_MOVE,
    MSG_READ_FAILURE, MSG_SYNCHRONISED,
};
pub use piece::{Color, Piece, Role, Square};
pub use record::{GameRecord, GameResult};
pub use transport::{
    BoardDevice, BoardLink, FieldUpdateAssembler, LinkStatus, UpdateSubscription,
};
