//! 对账结果与对外事件定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::piece::Color;

/// 读盘失败提示
pub const MSG_READ_FAILURE: &str = "Could not read the board, check the connection and try again";

/// 找不到对应合法着法的提示
pub const MSG_ILLEGAL_MOVE: &str = "Could not generate move, most likely an illegal move. \
     Reset the pieces to match the game position";

/// 多个合法着法得到同一布局的提示
pub const MSG_AMBIGUOUS_MOVE: &str = "Several legal moves match the board, \
     reset the pieces to match the game position";

/// 棋盘已与初始局面同步
pub const MSG_SYNCHRONISED: &str = "Board synchronised with the starting position";

/// 棋盘有变化但尚未检查合法性
pub const MSG_BOARD_CHANGED: &str = "Board changed, not yet legal-checked";

/// 一次对账（tick）的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// 棋盘状态可展示：同步、实时变化或一步合法着法
    Good {
        placement: String,
        ascii: String,
        /// 本次走出的着法（SAN），只有确认了着法才有
        notation: Option<String>,
        message: String,
    },
    /// 读盘失败或着法非法
    Bad {
        message: String,
        /// 读盘失败时没有布局
        placement: Option<String>,
    },
    /// 没有新信息，不产生事件
    Ignore,
}

impl Update {
    /// 是否需要通知订阅者
    pub fn is_observable(&self) -> bool {
        !matches!(self, Update::Ignore)
    }

    /// 是否确认了一步着法
    pub fn is_move(&self) -> bool {
        matches!(self, Update::Good { notation: Some(_), .. })
    }
}

/// 发给订阅者的棋盘更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub ok: bool,
    /// 当前物理棋盘是否与对局一致
    pub legal: bool,
    pub message: String,
    pub placement: Option<String>,
    pub ascii: Option<String>,
    pub move_notation: Option<String>,
    /// 对局的全部着法（SAN）
    #[serde(rename = "gameNotationHistory")]
    pub history: Vec<String>,
    /// PGN 着法文本
    pub pgn: String,
    pub side_to_move: Color,
    pub timestamp: DateTime<Utc>,
}

/// 棋盘事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BoardEvent {
    /// 一次可观察的对账结果
    Update(UpdateEvent),
    /// 轮询已停止（棋盘断线）
    Disconnected,
}
