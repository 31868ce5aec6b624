//! 棋谱记录
//!
//! 只保存在内存中，可导出为 PGN 文本或 JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::STARTING_PLACEMENT;

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
}

impl GameResult {
    /// PGN 结果标记
    pub fn to_pgn(&self) -> &'static str {
        match self {
            GameResult::WhiteWin => "1-0",
            GameResult::BlackWin => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }
}

/// 完整的棋谱记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 初始布局
    pub initial_placement: String,
    /// 着法列表（SAN）
    pub moves: Vec<String>,
    /// 对局结果（进行中为 None）
    pub result: Option<GameResult>,
}

impl GameRecord {
    /// 创建新的棋谱记录
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            initial_placement: STARTING_PLACEMENT.to_string(),
            moves: Vec::new(),
            result: None,
        }
    }

    /// 添加着法
    pub fn push(&mut self, san: impl Into<String>) {
        self.moves.push(san.into());
    }

    /// 带回合编号的着法文本，如 `1. e4 e5 2. Nf3`
    pub fn movetext(&self) -> String {
        let mut parts = Vec::with_capacity(self.moves.len() + self.moves.len() / 2 + 1);
        for (i, san) in self.moves.iter().enumerate() {
            if i % 2 == 0 {
                parts.push(format!("{}.", i / 2 + 1));
            }
            parts.push(san.clone());
        }
        if let Some(result) = self.result {
            parts.push(result.to_pgn().to_string());
        }
        parts.join(" ")
    }

    /// 导出 PGN
    pub fn to_pgn(&self) -> String {
        let result = self.result.map_or("*", |r| r.to_pgn());
        let mut pgn = String::new();
        pgn.push_str("[Event \"DGT board game\"]\n");
        pgn.push_str(&format!("[Date \"{}\"]\n", self.started_at.format("%Y.%m.%d")));
        pgn.push_str("[White \"?\"]\n");
        pgn.push_str("[Black \"?\"]\n");
        pgn.push_str(&format!("[Result \"{}\"]\n", result));
        pgn.push('\n');

        let movetext = self.movetext();
        if movetext.is_empty() {
            pgn.push_str(result);
        } else if self.result.is_some() {
            pgn.push_str(&movetext);
        } else {
            pgn.push_str(&format!("{} *", movetext));
        }
        pgn
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 反序列化
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
