//! 棋盘状态
//!
//! 把棋盘回复的原始字节解码为格子 → 棋子的映射，并派生出
//! 棋子布局字符串（FEN 棋盘部分）和 ASCII 棋盘图。

use serde::{Deserialize, Serialize};

use crate::constants::{
    BOARD_DUMP_LEN, FIELD_UPDATE_LEN, HEADER_LEN, MSG_BOARD_DUMP, MSG_FIELD_UPDATE, SQUARE_COUNT,
};
use crate::error::DecodeError;
use crate::fen::Fen;
use crate::piece::{Color, Piece, Role, Square};

/// 棋盘回复帧（不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFrame {
    bytes: Vec<u8>,
}

impl BoardFrame {
    /// 包装收到的原始字节
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 由局面生成整盘数据帧（测试夹具和模拟器使用）
    pub fn from_position(position: &Position) -> Self {
        let mut bytes = Vec::with_capacity(BOARD_DUMP_LEN);
        bytes.push(MSG_BOARD_DUMP);
        bytes.extend_from_slice(&(BOARD_DUMP_LEN as u16).to_be_bytes());
        bytes.extend_from_slice(&position.encode());
        Self { bytes }
    }

    /// 原始字节
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 消息 ID（帧为空时返回 None）
    pub fn message_id(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// 去掉消息头后的数据
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or(&[])
    }

    /// 帧长度
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 帧是否为空
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for BoardFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// 局面：64 个格子上的棋子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 按回复顺序（a8 → h1）排列，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
}

impl Position {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; SQUARE_COUNT],
        }
    }

    /// 创建初始局面
    pub fn starting() -> Self {
        const BACK_RANK: [Role; 8] = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];

        let mut position = Self::empty();
        for (i, role) in BACK_RANK.into_iter().enumerate() {
            // 第 8 排在前，第 1 排在后
            position.squares[i] = Some(Piece::new(role, Color::Black));
            position.squares[8 + i] = Some(Piece::new(Role::Pawn, Color::Black));
            position.squares[48 + i] = Some(Piece::new(Role::Pawn, Color::White));
            position.squares[56 + i] = Some(Piece::new(role, Color::White));
        }
        position
    }

    /// 解码整盘数据帧
    pub fn decode(frame: &BoardFrame) -> Result<Self, DecodeError> {
        Self::from_codes(frame.payload())
    }

    /// 从 64 个棋子编码解码
    pub fn from_codes(codes: &[u8]) -> Result<Self, DecodeError> {
        if codes.len() != SQUARE_COUNT {
            return Err(DecodeError::PayloadLength {
                expected: SQUARE_COUNT,
                actual: codes.len(),
            });
        }

        Ok(Self {
            squares: codes.iter().map(|&code| Piece::from_code(code)).collect(),
        })
    }

    /// 从棋子布局字符串解析
    pub fn from_placement(placement: &str) -> Result<Self, DecodeError> {
        Fen::parse_placement(placement)
    }

    /// 编码为 64 个棋子编码
    pub fn encode(&self) -> [u8; SQUARE_COUNT] {
        let mut codes = [0u8; SQUARE_COUNT];
        for (code, piece) in codes.iter_mut().zip(&self.squares) {
            *code = piece.map_or(0, |p| p.to_code());
        }
        codes
    }

    /// 获取指定格子上的棋子
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    /// 设置指定格子上的棋子
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index()] = piece;
    }

    /// 所有有子的格子（a8 → h1）
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|piece| (sq, piece)))
    }

    /// 棋子布局字符串（不含走子方、易位权和步数）
    pub fn placement(&self) -> String {
        Fen::placement(self)
    }

    /// ASCII 棋盘图，第 8 横线在上
    pub fn ascii(&self) -> String {
        self.render(|piece| piece.map_or('.', |p| p.to_fen_char()))
    }

    /// 使用 Unicode 棋子符号的棋盘图
    pub fn pretty(&self) -> String {
        self.render(|piece| piece.map_or('.', |p| p.symbol()))
    }

    fn render(&self, symbol: impl Fn(Option<Piece>) -> char) -> String {
        let mut s = String::from("   +------------------------+\n");
        for (row, squares) in self.squares.chunks(8).enumerate() {
            s.push_str(&format!(" {} |", 8 - row));
            for piece in squares {
                s.push(' ');
                s.push(symbol(*piece));
                s.push(' ');
            }
            s.push_str("|\n");
        }
        s.push_str("   +------------------------+\n");
        s.push_str("     a  b  c  d  e  f  g  h");
        s
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

/// 一次读盘的完整解码结果
///
/// 布局字符串和 ASCII 图都由同一份 `position` 计算
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub position: Position,
    /// 原始棋子编码，用于变化检测
    pub encoded: [u8; SQUARE_COUNT],
    pub placement: String,
    pub ascii: String,
}

impl BoardState {
    /// 解码整盘数据帧
    pub fn decode(frame: &BoardFrame) -> Result<Self, DecodeError> {
        let position = Position::decode(frame)?;
        Ok(Self::from_position(position))
    }

    /// 从局面派生
    pub fn from_position(position: Position) -> Self {
        let encoded = position.encode();
        let placement = position.placement();
        let ascii = position.ascii();
        Self {
            position,
            encoded,
            placement,
            ascii,
        }
    }
}

/// 格子更新：棋盘主动上报的单格变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub square: Square,
    pub piece: Option<Piece>,
}

impl FieldUpdate {
    /// 解码 5 字节格子更新帧
    pub fn decode(frame: &[u8; FIELD_UPDATE_LEN]) -> Result<Self, DecodeError> {
        let index = frame[HEADER_LEN];
        let square = Square::from_index(index).ok_or(DecodeError::SquareIndex(index))?;
        Ok(Self {
            square,
            piece: Piece::from_code(frame[HEADER_LEN + 1]),
        })
    }

    /// 编码为 5 字节格子更新帧
    pub fn encode(&self) -> [u8; FIELD_UPDATE_LEN] {
        let len = (FIELD_UPDATE_LEN as u16).to_be_bytes();
        [
            MSG_FIELD_UPDATE,
            len[0],
            len[1],
            self.square.index() as u8,
            self.piece.map_or(0, |p| p.to_code()),
        ]
    }
}
