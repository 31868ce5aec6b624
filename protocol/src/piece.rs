//! 棋子与格子定义

use serde::{Deserialize, Serialize};

use crate::constants::SQUARE_COUNT;

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Pawn,
    Rook,
    Knight,
    Bishop,
    King,
    Queen,
}

impl Role {
    /// 棋盘编码表中的顺序（白方 1-6，黑方 7-12）
    const CODE_ORDER: [Role; 6] = [
        Role::Pawn,
        Role::Rook,
        Role::Knight,
        Role::Bishop,
        Role::King,
        Role::Queen,
    ];

    /// 获取 FEN 字符（小写）
    pub fn to_fen_char(&self) -> char {
        match self {
            Role::Pawn => 'p',
            Role::Rook => 'r',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::King => 'k',
            Role::Queen => 'q',
        }
    }

    /// 从 FEN 字符解析（不区分大小写）
    pub fn from_fen_char(c: char) -> Option<Role> {
        match c.to_ascii_lowercase() {
            'p' => Some(Role::Pawn),
            'r' => Some(Role::Rook),
            'n' => Some(Role::Knight),
            'b' => Some(Role::Bishop),
            'k' => Some(Role::King),
            'q' => Some(Role::Queen),
            _ => None,
        }
    }

    fn code_offset(&self) -> u8 {
        match self {
            Role::Pawn => 1,
            Role::Rook => 2,
            Role::Knight => 3,
            Role::Bishop => 4,
            Role::King => 5,
            Role::Queen => 6,
        }
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手）
    White,
    /// 黑方
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Color> {
        match c {
            'w' | 'W' => Some(Color::White),
            'b' | 'B' => Some(Color::Black),
            _ => None,
        }
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub role: Role,
    pub color: Color,
}

impl Piece {
    /// 创建新棋子
    pub fn new(role: Role, color: Color) -> Self {
        Self { role, color }
    }

    /// 从棋盘编码解析，0 和保留值 13-15（以及其他未知值）都视为空格
    pub fn from_code(code: u8) -> Option<Piece> {
        let (color, index) = match code {
            1..=6 => (Color::White, code - 1),
            7..=12 => (Color::Black, code - 7),
            _ => return None,
        };
        Some(Piece::new(Role::CODE_ORDER[index as usize], color))
    }

    /// 转换为棋盘编码
    pub fn to_code(&self) -> u8 {
        match self.color {
            Color::White => self.role.code_offset(),
            Color::Black => self.role.code_offset() + 6,
        }
    }

    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self) -> char {
        let c = self.role.to_fen_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Piece> {
        let role = Role::from_fen_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(role, color))
    }

    /// 获取棋子的 Unicode 符号
    pub fn symbol(&self) -> char {
        match (self.role, self.color) {
            (Role::Pawn, Color::White) => '♙',
            (Role::Rook, Color::White) => '♖',
            (Role::Knight, Color::White) => '♘',
            (Role::Bishop, Color::White) => '♗',
            (Role::King, Color::White) => '♔',
            (Role::Queen, Color::White) => '♕',
            (Role::Pawn, Color::Black) => '♟',
            (Role::Rook, Color::Black) => '♜',
            (Role::Knight, Color::Black) => '♞',
            (Role::Bishop, Color::Black) => '♝',
            (Role::King, Color::Black) => '♚',
            (Role::Queen, Color::Black) => '♛',
        }
    }
}

/// 棋盘格子
///
/// 索引顺序与棋盘回复一致：0 = a8, 7 = h8, 8 = a7, ..., 63 = h1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square(u8);

impl Square {
    /// 从列（0-7 = a-h）和横线（0-7 = 1-8）创建
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self((7 - rank) * 8 + file))
        } else {
            None
        }
    }

    /// 从棋盘回复中的索引创建
    pub fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < SQUARE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// 棋盘回复中的索引
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// 列（0-7 = a-h）
    pub fn file(&self) -> u8 {
        self.0 % 8
    }

    /// 横线（0-7 = 1-8）
    pub fn rank(&self) -> u8 {
        7 - self.0 / 8
    }

    /// 按回复顺序遍历全部格子（a8 → h1）
    pub fn all() -> impl Iterator<Item = Square> {
        (0..SQUARE_COUNT as u8).map(Square)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, self.rank() + 1)
    }
}

impl std::str::FromStr for Square {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(());
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or(())
    }
}
