//! FEN 棋盘部分的解析和生成
//!
//! 电子棋盘只能感知格子上的棋子，所以这里只处理 FEN 的第一段：
//! `<第8横线>/<第7横线>/.../<第1横线>`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR`

use crate::board::Position;
use crate::error::DecodeError;
use crate::piece::{Piece, Square};

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析棋子布局字符串
    pub fn parse_placement(placement: &str) -> Result<Position, DecodeError> {
        // 允许传入完整 FEN，只取第一段
        let board_str = placement.split_whitespace().next().unwrap_or("");
        let rows: Vec<&str> = board_str.split('/').collect();

        if rows.len() != 8 {
            return Err(DecodeError::InvalidPlacement {
                reason: format!("Expected 8 rows, got {}", rows.len()),
            });
        }

        let mut position = Position::empty();

        // 从上到下是第 8 横线到第 1 横线
        for (row_idx, row) in rows.iter().enumerate() {
            let rank = 7 - row_idx as u8;
            let mut file = 0u8;

            for c in row.chars() {
                if file >= 8 {
                    return Err(DecodeError::InvalidPlacement {
                        reason: format!("Row {} has too many columns", row_idx),
                    });
                }

                if let Some(empty_count) = c.to_digit(10) {
                    file += empty_count as u8;
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    let square = Square::new(file, rank).ok_or_else(|| {
                        DecodeError::InvalidPlacement {
                            reason: format!("Row {} overflows the board", row_idx),
                        }
                    })?;
                    position.set(square, Some(piece));
                    file += 1;
                } else {
                    return Err(DecodeError::InvalidPlacement {
                        reason: format!("Invalid piece character: {}", c),
                    });
                }
            }

            if file != 8 {
                return Err(DecodeError::InvalidPlacement {
                    reason: format!("Row {} has {} columns, expected 8", row_idx, file),
                });
            }
        }

        Ok(position)
    }

    /// 生成棋子布局字符串
    pub fn placement(position: &Position) -> String {
        let mut rows = Vec::with_capacity(8);

        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty_count = 0;

            for file in 0..8 {
                let piece = Square::new(file, rank).and_then(|sq| position.get(sq));
                if let Some(piece) = piece {
                    if empty_count > 0 {
                        row.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    row.push(piece.to_fen_char());
                } else {
                    empty_count += 1;
                }
            }

            if empty_count > 0 {
                row.push_str(&empty_count.to_string());
            }

            rows.push(row);
        }

        rows.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STARTING_PLACEMENT;
    use crate::piece::{Color, Role};

    #[test]
    fn test_parse_starting_placement() {
        let position = Fen::parse_placement(STARTING_PLACEMENT).unwrap();

        assert_eq!(position.pieces().count(), 32);
        assert_eq!(
            position.get("a1".parse().unwrap()),
            Some(Piece::new(Role::Rook, Color::White))
        );
        assert_eq!(
            position.get("e8".parse().unwrap()),
            Some(Piece::new(Role::King, Color::Black))
        );
        assert_eq!(position.get("e4".parse().unwrap()), None);
    }

    #[test]
    fn test_placement_roundtrip() {
        let placement = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR";
        let position = Fen::parse_placement(placement).unwrap();
        assert_eq!(Fen::placement(&position), placement);
    }

    #[test]
    fn test_full_fen_is_accepted() {
        let position =
            Fen::parse_placement("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        assert_eq!(Fen::placement(&position), STARTING_PLACEMENT);
    }

    #[test]
    fn test_invalid_placement() {
        // 行数不对
        assert!(Fen::parse_placement("8/8/8").is_err());

        // 列数不对
        assert!(Fen::parse_placement("9/8/8/8/8/8/8/8").is_err());
        assert!(Fen::parse_placement("7/8/8/8/8/8/8/8").is_err());

        // 无效字符
        assert!(Fen::parse_placement("7x/8/8/8/8/8/8/8").is_err());
    }
}
