//! 对局状态
//!
//! 以 shakmaty 的 `Chess` 作为权威对局，只接受经过验证的合法着法

use chrono::Utc;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, File, Move, Outcome, Position as _, Rank};

use protocol::{Color, GameRecord, GameResult, Piece, Position, Role, Square};

/// 权威对局
#[derive(Debug, Clone)]
pub struct GameState {
    chess: Chess,
    record: GameRecord,
}

impl GameState {
    /// 创建初始局面的对局
    pub fn new() -> Self {
        Self {
            chess: Chess::default(),
            record: GameRecord::new(Utc::now()),
        }
    }

    /// 当前局面
    pub fn position(&self) -> Position {
        position_of(self.chess.board())
    }

    /// 当前棋子布局字符串
    pub fn placement(&self) -> String {
        self.position().placement()
    }

    /// 当前走子方
    pub fn turn(&self) -> Color {
        color_of(self.chess.turn())
    }

    /// 已走的着法（SAN）
    pub fn history(&self) -> &[String] {
        &self.record.moves
    }

    /// 带回合编号的着法文本
    pub fn movetext(&self) -> String {
        self.record.movetext()
    }

    /// 当前对局的棋谱（含结果）
    pub fn record(&self) -> GameRecord {
        let mut record = self.record.clone();
        record.result = self.result();
        record
    }

    /// 对局结果（进行中为 None）
    pub fn result(&self) -> Option<GameResult> {
        self.chess.outcome().map(|outcome| match outcome {
            Outcome::Decisive { winner } => match color_of(winner) {
                Color::White => GameResult::WhiteWin,
                Color::Black => GameResult::BlackWin,
            },
            Outcome::Draw => GameResult::Draw,
        })
    }

    /// 按规则引擎的生成顺序，找出走完后布局与 `placement` 一致的所有合法着法
    pub fn matching_moves(&self, placement: &str) -> Vec<Move> {
        self.chess
            .legal_moves()
            .into_iter()
            .filter(|m| {
                let mut scratch = self.chess.clone();
                scratch.play_unchecked(m);
                position_of(scratch.board()).placement() == placement
            })
            .collect()
    }

    /// 走一步合法着法，返回 SAN 记法
    pub fn apply(&mut self, m: &Move) -> String {
        let san = SanPlus::from_move_and_play_unchecked(&mut self.chess, m).to_string();
        self.record.push(san.clone());
        san
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// 把规则引擎的棋盘转换为局面
pub fn position_of(board: &shakmaty::Board) -> Position {
    let mut position = Position::empty();
    for square in Square::all() {
        let chess_square = shakmaty::Square::from_coords(
            File::new(u32::from(square.file())),
            Rank::new(u32::from(square.rank())),
        );
        if let Some(piece) = board.piece_at(chess_square) {
            position.set(square, Some(piece_of(piece)));
        }
    }
    position
}

fn piece_of(piece: shakmaty::Piece) -> Piece {
    let role = match piece.role {
        shakmaty::Role::Pawn => Role::Pawn,
        shakmaty::Role::Knight => Role::Knight,
        shakmaty::Role::Bishop => Role::Bishop,
        shakmaty::Role::Rook => Role::Rook,
        shakmaty::Role::Queen => Role::Queen,
        shakmaty::Role::King => Role::King,
    };
    Piece::new(role, color_of(piece.color))
}

fn color_of(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::STARTING_PLACEMENT;

    fn play(game: &mut GameState, placement: &str) -> String {
        let moves = game.matching_moves(placement);
        assert_eq!(moves.len(), 1, "expected exactly one move to {}", placement);
        game.apply(&moves[0])
    }

    #[test]
    fn test_initial_game() {
        let game = GameState::new();
        assert_eq!(game.placement(), STARTING_PLACEMENT);
        assert_eq!(game.turn(), Color::White);
        assert!(game.history().is_empty());
        assert_eq!(game.result(), None);
        assert_eq!(game.position(), Position::starting());
    }

    #[test]
    fn test_find_and_apply_move() {
        let mut game = GameState::new();
        let san = play(&mut game, "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");

        assert_eq!(san, "e4");
        assert_eq!(game.history(), ["e4"]);
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(game.placement(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
    }

    #[test]
    fn test_no_matching_move() {
        let game = GameState::new();

        // 两步以外的局面
        assert!(game
            .matching_moves("rnbqkbnr/pppppppp/8/8/3PP3/8/PPP2PPP/RNBQKBNR")
            .is_empty());
        // 黑方的着法不能在白方回合出现
        assert!(game
            .matching_moves("rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR")
            .is_empty());
        // 没有变化
        assert!(game.matching_moves(STARTING_PLACEMENT).is_empty());
    }

    #[test]
    fn test_fools_mate_record() {
        let mut game = GameState::new();
        play(&mut game, "rnbqkbnr/pppppppp/8/8/8/5P2/PPPPP1PP/RNBQKBNR");
        play(&mut game, "rnbqkbnr/pppp1ppp/8/4p3/8/5P2/PPPPP1PP/RNBQKBNR");
        play(&mut game, "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR");
        let mate = play(&mut game, "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR");

        assert_eq!(mate, "Qh4#");
        assert_eq!(game.result(), Some(GameResult::BlackWin));

        let record = game.record();
        assert_eq!(record.result, Some(GameResult::BlackWin));
        assert_eq!(game.movetext(), "1. f3 e5 2. g4 Qh4#");
        assert!(record.to_pgn().ends_with("1. f3 e5 2. g4 Qh4# 0-1"));
    }

    #[test]
    fn test_castling_is_recognised() {
        let mut game = GameState::new();
        for placement in [
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR",
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R",
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R",
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R",
            "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R",
        ] {
            play(&mut game, placement);
        }

        let castle = play(&mut game, "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1");
        assert_eq!(castle, "O-O");
        assert_eq!(game.history().len(), 7);
    }
}
