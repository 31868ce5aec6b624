//! 着法对账引擎
//!
//! 每个连接一个 `Engine`，独占棋盘连接、权威对局、上一次读到的棋盘编码和走子信号。
//! 一次 `tick()` 完成：读盘 → 解码 → 对账 → 记录。

use chrono::Utc;
use tracing::{debug, error, info, warn};

use protocol::{
    BoardDevice, BoardEvent, BoardState, Color, LinkStatus, ProtocolError, Update, UpdateEvent,
    MSG_AMBIGUOUS_MOVE, MSG_BOARD_CHANGED, MSG_ILLEGAL_MOVE, MSG_READ_FAILURE, MSG_SYNCHRONISED,
    SQUARE_COUNT, STARTING_PLACEMENT,
};

use crate::game::GameState;

/// 上一次读到的物理棋盘
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveBoardState {
    /// 64 个格子的棋子编码，尚未读过为 None
    pub encoded: Option<[u8; SQUARE_COUNT]>,
    /// 最近一次检查时物理棋盘是否与对局一致
    pub legal: bool,
}

/// 对账引擎
pub struct Engine<D> {
    device: D,
    game: GameState,
    live: LiveBoardState,
    /// 走子信号：置位后下一次 tick 才会搜索着法
    gate: bool,
}

impl<D: BoardDevice> Engine<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            game: GameState::new(),
            live: LiveBoardState {
                encoded: None,
                legal: true,
            },
            gate: false,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn live(&self) -> &LiveBoardState {
        &self.live
    }

    pub fn is_gate_set(&self) -> bool {
        self.gate
    }

    /// 连接状态
    pub fn status(&self) -> LinkStatus {
        self.device.status()
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// 收到「某一方刚走完」的信号，只有该方正是走子方时才置位
    pub fn signal_turn(&mut self, color: Color) -> bool {
        let turn = self.game.turn();
        if color != turn {
            debug!(?color, ?turn, "不是走子方的信号，忽略");
            return false;
        }
        debug!(?color, "走子信号已生效");
        self.gate = true;
        true
    }

    /// 执行一次完整的对账
    pub async fn tick(&mut self) -> Update {
        // ==================== 读盘 ====================
        let sensed = match self.acquire().await {
            Ok(sensed) => sensed,
            Err(e) => {
                if e.is_transport() {
                    warn!("读盘失败: {}", e);
                } else {
                    error!("棋盘数据无法解码，数据流可能已错位: {}", e);
                }
                return Update::Bad {
                    message: MSG_READ_FAILURE.to_string(),
                    placement: None,
                };
            }
        };

        let changed = self.live.encoded != Some(sensed.encoded);
        let gate = self.gate;

        let update = self.reconcile(&sensed, changed, gate);

        // ==================== 记录 ====================
        self.live.encoded = Some(sensed.encoded);
        update
    }

    async fn acquire(&mut self) -> Result<BoardState, ProtocolError> {
        let frame = self.device.board_frame().await?;
        Ok(BoardState::decode(&frame)?)
    }

    fn reconcile(&mut self, sensed: &BoardState, changed: bool, gate: bool) -> Update {
        // 初始局面：与对局同步
        if sensed.placement == STARTING_PLACEMENT && self.game.history().is_empty() {
            if !changed {
                return Update::Ignore;
            }
            info!("棋盘已与初始局面同步");
            self.live.legal = true;
            return Update::Good {
                placement: sensed.placement.clone(),
                ascii: sensed.ascii.clone(),
                notation: None,
                message: MSG_SYNCHRONISED.to_string(),
            };
        }

        if !gate {
            if !changed {
                return Update::Ignore;
            }
            debug!(placement = %sensed.placement, "棋盘有变化");
            if sensed.placement == self.game.placement() {
                self.live.legal = true;
            }
            return Update::Good {
                placement: sensed.placement.clone(),
                ascii: sensed.ascii.clone(),
                notation: None,
                message: MSG_BOARD_CHANGED.to_string(),
            };
        }

        // ==================== 搜索着法 ====================
        let candidates = self.game.matching_moves(&sensed.placement);
        match candidates.as_slice() {
            [] => {
                warn!(placement = %sensed.placement, "没有合法着法能得到当前棋盘");
                self.live.legal = false;
                self.gate = false;
                Update::Bad {
                    message: MSG_ILLEGAL_MOVE.to_string(),
                    placement: Some(sensed.placement.clone()),
                }
            }
            [m] => {
                let san = self.game.apply(m);
                info!(notation = %san, "走子: {}", san);
                self.live.legal = true;
                self.gate = false;
                Update::Good {
                    placement: sensed.placement.clone(),
                    ascii: sensed.ascii.clone(),
                    notation: Some(san.clone()),
                    message: format!("Played {}", san),
                }
            }
            many => {
                warn!(count = many.len(), "多个合法着法能得到当前棋盘");
                Update::Bad {
                    message: MSG_AMBIGUOUS_MOVE.to_string(),
                    placement: Some(sensed.placement.clone()),
                }
            }
        }
    }

    /// 把可观察的结果包装为对外事件，Ignore 返回 None
    pub fn event_for(&self, update: &Update) -> Option<BoardEvent> {
        let (ok, message, placement, ascii, move_notation) = match update {
            Update::Ignore => return None,
            Update::Good {
                placement,
                ascii,
                notation,
                message,
            } => (
                true,
                message.clone(),
                Some(placement.clone()),
                Some(ascii.clone()),
                notation.clone(),
            ),
            Update::Bad { message, placement } => {
                (false, message.clone(), placement.clone(), None, None)
            }
        };

        Some(BoardEvent::Update(UpdateEvent {
            ok,
            legal: self.live.legal,
            message,
            placement,
            ascii,
            move_notation,
            history: self.game.history().to_vec(),
            pgn: self.game.movetext(),
            side_to_move: self.game.turn(),
            timestamp: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use protocol::{BoardFrame, Position, Result};

    use crate::simulator::sequence;

    /// 按脚本依次返回读盘结果
    struct ScriptedBoard {
        frames: VecDeque<Result<BoardFrame>>,
        status: LinkStatus,
    }

    impl ScriptedBoard {
        fn new(frames: Vec<Result<BoardFrame>>) -> Self {
            Self {
                frames: frames.into(),
                status: LinkStatus::new(),
            }
        }
    }

    #[async_trait]
    impl BoardDevice for ScriptedBoard {
        async fn reset(&mut self) -> Result<()> {
            Ok(())
        }

        async fn board_frame(&mut self) -> Result<BoardFrame> {
            self.frames
                .pop_front()
                .unwrap_or(Err(ProtocolError::ConnectionClosed))
        }

        async fn serial_number(&mut self) -> Result<String> {
            Ok("test".to_string())
        }

        async fn version(&mut self) -> Result<String> {
            Ok("1.0".to_string())
        }

        fn status(&self) -> LinkStatus {
            self.status.clone()
        }
    }

    fn frame(placement: &str) -> BoardFrame {
        BoardFrame::from_position(&Position::from_placement(placement).unwrap())
    }

    fn engine_with(frames: Vec<BoardFrame>) -> Engine<ScriptedBoard> {
        Engine::new(ScriptedBoard::new(frames.into_iter().map(Ok).collect()))
    }

    #[tokio::test]
    async fn test_starting_position_synchronises() {
        let mut engine = engine_with(vec![frame(STARTING_PLACEMENT)]);

        let update = engine.tick().await;
        assert!(matches!(
            &update,
            Update::Good { placement, notation: None, message, .. }
                if placement == STARTING_PLACEMENT && message == MSG_SYNCHRONISED
        ));
        assert!(engine.game().history().is_empty());
        assert_eq!(
            engine.live().encoded,
            Some(Position::starting().encode())
        );
    }

    #[tokio::test]
    async fn test_same_frame_twice_is_ignored() {
        let start = frame(STARTING_PLACEMENT);
        let mut engine = engine_with(vec![start.clone(), start]);

        assert!(engine.tick().await.is_observable());
        assert_eq!(engine.tick().await, Update::Ignore);
    }

    #[tokio::test]
    async fn test_same_midgame_frame_twice_is_ignored() {
        let lifted = frame("rnbqkbnr/pppppppp/8/8/8/8/PPPP1PPP/RNBQKBNR");
        let mut engine = engine_with(vec![lifted.clone(), lifted]);

        assert!(engine.tick().await.is_observable());
        assert_eq!(engine.tick().await, Update::Ignore);
    }

    #[tokio::test]
    async fn test_legal_move_with_gate_set() {
        let frames = sequence(&["e4"]).unwrap();
        let mut engine = engine_with(frames);

        engine.tick().await;
        assert!(engine.signal_turn(Color::White));

        let update = engine.tick().await;
        assert!(update.is_move());
        assert!(matches!(
            &update,
            Update::Good { notation: Some(n), .. } if n == "e4"
        ));
        assert_eq!(engine.game().history().len(), 1);
        assert!(!engine.is_gate_set());
        assert!(engine.live().legal);
    }

    #[tokio::test]
    async fn test_illegal_move_with_gate_set() {
        let mut engine = engine_with(vec![
            frame(STARTING_PLACEMENT),
            frame("rnbqkbnr/pppppppp/8/8/3PP3/8/PPP2PPP/RNBQKBNR"),
        ]);

        engine.tick().await;
        engine.signal_turn(Color::White);

        let update = engine.tick().await;
        assert!(matches!(
            &update,
            Update::Bad { message, placement: Some(_) } if message == MSG_ILLEGAL_MOVE
        ));
        assert!(engine.game().history().is_empty());
        assert!(!engine.live().legal);
        assert!(!engine.is_gate_set());
    }

    #[tokio::test]
    async fn test_lifted_piece_without_gate() {
        let mut engine = engine_with(vec![
            frame(STARTING_PLACEMENT),
            frame("rnbqkbnr/pppppppp/8/8/8/8/PPPP1PPP/RNBQKBNR"),
        ]);

        engine.tick().await;
        let update = engine.tick().await;

        assert!(matches!(
            &update,
            Update::Good { notation: None, message, .. } if message == MSG_BOARD_CHANGED
        ));
        assert!(engine.game().history().is_empty());
        assert_eq!(engine.game().placement(), STARTING_PLACEMENT);
    }

    #[tokio::test]
    async fn test_read_failure_leaves_state() {
        let mut engine = Engine::new(ScriptedBoard::new(vec![
            Ok(frame(STARTING_PLACEMENT)),
            Err(ProtocolError::ShortRead {
                expected: 67,
                received: 10,
            }),
            Ok(BoardFrame::new(vec![0x86, 0x00, 0x43, 1, 2, 3])),
        ]));

        engine.tick().await;
        let before = engine.live().clone();

        for _ in 0..2 {
            let update = engine.tick().await;
            assert_eq!(
                update,
                Update::Bad {
                    message: MSG_READ_FAILURE.to_string(),
                    placement: None,
                }
            );
            assert_eq!(engine.live(), &before);
        }
    }

    #[tokio::test]
    async fn test_signal_for_wrong_side_is_ignored() {
        let mut engine = engine_with(vec![]);
        assert!(!engine.signal_turn(Color::Black));
        assert!(!engine.is_gate_set());
        assert!(engine.signal_turn(Color::White));
        assert!(engine.is_gate_set());
    }

    #[tokio::test]
    async fn test_move_after_fixing_board() {
        let frames = sequence(&["e4"]).unwrap();
        let mut engine = engine_with(vec![
            frames[0].clone(),
            frame("rnbqkbnr/pppppppp/8/8/8/4P3/PPPP1PPP/RNBQKBN1"),
            frames[1].clone(),
        ]);

        engine.tick().await;
        engine.signal_turn(Color::White);
        assert!(matches!(engine.tick().await, Update::Bad { .. }));

        // 纠正棋盘后需要重新发出走子信号
        assert!(matches!(
            engine.tick().await,
            Update::Good { notation: None, .. }
        ));
        assert!(engine.signal_turn(Color::White));
        assert_eq!(engine.live().encoded, Some(frames[1].payload().try_into().unwrap()));
    }

    #[tokio::test]
    async fn test_event_for_update() {
        let frames = sequence(&["e4"]).unwrap();
        let mut engine = engine_with(frames);

        let sync = engine.tick().await;
        engine.signal_turn(Color::White);
        let moved = engine.tick().await;

        assert!(engine.event_for(&Update::Ignore).is_none());
        assert!(engine.event_for(&sync).is_some());

        let Some(BoardEvent::Update(event)) = engine.event_for(&moved) else {
            panic!("expected update event");
        };
        assert!(event.ok);
        assert!(event.legal);
        assert_eq!(event.move_notation.as_deref(), Some("e4"));
        assert_eq!(event.history, ["e4"]);
        assert_eq!(event.pgn, "1. e4");
        assert_eq!(event.side_to_move, Color::Black);
        assert!(event.ascii.is_some());
    }
}
