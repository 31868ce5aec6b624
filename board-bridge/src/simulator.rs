//! 模拟棋盘
//!
//! 没有实体棋盘时使用：按着法列表预先生成每一步之后的整盘数据帧，
//! 每隔一段时间前进一步，并在半程时替走棋方发出走子信号。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Position as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use protocol::{BoardDevice, BoardFrame, Color, LinkStatus, Result};

use crate::game::position_of;

/// 演示对局
pub const DEMO_GAME: &[&str] = &[
    "d4", "Nf6", "Nf3", "d5", "e3", "Bf5", "c4", "c6", "Nc3", "e6", "Bd3", "Bxd3", "Qxd3",
    "Nbd7", "b3", "Bd6", "O-O", "O-O", "Bb2", "Qe7", "Rad1", "Rad8", "Rfe1", "dxc4", "bxc4",
    "e5", "dxe5", "Nxe5", "Nxe5", "Bxe5", "Qe2", "Rxd1", "Rxd1", "Rd8", "Rxd8+", "Qxd8", "Qd1",
    "Qxd1+", "Nxd1", "Bxb2", "Nxb2", "b5", "f3", "Kf8", "Kf2", "Ke7",
];

/// 生成初始局面及每一步之后的整盘数据帧
pub fn sequence(moves: &[&str]) -> anyhow::Result<Vec<BoardFrame>> {
    let mut chess = Chess::default();
    let mut frames = Vec::with_capacity(moves.len() + 1);
    frames.push(BoardFrame::from_position(&position_of(chess.board())));

    for text in moves {
        let san: SanPlus = text
            .parse()
            .map_err(|e| anyhow!("无法解析着法 {}: {}", text, e))?;
        let m = san
            .san
            .to_move(&chess)
            .map_err(|e| anyhow!("非法着法 {}: {}", text, e))?;
        chess.play_unchecked(&m);
        frames.push(BoardFrame::from_position(&position_of(chess.board())));
    }

    Ok(frames)
}

/// 模拟棋盘
#[derive(Clone)]
pub struct Simulator {
    frames: Arc<Vec<BoardFrame>>,
    index: Arc<AtomicUsize>,
    status: LinkStatus,
}

impl Simulator {
    /// 按着法列表创建
    pub fn new(moves: &[&str]) -> anyhow::Result<Self> {
        Ok(Self {
            frames: Arc::new(sequence(moves)?),
            index: Arc::new(AtomicUsize::new(0)),
            status: LinkStatus::new(),
        })
    }

    /// 当前展示的是第几步之后的局面
    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// 前进一步，返回走这一步的一方；已到最后一步则返回 None
    pub fn advance(&self) -> Option<Color> {
        let next = self.current_index() + 1;
        if next >= self.frames.len() {
            return None;
        }
        self.index.store(next, Ordering::SeqCst);
        // 第奇数步是白方走的
        Some(if next % 2 == 1 { Color::White } else { Color::Black })
    }

    /// 启动驱动任务：每个 `move_time` 前进一步，半程时发出走子信号
    pub fn spawn_driver(&self, turns: mpsc::Sender<Color>, move_time: Duration) -> JoinHandle<()> {
        let simulator = self.clone();
        tokio::spawn(async move {
            let half = move_time / 2;
            loop {
                tokio::time::sleep(move_time - half).await;
                let Some(color) = simulator.advance() else {
                    info!("模拟对局已走完");
                    break;
                };
                debug!(index = simulator.current_index(), ?color, "模拟棋盘前进一步");

                tokio::time::sleep(half).await;
                if turns.send(color).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[async_trait]
impl BoardDevice for Simulator {
    async fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    async fn board_frame(&mut self) -> Result<BoardFrame> {
        Ok(self.frames[self.current_index()].clone())
    }

    async fn serial_number(&mut self) -> Result<String> {
        Ok("mock".to_string())
    }

    async fn version(&mut self) -> Result<String> {
        Ok("1.0".to_string())
    }

    fn status(&self) -> LinkStatus {
        self.status.clone()
    }
}
