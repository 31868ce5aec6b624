//! 轮询调度
//!
//! 协作式循环：上一次 tick 的结果处理完毕后才开始计时下一次，
//! 因此任何时刻最多只有一次整盘读取在进行。

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use protocol::{BoardDevice, BoardEvent, Color};

use crate::engine::Engine;
use crate::hub::EventHub;

/// 走子信号通道容量
pub const TURN_CHANNEL_CAPACITY: usize = 16;

/// 创建走子信号通道
pub fn turn_channel() -> (mpsc::Sender<Color>, mpsc::Receiver<Color>) {
    mpsc::channel(TURN_CHANNEL_CAPACITY)
}

/// 轮询调度器
pub struct Scheduler<D> {
    engine: Engine<D>,
    hub: EventHub,
    turns: mpsc::Receiver<Color>,
    poll_interval: Duration,
}

impl<D: BoardDevice> Scheduler<D> {
    pub fn new(
        engine: Engine<D>,
        hub: EventHub,
        turns: mpsc::Receiver<Color>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            hub,
            turns,
            poll_interval,
        }
    }

    /// 运行到棋盘断线为止，返回引擎以便读取最终对局
    pub async fn run(mut self) -> Engine<D> {
        let status = self.engine.status();
        info!(interval = ?self.poll_interval, "开始轮询");

        loop {
            if status.is_disconnected() {
                info!("棋盘已断开，停止轮询");
                self.hub.publish(BoardEvent::Disconnected);
                break;
            }

            // 信号只在两次 tick 之间生效
            while let Ok(color) = self.turns.try_recv() {
                self.engine.signal_turn(color);
            }

            let update = self.engine.tick().await;
            if let Some(event) = self.engine.event_for(&update) {
                debug!(?update, "发布更新");
                self.hub.publish(event);
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        self.engine
    }
}
