//! 事件分发
//!
//! 每次 tick 的 Good/Bad 结果广播给所有订阅者（控制台、外部转发），Ignore 不发送

use tokio::sync::broadcast;
use tracing::trace;

use protocol::BoardEvent;

/// 广播通道容量，订阅者落后超过此数量会丢失最旧的事件
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 事件中心
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<BoardEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.sender.subscribe()
    }

    /// 发布事件，返回收到的订阅者数量
    pub fn publish(&self, event: BoardEvent) -> usize {
        // 没有订阅者时发送会失败，这是正常情况
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(receivers, "事件已发布");
        receivers
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
