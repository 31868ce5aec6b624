//! 控制台显示

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use protocol::{BoardEvent, Position};

/// 把事件渲染为控制台文本
pub fn render(event: &BoardEvent) -> String {
    let BoardEvent::Update(update) = event else {
        return "棋盘已断开".to_string();
    };

    let mut text = String::new();
    if let Some(position) = update
        .placement
        .as_deref()
        .and_then(|placement| Position::from_placement(placement).ok())
    {
        text.push_str(&position.pretty());
        text.push('\n');
    }
    if !update.ok {
        text.push_str("! ");
    }
    text.push_str(&update.message);
    if !update.pgn.is_empty() {
        text.push('\n');
        text.push_str(&update.pgn);
    }
    text
}

/// 启动控制台输出任务
pub fn spawn(mut events: broadcast::Receiver<BoardEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}\n", render(&event)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "控制台处理过慢，丢失部分事件"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
