//! 走子信号输入
//!
//! 从标准输入逐行读取：`w` 表示白方刚走完，`b` 表示黑方刚走完。
//! 交互输入放在独立线程里阻塞读取，不占用运行时的阻塞线程池。

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use protocol::Color;

/// 解析一行输入
pub fn parse_turn(line: &str) -> Option<Color> {
    match line.trim().to_ascii_lowercase().as_str() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

/// 把输入流中的信号转发到通道，输入结束或通道关闭时返回
pub fn forward_turns<R: BufRead>(reader: R, turns: mpsc::Sender<Color>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("读取输入失败: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(color) = parse_turn(&line) else {
            warn!("无法识别的输入 {:?}，应为 w 或 b", line.trim());
            continue;
        };
        debug!(?color, "收到输入的走子信号");
        if turns.blocking_send(color).is_err() {
            break;
        }
    }
}

/// 启动标准输入读取线程
pub fn spawn_stdin(turns: mpsc::Sender<Color>) {
    thread::spawn(move || forward_turns(std::io::stdin().lock(), turns));
}
