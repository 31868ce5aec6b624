//! 外部转发
//!
//! 通过 TCP 把每个棋盘事件以一行 JSON `{"channel": ..., "payload": ...}` 发给发布/订阅服务。
//! 未连接时事件先排队，重连成功后按顺序补发。

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use protocol::BoardEvent;

use crate::config::ForwardConfig;

/// 连接超时
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// 排队上限，超过后丢弃最旧的事件
const MAX_QUEUED: usize = 1024;

#[derive(Serialize)]
struct Envelope<'a> {
    channel: &'a str,
    payload: &'a BoardEvent,
}

/// 序列化为一行消息（含换行）
pub fn envelope_line(channel: &str, event: &BoardEvent) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&Envelope {
        channel,
        payload: event,
    })?;
    line.push('\n');
    Ok(line)
}

/// 事件转发器
pub struct Forwarder {
    config: ForwardConfig,
    events: broadcast::Receiver<BoardEvent>,
    queue: VecDeque<String>,
    stream: Option<TcpStream>,
}

impl Forwarder {
    pub fn new(config: ForwardConfig, events: broadcast::Receiver<BoardEvent>) -> Self {
        Self {
            config,
            events,
            queue: VecDeque::new(),
            stream: None,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// 运行到事件通道关闭为止
    pub async fn run(mut self) {
        let mut retry = tokio::time::interval(self.config.reconnect_interval());
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.events.recv() => match received {
                    Ok(event) => {
                        self.enqueue(&event);
                        self.flush().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "转发处理过慢，丢失部分事件");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = retry.tick(), if self.stream.is_none() => {
                    self.connect().await;
                    self.flush().await;
                }
            }
        }

        // 通道关闭前最后一次尝试发出积压的事件
        if !self.queue.is_empty() && self.stream.is_none() {
            self.connect().await;
        }
        self.flush().await;
        if !self.queue.is_empty() {
            warn!(pending = self.queue.len(), "转发已停止，仍有事件未发出");
        }
    }

    fn enqueue(&mut self, event: &BoardEvent) {
        match envelope_line(&self.config.channel, event) {
            Ok(line) => {
                if self.queue.len() >= MAX_QUEUED {
                    self.queue.pop_front();
                }
                self.queue.push_back(line);
            }
            Err(e) => warn!("序列化事件失败: {}", e),
        }
    }

    async fn connect(&mut self) {
        let addr = self.addr();
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                info!("已连接转发目标 {}", addr);
                self.stream = Some(stream);
            }
            Ok(Err(e)) => debug!("转发目标 {} 不可用: {}", addr, e),
            Err(_) => debug!("连接转发目标 {} 超时", addr),
        }
    }

    async fn flush(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        while let Some(line) = self.queue.front() {
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                warn!("转发连接断开: {}", e);
                self.stream = None;
                return;
            }
            self.queue.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    use crate::hub::EventHub;

    fn config(port: u16) -> ForwardConfig {
        ForwardConfig {
            host: "127.0.0.1".to_string(),
            port,
            channel: "chess".to_string(),
            reconnect_interval_ms: 50,
        }
    }

    async fn read_lines(listener: &TcpListener, count: usize) -> Vec<serde_json::Value> {
        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();
        let mut values = Vec::new();
        for _ in 0..count {
            let line = lines.next_line().await.unwrap().unwrap();
            values.push(serde_json::from_str(&line).unwrap());
        }
        values
    }

    #[test]
    fn test_envelope_line() {
        let line = envelope_line("chess", &BoardEvent::Disconnected).unwrap();
        assert_eq!(
            line,
            "{\"channel\":\"chess\",\"payload\":{\"type\":\"Disconnected\"}}\n"
        );
    }

    #[tokio::test]
    async fn test_forwards_events_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let hub = EventHub::new();
        let forwarder = tokio::spawn(Forwarder::new(config(port), hub.subscribe()).run());

        let reader = tokio::spawn(async move { read_lines(&listener, 2).await });
        hub.publish(BoardEvent::Disconnected);
        hub.publish(BoardEvent::Disconnected);

        let values = timeout(Duration::from_secs(5), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["channel"], "chess");
        assert_eq!(values[0]["payload"]["type"], "Disconnected");

        drop(hub);
        timeout(Duration::from_secs(5), forwarder)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_queues_until_target_available() {
        // 先拿到一个空闲端口，此时没有服务在监听
        let port = {
            let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
            probe.local_addr().unwrap().port()
        };

        let hub = EventHub::new();
        let forwarder = tokio::spawn(Forwarder::new(config(port), hub.subscribe()).run());

        hub.publish(BoardEvent::Disconnected);
        tokio::time::sleep(Duration::from_millis(120)).await;

        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let values = timeout(Duration::from_secs(5), read_lines(&listener, 1))
            .await
            .unwrap();
        assert_eq!(values[0]["payload"]["type"], "Disconnected");

        drop(hub);
        timeout(Duration::from_secs(5), forwarder)
            .await
            .unwrap()
            .unwrap();
    }
}
