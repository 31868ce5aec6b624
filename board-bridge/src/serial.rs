//! 串口传输
//!
//! serialport 是阻塞接口：读、写各用一个线程，通过 `tokio::io::duplex`
//! 接到异步一侧，对外仍是普通的 `BoardLink`。读线程遇到致命错误时关闭管道并标记断线。

use std::io::{Read, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use serialport::SerialPort;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{BoardLink, LinkStatus};

/// 串口读超时，超时只是没有数据，继续读
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// 管道缓冲区大小
const PIPE_CAPACITY: usize = 1024;

/// 经由串口的棋盘连接
pub type SerialLink = BoardLink<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// 打开串口并建立连接
pub fn open(path: &str, baud_rate: u32) -> anyhow::Result<SerialLink> {
    let port = serialport::new(path, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("无法打开串口 {}", path))?;
    let writer = port
        .try_clone()
        .context("无法复制串口句柄")?;
    info!("已打开串口 {}，波特率 {}", path, baud_rate);

    let status = LinkStatus::new();
    let (link_side, port_side) = tokio::io::duplex(PIPE_CAPACITY);
    let (mut pipe_reader, mut pipe_writer) = tokio::io::split(port_side);

    // 串口 → 管道
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<Vec<u8>>(64);
    spawn_reader(port, chunk_tx, status.clone());
    tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            if pipe_writer.write_all(&chunk).await.is_err() {
                break;
            }
        }
        // 读线程结束，让连接读到 EOF
        let _ = pipe_writer.shutdown().await;
    });

    // 管道 → 串口
    let (cmd_tx, cmd_rx) = std_mpsc::channel::<Vec<u8>>();
    spawn_writer(writer, cmd_rx, status.clone());
    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        loop {
            match pipe_reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if cmd_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let (reader, writer) = tokio::io::split(link_side);
    Ok(BoardLink::with_status(reader, writer, status))
}

fn spawn_reader(mut port: Box<dyn SerialPort>, chunks: mpsc::Sender<Vec<u8>>, status: LinkStatus) {
    thread::spawn(move || {
        let mut buf = [0u8; 256];
        loop {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    if chunks.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!("串口读取失败: {}", e);
                    status.mark_disconnected();
                    break;
                }
            }
        }
        debug!("串口读线程结束");
    });
}

fn spawn_writer(
    mut port: Box<dyn SerialPort>,
    commands: std_mpsc::Receiver<Vec<u8>>,
    status: LinkStatus,
) {
    thread::spawn(move || {
        for bytes in commands {
            if let Err(e) = port.write_all(&bytes).and_then(|_| port.flush()) {
                warn!("串口写入失败: {}", e);
                status.mark_disconnected();
                break;
            }
        }
        debug!("串口写线程结束");
    });
}
