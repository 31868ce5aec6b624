//! 传输层
//!
//! 棋盘通过字节流（串口）通信，底层一次读取返回多少字节没有任何保证，
//! 一条回复可能被拆成多段，也可能和下一条粘在一起。这里负责：
//! - 写入单字节指令
//! - 按预期长度收齐一条回复
//! - 把格子更新流重新切分为 5 字节的帧
//!
//! `BoardDevice` trait 让上层与具体设备（真实棋盘、模拟器）解耦。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{
    split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf,
};
use tracing::{debug, trace};

use crate::board::{BoardFrame, FieldUpdate};
use crate::constants::{
    BOARD_DUMP_LEN, FIELD_UPDATE_LEN, HEADER_LEN, OP_BOARD_DUMP, OP_RESET, OP_SERIAL_NUMBER,
    OP_UPDATE_BOARD, OP_VERSION, SERIAL_NUMBER_LEN, VERSION_LEN,
};
use crate::error::{ProtocolError, Result};

/// 单次读取的缓冲区大小
const READ_CHUNK_SIZE: usize = 64;

/// 连接状态，可在任务间共享
///
/// 底层传输发现断线后置位，轮询循环在每次 tick 开始前检查
#[derive(Clone, Debug, Default)]
pub struct LinkStatus {
    disconnected: Arc<AtomicBool>,
}

impl LinkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记为已断线
    pub fn mark_disconnected(&self) {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            debug!("棋盘连接已标记为断开");
        }
    }

    /// 是否已断线
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

/// 棋盘设备抽象 trait（核心抽象，用于对账引擎）
#[async_trait]
pub trait BoardDevice: Send {
    /// 复位棋盘
    async fn reset(&mut self) -> Result<()>;

    /// 读取整盘数据帧
    async fn board_frame(&mut self) -> Result<BoardFrame>;

    /// 读取序列号
    async fn serial_number(&mut self) -> Result<String>;

    /// 读取固件版本（"主版本.次版本"）
    async fn version(&mut self) -> Result<String>;

    /// 连接状态
    fn status(&self) -> LinkStatus;
}

/// 棋盘连接：独占一个读端和一个写端
///
/// 格子更新流的半帧和已读出未取走的帧保存在连接上，重新订阅时继续使用
#[derive(Debug)]
pub struct BoardLink<R, W> {
    reader: R,
    writer: W,
    status: LinkStatus,
    assembler: FieldUpdateAssembler,
    pending: VecDeque<[u8; FIELD_UPDATE_LEN]>,
}

impl<S: AsyncRead + AsyncWrite> BoardLink<ReadHalf<S>, WriteHalf<S>> {
    /// 从双向字节流创建
    pub fn from_stream(stream: S) -> Self {
        let (reader, writer) = split(stream);
        Self {
            reader,
            writer,
            status: LinkStatus::new(),
            assembler: FieldUpdateAssembler::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<R, W> BoardLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// 创建新的棋盘连接
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_status(reader, writer, LinkStatus::new())
    }

    /// 使用外部共享的连接状态创建（底层传输也会置位断线标记）
    pub fn with_status(reader: R, writer: W, status: LinkStatus) -> Self {
        Self {
            reader,
            writer,
            status,
            assembler: FieldUpdateAssembler::new(),
            pending: VecDeque::new(),
        }
    }

    /// 写入单字节指令
    pub async fn send(&mut self, opcode: u8) -> Result<()> {
        trace!(opcode = format_args!("{:#04x}", opcode), "发送指令");
        let result = async {
            self.writer.write_all(&[opcode]).await?;
            self.writer.flush().await
        }
        .await;

        result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                self.status.mark_disconnected();
                ProtocolError::ConnectionClosed
            } else {
                ProtocolError::Io(e)
            }
        })
    }

    /// 写入指令并收齐 `expected_len` 字节的回复
    ///
    /// 回复收齐前连接关闭则返回 `ShortRead`
    pub async fn request(&mut self, opcode: u8, expected_len: usize) -> Result<Vec<u8>> {
        self.send(opcode).await?;

        let mut message = vec![0u8; expected_len];
        let mut received = 0;
        while received < expected_len {
            // 只读到本条回复的末尾，多出来的字节留给下一次读取
            let n = self.read_some(&mut message[received..]).await?;
            if n == 0 {
                return Err(ProtocolError::ShortRead {
                    expected: expected_len,
                    received,
                });
            }
            received += n;
        }

        trace!(opcode = format_args!("{:#04x}", opcode), len = received, "收到回复");
        Ok(message)
    }

    /// 订阅格子更新流，接着上一次订阅未处理完的字节继续
    pub fn subscribe_updates(&mut self) -> UpdateSubscription<'_, R, W> {
        UpdateSubscription { link: self }
    }

    /// 读取任意长度的一段数据，返回 0 表示连接已关闭
    async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.reader.read(buf).await?;
        if n == 0 {
            self.status.mark_disconnected();
        }
        Ok(n)
    }
}

#[async_trait]
impl<R, W> BoardDevice for BoardLink<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn reset(&mut self) -> Result<()> {
        self.request(OP_RESET, 0).await.map(|_| ())
    }

    async fn board_frame(&mut self) -> Result<BoardFrame> {
        let bytes = self.request(OP_BOARD_DUMP, BOARD_DUMP_LEN).await?;
        Ok(BoardFrame::new(bytes))
    }

    async fn serial_number(&mut self) -> Result<String> {
        let message = self.request(OP_SERIAL_NUMBER, SERIAL_NUMBER_LEN).await?;
        let serial = String::from_utf8_lossy(&message[HEADER_LEN..]);
        Ok(serial.trim_end_matches('\0').to_string())
    }

    async fn version(&mut self) -> Result<String> {
        let message = self.request(OP_VERSION, VERSION_LEN).await?;
        Ok(format!("{}.{}", message[HEADER_LEN], message[HEADER_LEN + 1]))
    }

    fn status(&self) -> LinkStatus {
        self.status.clone()
    }
}

/// 格子更新帧重组器
///
/// 固定 5 字节缓冲区，每收满一帧就输出并清空；一段数据可以跨越多帧
#[derive(Debug, Default)]
pub struct FieldUpdateAssembler {
    buffer: [u8; FIELD_UPDATE_LEN],
    filled: usize,
}

impl FieldUpdateAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推入一段数据，返回其中已完整的帧
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<[u8; FIELD_UPDATE_LEN]> {
        let mut frames = Vec::new();
        while !chunk.is_empty() {
            let take = (FIELD_UPDATE_LEN - self.filled).min(chunk.len());
            self.buffer[self.filled..self.filled + take].copy_from_slice(&chunk[..take]);
            self.filled += take;
            chunk = &chunk[take..];

            if self.filled == FIELD_UPDATE_LEN {
                frames.push(self.buffer);
                self.buffer = [0; FIELD_UPDATE_LEN];
                self.filled = 0;
            }
        }
        frames
    }

    /// 当前缓冲的半帧字节数
    pub fn buffered(&self) -> usize {
        self.filled
    }
}

/// 格子更新订阅
///
/// 惰性、无上限的帧序列；丢弃后可重新订阅，不丢字节
pub struct UpdateSubscription<'a, R, W> {
    link: &'a mut BoardLink<R, W>,
}

impl<R, W> UpdateSubscription<'_, R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// 下一条完整的 5 字节帧，连接在帧边界关闭时返回 `None`
    pub async fn next_frame(&mut self) -> Result<Option<[u8; FIELD_UPDATE_LEN]>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.link.pending.pop_front() {
                return Ok(Some(frame));
            }

            // 棋盘只在收到请求后才上报一批变化，每轮收集前重新请求
            if self.link.assembler.buffered() == 0 {
                match self.link.send(OP_UPDATE_BOARD).await {
                    // 在帧边界断线视为序列结束
                    Err(ProtocolError::ConnectionClosed) => return Ok(None),
                    other => other?,
                }
            }

            let n = self.link.read_some(&mut chunk).await?;
            if n == 0 {
                return match self.link.assembler.buffered() {
                    0 => Ok(None),
                    received => Err(ProtocolError::ShortRead {
                        expected: FIELD_UPDATE_LEN,
                        received,
                    }),
                };
            }
            let frames = self.link.assembler.push(&chunk[..n]);
            self.link.pending.extend(frames);
        }
    }

    /// 下一条解码后的格子更新
    pub async fn next_update(&mut self) -> Result<Option<FieldUpdate>> {
        match self.next_frame().await? {
            Some(frame) => Ok(Some(FieldUpdate::decode(&frame)?)),
            None => Ok(None),
        }
    }
}
