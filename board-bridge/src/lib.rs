//! DGT 电子棋盘桥接
//!
//! 包含:
//! - 对局状态（shakmaty 规则引擎）
//! - 着法对账引擎
//! - 轮询调度与事件分发
//! - 串口连接、模拟棋盘
//! - 控制台显示、外部转发、走子信号输入
//! - 配置与棋谱存档

pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod forward;
pub mod game;
pub mod hub;
pub mod input;
pub mod scheduler;
pub mod serial;
pub mod simulator;
pub mod storage;

pub use config::{BridgeConfig, ConfigError, ForwardConfig};
pub use engine::{Engine, LiveBoardState};
pub use forward::Forwarder;
pub use game::GameState;
pub use hub::EventHub;
pub use scheduler::{turn_channel, Scheduler};
pub use simulator::{Simulator, DEMO_GAME};
pub use storage::{GameArchive, SavedGameInfo};
