//! 桥接配置
//!
//! 从 JSON 文件加载，缺失的字段取默认值，之后再由命令行参数覆盖

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use protocol::{DEFAULT_BAUD_RATE, POLL_INTERVAL_MS};

/// 默认串口设备
pub const DEFAULT_DEVICE: &str = "/dev/tty.usbmodem1101";

/// 配置错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("转发地址格式应为 host:port: {0}")]
    ForwardAddress(String),

    #[error("无效的端口号: {0}")]
    Port(String),
}

/// 外部转发配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub host: String,
    pub port: u16,
    /// 发布使用的频道名
    pub channel: String,
    /// 断线重连间隔（毫秒）
    pub reconnect_interval_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7000,
            channel: "chess".to_string(),
            reconnect_interval_ms: 3000,
        }
    }
}

impl ForwardConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 串口设备路径
    pub device: String,
    pub baud_rate: u32,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 使用模拟棋盘
    pub simulate: bool,
    /// 模拟棋盘每步用时（毫秒）
    pub simulator_move_time_ms: u64,
    /// 外部转发，不配置则不转发
    pub forward: Option<ForwardConfig>,
    /// 结束时保存棋谱
    pub save_games: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: POLL_INTERVAL_MS,
            simulate: false,
            simulator_move_time_ms: 5000,
            forward: None,
            save_games: true,
        }
    }
}

impl BridgeConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("board-bridge");
            path.push("config.json");
            path
        })
    }

    /// 从文件加载，文件不存在时使用默认配置
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("配置文件 {:?} 不存在，使用默认配置", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效 {:?}", path))?;
        info!("已加载配置: {:?}", path);
        Ok(config)
    }

    /// 保存到文件
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录 {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("写入配置文件失败 {:?}", path))?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn simulator_move_time(&self) -> Duration {
        Duration::from_millis(self.simulator_move_time_ms)
    }
}

/// 解析 `host:port`
pub fn parse_forward_addr(addr: &str) -> Result<(String, u16), ConfigError> {
    let (host, port) = addr
        .rsplit_once(':')
        .filter(|(host, _)| !host.is_empty())
        .ok_or_else(|| ConfigError::ForwardAddress(addr.to_string()))?;
    let port = port
        .parse()
        .map_err(|_| ConfigError::Port(port.to_string()))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = BridgeConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "device": "/dev/ttyACM0", "forward": { "port": 9000 } }"#,
        )
        .unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.device, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);

        let forward = config.forward.unwrap();
        assert_eq!(forward.port, 9000);
        assert_eq!(forward.channel, "chess");
        assert_eq!(forward.reconnect_interval(), Duration::from_millis(3000));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(BridgeConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = BridgeConfig {
            simulate: true,
            poll_interval_ms: 250,
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_parse_forward_addr() {
        assert_eq!(
            parse_forward_addr("localhost:7000"),
            Ok(("localhost".to_string(), 7000))
        );
        assert_eq!(
            parse_forward_addr("localhost"),
            Err(ConfigError::ForwardAddress("localhost".to_string()))
        );
        assert_eq!(
            parse_forward_addr(":7000"),
            Err(ConfigError::ForwardAddress(":7000".to_string()))
        );
        assert_eq!(
            parse_forward_addr("localhost:http"),
            Err(ConfigError::Port("http".to_string()))
        );
    }
}
