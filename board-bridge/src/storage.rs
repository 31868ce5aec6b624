//! 棋谱存档
//!
//! 对局结束（棋盘断线）时把棋谱保存为 JSON 和 PGN 两份文件

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use protocol::GameRecord;

/// 存档信息
#[derive(Debug, Clone)]
pub struct SavedGameInfo {
    pub game_id: String,
    pub started_at: DateTime<Utc>,
    pub move_count: usize,
}

/// 棋谱存档
pub struct GameArchive {
    dir: PathBuf,
}

impl GameArchive {
    /// 使用默认目录 `<data dir>/board-bridge/games`
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir().context("无法获取应用数据目录")?;
        Self::open(data_dir.join("board-bridge").join("games"))
    }

    /// 使用指定目录，不存在则创建
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("无法创建存储目录: {:?}", dir))?;
        }
        Ok(Self { dir })
    }

    /// 保存棋谱，返回存档 ID（JSON 文件名）
    pub fn save(&self, record: &GameRecord) -> Result<String> {
        let stem = self.unused_stem(&record.started_at.format("%Y%m%d_%H%M%S").to_string());
        let game_id = format!("{}.json", stem);

        let json = record.to_json().context("序列化棋谱失败")?;
        let json_path = self.dir.join(&game_id);
        fs::write(&json_path, json).with_context(|| format!("写入文件失败: {:?}", json_path))?;

        let pgn_path = self.dir.join(format!("{}.pgn", stem));
        fs::write(&pgn_path, record.to_pgn())
            .with_context(|| format!("写入文件失败: {:?}", pgn_path))?;

        info!("棋谱已保存: {:?}", json_path);
        Ok(game_id)
    }

    /// 同一秒开始的对局加序号区分，不覆盖已有存档
    fn unused_stem(&self, base: &str) -> String {
        let taken = |stem: &str| {
            self.dir.join(format!("{}.json", stem)).exists()
                || self.dir.join(format!("{}.pgn", stem)).exists()
        };
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|stem| !taken(stem))
            .unwrap_or_else(|| base.to_string())
    }

    /// 加载棋谱
    pub fn load(&self, game_id: &str) -> Result<GameRecord> {
        let path = self.dir.join(game_id);
        if !path.exists() {
            anyhow::bail!("棋谱文件不存在: {}", game_id);
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("读取文件失败: {:?}", path))?;
        GameRecord::from_json(&content).context("解析棋谱文件失败")
    }

    /// 列出所有存档，最新的在前
    pub fn list(&self) -> Result<Vec<SavedGameInfo>> {
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("读取存储目录失败: {:?}", self.dir))?;

        let mut games = Vec::new();
        for entry in entries {
            let path = entry.context("读取目录项失败")?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(game_id) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            // 跳过损坏的文件
            if let Ok(record) = self.load(game_id) {
                games.push(SavedGameInfo {
                    game_id: game_id.to_string(),
                    started_at: record.started_at,
                    move_count: record.moves.len(),
                });
            }
        }

        games.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(games)
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }
}
