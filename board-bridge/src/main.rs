use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use board_bridge::{
    cli, console, input, serial, turn_channel, BridgeConfig, Engine, EventHub, Forwarder,
    GameArchive, Scheduler, Simulator, DEMO_GAME,
};
use protocol::{BoardDevice, Color, GameRecord};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("board_bridge=debug".parse()?))
        .init();

    let matches = cli::command().get_matches();
    let mut config = match cli::config_path(&matches) {
        Some(path) => BridgeConfig::load(&path)?,
        None => {
            warn!("无法获取配置目录，使用默认配置");
            BridgeConfig::default()
        }
    };
    cli::apply(&mut config, &matches)?;

    info!("DGT 电子棋盘桥接启动中...");

    let (turn_tx, turn_rx) = turn_channel();
    let record = if config.simulate {
        let simulator = Simulator::new(DEMO_GAME).context("生成模拟对局失败")?;
        simulator.spawn_driver(turn_tx.clone(), config.simulator_move_time());
        run_bridge(simulator, &config, turn_tx, turn_rx).await?
    } else {
        let link = serial::open(&config.device, config.baud_rate)?;
        run_bridge(link, &config, turn_tx, turn_rx).await?
    };

    println!("{}", record.to_pgn());

    if config.save_games && !record.moves.is_empty() {
        match GameArchive::open_default().and_then(|archive| archive.save(&record)) {
            Ok(game_id) => info!("棋谱已存档: {}", game_id),
            Err(e) => warn!("棋谱存档失败: {:#}", e),
        }
    }

    Ok(())
}

/// 连接棋盘并轮询到断线为止，返回对局棋谱
async fn run_bridge<D: BoardDevice>(
    mut device: D,
    config: &BridgeConfig,
    turn_tx: mpsc::Sender<Color>,
    turn_rx: mpsc::Receiver<Color>,
) -> Result<GameRecord> {
    device.reset().await.context("棋盘复位失败")?;
    let serial_number = device
        .serial_number()
        .await
        .context("读取棋盘序列号失败")?;
    let version = device
        .version()
        .await
        .context("读取棋盘版本失败")?;
    info!(serial = %serial_number, %version, "棋盘已连接");

    // Ctrl+C 按断线处理，让调度器正常结束并输出棋谱
    let status = device.status();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("收到中断信号，停止轮询");
            status.mark_disconnected();
        }
    });

    let hub = EventHub::new();
    let console = console::spawn(hub.subscribe());
    let forwarder = config
        .forward
        .clone()
        .map(|forward| tokio::spawn(Forwarder::new(forward, hub.subscribe()).run()));
    input::spawn_stdin(turn_tx);
    println!("每走完一步输入 w（白方）或 b（黑方）并回车");

    let engine = Scheduler::new(Engine::new(device), hub, turn_rx, config.poll_interval())
        .run()
        .await;

    // 调度器结束后事件通道关闭，等待订阅者处理完剩余事件
    let _ = console.await;
    if let Some(forwarder) = forwarder {
        let _ = forwarder.await;
    }

    Ok(engine.game().record())
}
