//! 命令行参数

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::{parse_forward_addr, BridgeConfig, ConfigError, ForwardConfig};

/// 构建命令行定义
pub fn command() -> Command {
    Command::new("board-bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("把 DGT 电子棋盘接入经过规则验证的对局")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("配置文件（默认 <配置目录>/board-bridge/config.json）")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .value_name("PATH")
                .help("棋盘所在的串口设备"),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .value_name("RATE")
                .help("串口波特率")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("poll-ms")
                .long("poll-ms")
                .value_name("MS")
                .help("两次读盘之间的间隔（毫秒）")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .help("使用内置模拟棋盘代替串口设备")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("forward")
                .long("forward")
                .value_name("HOST:PORT")
                .help("把棋盘事件以 JSON 行转发到该地址"),
        )
}

/// 配置文件路径：命令行优先
pub fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .or_else(BridgeConfig::default_path)
}

/// 用命令行参数覆盖配置
pub fn apply(config: &mut BridgeConfig, matches: &ArgMatches) -> Result<(), ConfigError> {
    if let Some(device) = matches.get_one::<String>("device") {
        config.device = device.clone();
    }
    if let Some(&baud) = matches.get_one::<u32>("baud") {
        config.baud_rate = baud;
    }
    if let Some(&poll_ms) = matches.get_one::<u64>("poll-ms") {
        config.poll_interval_ms = poll_ms;
    }
    if matches.get_flag("simulate") {
        config.simulate = true;
    }
    if let Some(addr) = matches.get_one::<String>("forward") {
        let (host, port) = parse_forward_addr(addr)?;
        let forward = config.forward.get_or_insert_with(ForwardConfig::default);
        forward.host = host;
        forward.port = port;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgMatches {
        command()
            .try_get_matches_from(std::iter::once("board-bridge").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = BridgeConfig::default();
        apply(&mut config, &parse(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = BridgeConfig::default();
        let matches = parse(&[
            "--device",
            "/dev/ttyUSB0",
            "--baud",
            "19200",
            "--poll-ms",
            "250",
            "--simulate",
            "--forward",
            "10.0.0.2:7001",
        ]);
        apply(&mut config, &matches).unwrap();

        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.poll_interval_ms, 250);
        assert!(config.simulate);

        let forward = config.forward.unwrap();
        assert_eq!(forward.host, "10.0.0.2");
        assert_eq!(forward.port, 7001);
        assert_eq!(forward.channel, "chess");
    }

    #[test]
    fn test_forward_keeps_configured_channel() {
        let mut config = BridgeConfig {
            forward: Some(ForwardConfig {
                channel: "board".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply(&mut config, &parse(&["--forward", "host:1"])).unwrap();
        assert_eq!(config.forward.unwrap().channel, "board");
    }

    #[test]
    fn test_bad_values() {
        assert!(command()
            .try_get_matches_from(["board-bridge", "--baud", "fast"])
            .is_err());

        let mut config = BridgeConfig::default();
        let matches = parse(&["--forward", "nowhere"]);
        assert!(apply(&mut config, &matches).is_err());
    }

    #[test]
    fn test_config_path_flag() {
        let matches = parse(&["--config", "/tmp/bridge.json"]);
        assert_eq!(config_path(&matches), Some(PathBuf::from("/tmp/bridge.json")));
    }
}
