//! 통합 게임센터 실행 파일
//!
//! `start`(기본값)는 세 서버를 모두, `login`/`game`/`message`는 해당 서버만 실행합니다.

use anyhow::{Context, Result};
use tracing::{error, info};

use gamecenter::{GameCenterConfig, ServerManager};
use shared::logging::{init_logging, ServiceType};
use shared::service::password_helper::DEFAULT_COST;

/// 설정대로 서버를 띄우고 종료 시그널까지 대기
async fn run(config: GameCenterConfig) -> Result<()> {
    let manager = ServerManager::from_config(config, DEFAULT_COST).context("서버 구성 실패")?;

    manager.start_all().await.context("서버 시작 실패")?;
    manager.print_status();
    info!("🎮 게임센터 실행 중. Ctrl+C로 중지할 수 있습니다.");

    manager.wait_for_shutdown().await
}

/// 지정한 서버만 활성화
fn only(mut config: GameCenterConfig, name: &str) -> GameCenterConfig {
    config.login.enabled = name == "login";
    config.game.enabled = name == "game";
    config.message.enabled = name == "message";
    config
}

fn print_help() {
    println!("⛳ 게임센터");
    println!();
    println!("사용법: cargo run -p gamecenter [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("  start     모든 서버 실행 (기본값)");
    println!("  login     로그인 서버만 실행");
    println!("  game      게임 서버만 실행");
    println!("  message   메시지 서버만 실행");
    println!("  status    설정 확인");
    println!("  help      도움말");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(ServiceType::GameCenter)?;

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("start");

    let result = match command {
        "start" => match GameCenterConfig::from_env() {
            Ok(config) => run(config).await,
            Err(e) => Err(e),
        },
        "login" | "game" | "message" => match GameCenterConfig::from_env() {
            Ok(config) => {
                info!("{} 서버만 실행합니다", command);
                run(only(config, command)).await
            }
            Err(e) => Err(e),
        },
        "status" => GameCenterConfig::from_env().map(|config| {
            for (name, endpoint) in config.endpoints() {
                let state = if endpoint.enabled { "활성" } else { "비활성" };
                info!("📊 {}: {} ({})", name, endpoint.address, state);
            }
            info!(
                "📊 SERVER_IP={}, SERVER_ID={}, DATABASE_URL={}",
                config.server.server_ip, config.server.server_id, config.server.database_url
            );
        }),
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        other => {
            print_help();
            Err(anyhow::anyhow!("알 수 없는 명령: {}", other))
        }
    };

    if let Err(e) = &result {
        error!("게임센터 실행 실패: {:#}", e);
    }
    result
}
