//! 통합 IoT 센터 실행 파일

use anyhow::{Context, Result};
use iotcenter::{IotCenter, IotCenterConfig};
use realtimeserver::{AuthService, RealtimeConfig};
use tokio::signal;
use tracing::{error, info};

/// 통합 서버 실행. Ctrl+C까지 대기한 뒤 통계를 남기고 종료합니다.
async fn run_iotcenter() -> Result<()> {
    info!("📡 통합 IoT 센터 시작 중...");

    let config = IotCenterConfig::from_env()?;
    let center = IotCenter::new(config)?;
    let addrs = center.start().await?;

    info!("🔌 디바이스 게이트웨이: {}", addrs.gateway.plain);
    if let Some(tls) = addrs.gateway.tls {
        info!("🔒 디바이스 게이트웨이 (TLS): {}", tls);
    }
    info!("🌐 대시보드 WebSocket: ws://{}", addrs.realtime);
    info!("📡 통합 IoT 센터 실행 중! Ctrl+C로 중지할 수 있습니다.");

    if let Err(e) = signal::ctrl_c().await {
        error!("시그널 대기 중 오류: {}", e);
    }
    info!("🛑 종료 시그널을 받았습니다. 서버를 중지합니다...");

    center.print_status().await;
    center.stop().await?;
    Ok(())
}

/// 설정만 로드해서 검증
fn check_config() -> Result<()> {
    let config = IotCenterConfig::from_env()?;
    info!("✅ 설정 검증 통과");
    info!("  게이트웨이: {}", config.gateway.bind_address());
    info!("  TLS: {:?}", config.gateway.tls_bind_address());
    info!(
        "  하트비트: {}s / 타임아웃 {}s",
        config.gateway.heartbeat_interval_secs, config.gateway.heartbeat_timeout_secs
    );
    info!("  실시간 서버: {}", config.realtime.bind_address());
    Ok(())
}

/// 대시보드 접속용 JWT 발급 (운영/개발 편의)
fn issue_token(user_id: &str) -> Result<()> {
    let config = RealtimeConfig::from_env()?;
    let auth = AuthService::new(config.jwt_secret);
    let token = auth
        .issue(user_id, chrono::Duration::hours(24))
        .context("토큰 발급 실패 (JWT_SECRET 확인)")?;
    println!("{}", token);
    Ok(())
}

fn print_help() {
    println!("📡 IoT 디바이스 게이트웨이 통합 서버");
    println!();
    println!("사용법: cargo run -p iotcenter [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("  start            게이트웨이 + 실시간 서버 시작 (기본값)");
    println!("  check            설정 로드 및 검증만 수행");
    println!("  token <USER_ID>  대시보드용 JWT 발급 (24시간)");
    println!("  help             도움말");
    println!();
    println!("환경변수: GATEWAY_PORT, GATEWAY_TLS_PORT, HEARTBEAT_INTERVAL_SECS,");
    println!("          DEVICE_API_URL, GATEWAY_STATIC_TOKENS, REALTIME_PORT, JWT_SECRET, RUST_LOG");
}

#[tokio::main]
async fn main() -> Result<()> {
    shared::logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("start");

    let result = match command {
        "start" => run_iotcenter().await,
        "check" => check_config(),
        "token" => match args.get(2) {
            Some(user_id) => issue_token(user_id),
            None => Err(anyhow::anyhow!("사용법: iotcenter token <USER_ID>")),
        },
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        other => Err(anyhow::anyhow!("알 수 없는 명령: {} (help 참고)", other)),
    };

    if let Err(e) = &result {
        error!("❌ 실행 실패: {:#}", e);
    }
    result
}
