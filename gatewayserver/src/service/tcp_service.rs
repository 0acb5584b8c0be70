//! 게이트웨이 메인 서비스
//!
//! 평문 TCP / TLS 리스너, 세션 테이블, 하트비트, 레지스트리의 생명주기를 관리합니다.

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::handler::ConnectionHandler;
use crate::service::{
    ConnectionService, ConnectionStatsSnapshot, DeviceRegistry, DeviceStore, EventBridge,
    GatewayControl, HeartbeatService,
};

/// 바인딩된 리스너 주소
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayAddrs {
    pub plain: SocketAddr,
    pub tls: Option<SocketAddr>,
}

/// 게이트웨이 서비스
pub struct TcpService {
    config: GatewayConfig,
    registry: Arc<DeviceRegistry>,
    connection_service: Arc<ConnectionService>,
    heartbeat_service: Arc<HeartbeatService>,
    is_running: Arc<Mutex<bool>>,
    accept_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TcpService {
    /// 새로운 게이트웨이 서비스 생성
    pub fn new(config: GatewayConfig, store: Arc<dyn DeviceStore>, events: EventBridge) -> Result<Self> {
        let registry = Arc::new(DeviceRegistry::new(store, events));
        let connection_service = Arc::new(ConnectionService::new(
            registry.clone(),
            config.max_connections,
        ));
        let heartbeat_service = Arc::new(
            HeartbeatService::new(
                connection_service.clone(),
                config.heartbeat_interval(),
                config.heartbeat_timeout(),
            )
            .context("하트비트 설정 오류")?,
        );

        Ok(Self {
            config,
            registry,
            connection_service,
            heartbeat_service,
            is_running: Arc::new(Mutex::new(false)),
            accept_tasks: Mutex::new(Vec::new()),
        })
    }

    /// 리스너를 바인딩하고 수락 루프와 하트비트를 시작합니다.
    ///
    /// 실제 바인딩된 주소를 돌려주므로 포트 0으로도 시작할 수 있습니다.
    pub async fn start(&self) -> Result<GatewayAddrs> {
        let mut is_running = self.is_running.lock().await;
        if *is_running {
            anyhow::bail!("게이트웨이가 이미 실행 중입니다");
        }

        let handler = Arc::new(ConnectionHandler::new(
            self.connection_service.clone(),
            self.config.max_frame_body,
        ));

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("TCP 리스너 바인드 실패: {}", bind_addr))?;
        let plain = listener.local_addr()?;
        info!("✅ 게이트웨이 TCP 리스너 실행 중: {}", plain);

        let mut tasks = vec![tokio::spawn(accept_loop(listener, handler.clone(), None))];

        let tls = match self.bind_tls().await {
            Ok(Some((listener, acceptor))) => {
                let addr = listener.local_addr()?;
                info!("🔒 게이트웨이 TLS 리스너 실행 중: {}", addr);
                tasks.push(tokio::spawn(accept_loop(listener, handler, Some(acceptor))));
                Some(addr)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ TLS 리스너를 시작하지 못했습니다 - 평문 TCP만 사용: {:#}", e);
                None
            }
        };

        self.heartbeat_service
            .start()
            .await
            .context("하트비트 시스템 시작 실패")?;

        *self.accept_tasks.lock().await = tasks;
        *is_running = true;

        Ok(GatewayAddrs { plain, tls })
    }

    async fn bind_tls(&self) -> Result<Option<(TcpListener, TlsAcceptor)>> {
        let (Some(addr), Some(cert), Some(key)) = (
            self.config.tls_bind_address(),
            self.config.tls_cert_path.as_deref(),
            self.config.tls_key_path.as_deref(),
        ) else {
            return Ok(None);
        };

        let acceptor = load_tls_acceptor(cert, key)?;
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("TLS 리스너 바인드 실패: {}", addr))?;
        Ok(Some((listener, acceptor)))
    }

    /// 서버 중지
    pub async fn stop(&self) -> Result<()> {
        let mut is_running = self.is_running.lock().await;

        if !*is_running {
            warn!("게이트웨이가 이미 중지되어 있습니다");
            return Ok(());
        }

        info!("🛑 게이트웨이 중지 중...");
        *is_running = false;

        for task in self.accept_tasks.lock().await.drain(..) {
            task.abort();
        }

        self.heartbeat_service
            .stop()
            .await
            .context("하트비트 시스템 중지 실패")?;

        self.connection_service.close_all_connections();

        info!("✅ 게이트웨이가 중지되었습니다");
        Ok(())
    }

    /// 서버 실행 상태 확인
    pub async fn is_running(&self) -> bool {
        *self.is_running.lock().await
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn connection_service(&self) -> &Arc<ConnectionService> {
        &self.connection_service
    }

    pub fn heartbeat_service(&self) -> &Arc<HeartbeatService> {
        &self.heartbeat_service
    }

    /// 대시보드 쓰기 요청용 제어 핸들
    pub fn control(&self) -> GatewayControl {
        GatewayControl::new(self.registry.clone())
    }

    /// 서버 통계 조회
    pub async fn get_server_stats(&self) -> ServerStats {
        ServerStats {
            is_running: self.is_running().await,
            connections: self.connection_service.get_connection_stats(),
            authenticated_devices: self.registry.len(),
            heartbeat_running: self.heartbeat_service.is_running().await,
            bind_address: self.config.bind_address(),
        }
    }

    pub fn get_config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// 서버 통계 정보
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub is_running: bool,
    pub connections: ConnectionStatsSnapshot,
    pub authenticated_devices: usize,
    pub heartbeat_running: bool,
    pub bind_address: String,
}

/// 연결 수락 루프
async fn accept_loop(
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
    tls: Option<TlsAcceptor>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("새 TCP 연결: {}", addr);
                let handler = handler.clone();
                let tls = tls.clone();
                tokio::spawn(async move {
                    serve_connection(handler, stream, addr, tls).await;
                });
            }
            Err(e) => {
                error!("클라이언트 연결 수락 실패: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }
    }
}

async fn serve_connection(
    handler: Arc<ConnectionHandler>,
    stream: TcpStream,
    addr: SocketAddr,
    tls: Option<TlsAcceptor>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("TCP_NODELAY 설정 실패 ({}): {}", addr, e);
    }

    // 세션 에러는 핸들러 안에서 이미 로깅됨
    match tls {
        None => {
            let _ = handler.handle_connection(stream, addr.to_string()).await;
        }
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => {
                let _ = handler.handle_connection(tls_stream, addr.to_string()).await;
            }
            Err(e) => warn!("TLS 핸드셰이크 실패 ({}): {}", addr, e),
        },
    }
}

/// PEM 인증서 체인과 개인키로 TLS acceptor를 만듭니다.
pub fn load_tls_acceptor(cert_path: &str, key_path: &str) -> Result<TlsAcceptor> {
    let cert_file = std::fs::read(cert_path)
        .with_context(|| format!("인증서를 읽을 수 없습니다: {}", cert_path))?;
    let key_file = std::fs::read(key_path)
        .with_context(|| format!("개인키를 읽을 수 없습니다: {}", key_path))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_file[..])
        .collect::<Result<Vec<_>, _>>()
        .context("인증서 PEM 파싱 실패")?;
    if certs.is_empty() {
        anyhow::bail!("인증서 파일에 인증서가 없습니다: {}", cert_path);
    }
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &key_file[..])
        .context("개인키 PEM 파싱 실패")?
        .ok_or_else(|| anyhow::anyhow!("개인키를 찾을 수 없습니다: {}", key_path))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("TLS 프로토콜 설정 실패")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("TLS 인증서 설정 실패")?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
