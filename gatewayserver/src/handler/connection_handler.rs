//! 연결 핸들러
//!
//! 소켓 하나의 수명 동안 읽기 루프와 쓰기 태스크를 운영합니다.
//! 읽은 바이트는 수신 버퍼에 누적되고 완성된 프레임만 순서대로 처리됩니다.
//! 평문 TCP와 TLS 스트림 모두 같은 경로를 사용합니다.

use bytes::BytesMut;
use shared::DisconnectReason;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::handler::CommandHandler;
use crate::protocol::{Frame, FrameCodec};
use crate::service::ConnectionService;
use crate::tool::error::{ErrorHandler, GatewayError, GatewayResult};

/// 세션별 송신 큐 길이
const OUTBOUND_QUEUE: usize = 64;
/// 종료 시 송신 큐를 비우기 위해 기다리는 최대 시간
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// 연결 핸들러
pub struct ConnectionHandler {
    connection_service: Arc<ConnectionService>,
    commands: CommandHandler,
    codec: FrameCodec,
}

impl ConnectionHandler {
    /// 새로운 연결 핸들러 생성
    pub fn new(connection_service: Arc<ConnectionService>, max_frame_body: usize) -> Self {
        Self {
            commands: CommandHandler::new(connection_service.clone()),
            connection_service,
            codec: FrameCodec::new(max_frame_body),
        }
    }

    /// 연결 하나를 끝날 때까지 처리합니다.
    ///
    /// 소켓이 닫히거나, 세션이 외부에서 닫히거나(하트비트 타임아웃, 재로그인),
    /// 프레임 길이가 허용치를 넘으면 반환합니다.
    pub async fn handle_connection<S>(&self, stream: S, addr: String) -> GatewayResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut reader, writer) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE);

        let link = match self.connection_service.open_session(addr.clone(), tx) {
            Ok(link) => link,
            Err(e) => {
                ErrorHandler::handle_error(&e, "ConnectionHandler", "open_session");
                return Err(e);
            }
        };
        let session_id = link.session_id();
        info!("새 디바이스 연결: {} (세션 {})", addr, session_id);

        let mut writer_task = tokio::spawn(write_loop(writer, rx, session_id));
        let mut buf = BytesMut::with_capacity(1024);

        let result: GatewayResult<()> = 'session: loop {
            let read = tokio::select! {
                _ = link.closed() => {
                    debug!("세션 {} 종료 요청 수신", session_id);
                    break 'session Ok(());
                }
                read = reader.read_buf(&mut buf) => read,
            };

            match read {
                Ok(0) => break Ok(()),
                Ok(n) => debug!("세션 {} {}바이트 수신 (버퍼 {})", session_id, n, buf.len()),
                Err(e) => break Err(e.into()),
            }

            loop {
                let frame = match self.codec.decode(&mut buf) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => break 'session Err(e),
                };

                if let Some(reply) = self.commands.handle_frame(&link, frame).await {
                    if let Err(e) = link.send(reply).await {
                        break 'session Err(e);
                    }
                }

                if link.is_closed() {
                    break 'session Ok(());
                }
            }
        };

        if let Err(e) = &result {
            match e {
                GatewayError::Io(io) => debug!("세션 {} 소켓 에러: {}", session_id, io),
                other => ErrorHandler::handle_error(other, "ConnectionHandler", "read_loop"),
            }
        }

        self.connection_service
            .close_session(session_id, DisconnectReason::SocketClosed);
        drop(link);

        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task)
            .await
            .is_err()
        {
            warn!("세션 {} 송신 태스크가 제때 끝나지 않아 중단합니다", session_id);
            writer_task.abort();
        }

        info!("디바이스 연결 종료: {} (세션 {})", addr, session_id);
        result
    }
}

/// 송신 큐의 프레임을 순서대로 소켓에 씁니다.
async fn write_loop<W>(mut writer: WriteHalf<W>, mut rx: mpsc::Receiver<Frame>, session_id: u64)
where
    W: AsyncRead + AsyncWrite + Unpin,
{
    let mut out = BytesMut::with_capacity(256);

    while let Some(frame) = rx.recv().await {
        out.clear();
        if let Err(e) = frame.encode(&mut out) {
            ErrorHandler::handle_error(&e, "ConnectionHandler", "encode");
            continue;
        }
        if let Err(e) = writer.write_all(&out).await {
            debug!("세션 {} 송신 실패: {}", session_id, e);
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!("세션 {} flush 실패: {}", session_id, e);
            break;
        }
    }

    let _ = writer.shutdown().await;
}
