//! 대시보드 클라이언트 메시지 핸들러
//!
//! 텍스트 메시지 하나를 받아 응답 메시지 하나를 만듭니다. 처리 중 에러는
//! `error` 메시지로 바뀌고 연결은 유지됩니다.

use shared::DeviceControl;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{RealtimeError, RealtimeResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::{AuthService, SubscriptionBroadcaster};

pub struct ClientHandler {
    broadcaster: Arc<SubscriptionBroadcaster>,
    auth: AuthService,
    control: Arc<dyn DeviceControl>,
}

impl ClientHandler {
    pub fn new(
        broadcaster: Arc<SubscriptionBroadcaster>,
        auth: AuthService,
        control: Arc<dyn DeviceControl>,
    ) -> Self {
        Self {
            broadcaster,
            auth,
            control,
        }
    }

    /// 텍스트 메시지 처리
    pub async fn handle_text(&self, subscriber_id: Uuid, text: &str) -> ServerMessage {
        let result = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(subscriber_id, message).await,
            Err(e) => Err(RealtimeError::InvalidMessage(e.to_string())),
        };

        result.unwrap_or_else(|e| {
            warn!("구독자 {} 요청 실패: {}", subscriber_id, e);
            ServerMessage::error(e.to_string())
        })
    }

    async fn handle_message(
        &self,
        subscriber_id: Uuid,
        message: ClientMessage,
    ) -> RealtimeResult<ServerMessage> {
        match message {
            ClientMessage::Authenticate { token } => {
                let user_id = self.auth.verify(&token)?;
                self.broadcaster.set_user(subscriber_id, &user_id)?;
                info!("구독자 {} 인증 완료: {}", subscriber_id, user_id);
                Ok(ServerMessage::Authenticated { user_id })
            }
            ClientMessage::Subscribe { device_id } => {
                require_device_id(&device_id)?;
                self.broadcaster.subscribe(subscriber_id, &device_id)?;
                Ok(ServerMessage::Subscribed { device_id })
            }
            ClientMessage::Unsubscribe { device_id } => {
                require_device_id(&device_id)?;
                self.broadcaster.unsubscribe(subscriber_id, &device_id)?;
                Ok(ServerMessage::Unsubscribed { device_id })
            }
            ClientMessage::GetDeviceStatus { device_id } => {
                require_device_id(&device_id)?;
                Ok(ServerMessage::DeviceStatus(
                    self.control.device_status(&device_id),
                ))
            }
            ClientMessage::VirtualWrite {
                device_id,
                pin,
                value,
            } => {
                let user_id = self
                    .broadcaster
                    .user_id(subscriber_id)
                    .ok_or(RealtimeError::NotAuthenticated)?;
                require_device_id(&device_id)?;

                let state = self.control.virtual_write(&device_id, pin, &value).await?;
                info!(
                    "대시보드 쓰기: {} → {} V{}={}",
                    user_id, device_id, pin, state.value
                );
                Ok(ServerMessage::VirtualWriteAck {
                    device_id,
                    pin: state.pin_number,
                    value: state.value,
                })
            }
        }
    }
}

fn require_device_id(device_id: &str) -> RealtimeResult<()> {
    if device_id.trim().is_empty() {
        return Err(RealtimeError::InvalidMessage("deviceId가 비어 있습니다".into()));
    }
    Ok(())
}
