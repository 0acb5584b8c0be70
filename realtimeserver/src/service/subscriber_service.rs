//! 구독 브로드캐스터
//!
//! DashMap으로 대시보드 구독자와 각 구독자의 디바이스 구독 목록을 관리하고,
//! 브리지된 이벤트를 구독 중인 구독자에게만 팬아웃합니다.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use shared::{BridgeEvent, EventSink};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 구독자별 송신 큐 용량. 가득 차면 해당 구독자에게 가는 브로드캐스트는 버려집니다.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

use crate::error::{RealtimeError, RealtimeResult};
use crate::protocol::ServerMessage;

/// 연결된 대시보드 구독자
#[derive(Debug)]
pub struct Subscriber {
    pub user_id: Option<String>,
    pub subscriptions: HashSet<String>,
    tx: mpsc::Sender<Message>,
}

/// 브로드캐스트 통계
#[derive(Debug, Default)]
struct BroadcastCounters {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub subscribers: usize,
    pub delivered: u64,
    pub dropped: u64,
}

/// 구독 브로드캐스터
#[derive(Debug, Default)]
pub struct SubscriptionBroadcaster {
    subscribers: DashMap<Uuid, Subscriber>,
    counters: BroadcastCounters,
}

impl SubscriptionBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 구독자 등록. 반환된 ID로 이후 구독/전송을 수행합니다.
    pub fn register(&self, tx: mpsc::Sender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        self.subscribers.insert(
            id,
            Subscriber {
                user_id: None,
                subscriptions: HashSet::new(),
                tx,
            },
        );
        info!("구독자 등록: {} (총 {}명)", id, self.subscribers.len());
        id
    }

    /// 구독자 제거. 이미 없으면 `false`.
    pub fn remove(&self, subscriber_id: Uuid) -> bool {
        let removed = self.subscribers.remove(&subscriber_id).is_some();
        if removed {
            info!("구독자 제거: {} (남은 {}명)", subscriber_id, self.subscribers.len());
        }
        removed
    }

    pub fn set_user(&self, subscriber_id: Uuid, user_id: &str) -> RealtimeResult<()> {
        let mut subscriber = self
            .subscribers
            .get_mut(&subscriber_id)
            .ok_or(RealtimeError::UnknownSubscriber(subscriber_id))?;
        subscriber.user_id = Some(user_id.to_string());
        Ok(())
    }

    pub fn user_id(&self, subscriber_id: Uuid) -> Option<String> {
        self.subscribers
            .get(&subscriber_id)
            .and_then(|s| s.user_id.clone())
    }

    /// 디바이스 구독. 이미 구독 중이어도 성공입니다.
    pub fn subscribe(&self, subscriber_id: Uuid, device_id: &str) -> RealtimeResult<()> {
        let mut subscriber = self
            .subscribers
            .get_mut(&subscriber_id)
            .ok_or(RealtimeError::UnknownSubscriber(subscriber_id))?;
        if subscriber.subscriptions.insert(device_id.to_string()) {
            debug!("구독자 {} → 디바이스 {} 구독", subscriber_id, device_id);
        }
        Ok(())
    }

    pub fn unsubscribe(&self, subscriber_id: Uuid, device_id: &str) -> RealtimeResult<()> {
        let mut subscriber = self
            .subscribers
            .get_mut(&subscriber_id)
            .ok_or(RealtimeError::UnknownSubscriber(subscriber_id))?;
        if subscriber.subscriptions.remove(device_id) {
            debug!("구독자 {} → 디바이스 {} 구독 해제", subscriber_id, device_id);
        }
        Ok(())
    }

    pub fn is_subscribed(&self, subscriber_id: Uuid, device_id: &str) -> bool {
        self.subscribers
            .get(&subscriber_id)
            .map(|s| s.subscriptions.contains(device_id))
            .unwrap_or(false)
    }

    /// 메시지를 팬아웃합니다.
    ///
    /// `device_id`가 있으면 해당 디바이스를 구독한 구독자에게만, 없으면 모든 구독자에게
    /// 전송합니다. 큐가 닫힌 구독자는 제거하고, 큐가 가득 찬 느린 구독자는 이번
    /// 메시지만 건너뜁니다. 반환값은 전달에 성공한 구독자 수입니다.
    pub fn broadcast(&self, message: &ServerMessage, device_id: Option<&str>) -> usize {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("브로드캐스트 메시지 직렬화 실패: {}", e);
                return 0;
            }
        };

        let mut delivered = 0usize;
        let mut skipped = 0usize;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            let matches = match device_id {
                Some(id) => entry.subscriptions.contains(id),
                None => true,
            };
            if !matches {
                continue;
            }

            match entry.tx.try_send(Message::Text(json.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("구독자 {} 송신 큐 가득 참, 메시지 건너뜀", entry.key());
                    skipped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // 순회 중에는 샤드 읽기 락을 잡고 있으므로 제거는 순회가 끝난 뒤에
        for id in &closed {
            warn!("구독자 {} 전송 실패, 제거합니다", id);
            self.subscribers.remove(id);
        }

        self.counters
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.counters
            .dropped
            .fetch_add((skipped + closed.len()) as u64, Ordering::Relaxed);

        debug!(
            "브로드캐스트 완료 (대상: {:?}): 성공 {}, 건너뜀 {}, 제거 {}",
            device_id,
            delivered,
            skipped,
            closed.len()
        );
        delivered
    }

    /// 한 구독자에게 직접 전송 (요청 응답용)
    ///
    /// 큐가 가득 차 있으면 `SlowSubscriber`를 반환합니다.
    pub fn send_to(&self, subscriber_id: Uuid, message: &ServerMessage) -> RealtimeResult<()> {
        let json = message.to_json()?;
        let subscriber = self
            .subscribers
            .get(&subscriber_id)
            .ok_or(RealtimeError::UnknownSubscriber(subscriber_id))?;
        subscriber
            .tx
            .try_send(Message::Text(json))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => RealtimeError::SlowSubscriber(subscriber_id),
                mpsc::error::TrySendError::Closed(_) => {
                    RealtimeError::UnknownSubscriber(subscriber_id)
                }
            })
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn get_stats(&self) -> BroadcastStats {
        BroadcastStats {
            subscribers: self.subscribers.len(),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl EventSink for SubscriptionBroadcaster {
    async fn publish(&self, event: BridgeEvent) {
        let message = ServerMessage::from(&event);
        self.broadcast(&message, Some(event.device_id()));
    }
}
