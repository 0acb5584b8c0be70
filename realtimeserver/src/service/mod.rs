pub mod auth_service;
pub mod subscriber_service;
pub mod websocket_service;

pub use auth_service::{AuthService, Claims};
pub use subscriber_service::{
    BroadcastStats, Subscriber, SubscriptionBroadcaster, SUBSCRIBER_QUEUE_CAPACITY,
};
pub use websocket_service::RealtimeService;
