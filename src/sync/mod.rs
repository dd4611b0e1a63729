//! Real-time synchronization: push feed, channel adapters, reconciliation

pub mod channel;
pub mod feed;
pub mod manager;
pub mod protocol;
pub mod reconciler;

pub use channel::ChannelState;
pub use feed::{EventFeed, FeedConnector, FeedError, SseConnector};
pub use manager::SubscriptionManager;
pub use protocol::MatchEvent;
pub use reconciler::Reconciler;
