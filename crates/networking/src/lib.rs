//! Slotwatch Networking - HTTP client and bounded batch lookups

pub mod dispatcher;
pub mod http;
pub mod source;

pub use dispatcher::{DispatcherConfig, FetchDispatcher};
pub use http::PatreonClient;
pub use source::RewardSource;
