//! Slotwatch Engine - Availability tracking, notification decisions and scheduled sweeps

pub mod clock;
pub mod job;
pub mod notifier;
pub mod state_machine;
pub mod tracking;

pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{spawn_update_loop, SweepReport, UpdateConfig, UpdateJob};
pub use notifier::{LogNotifier, Notifier};
pub use state_machine::{transition, RewardState, Transition};
pub use tracking::{CampaignListing, RewardListing, TrackingService};
