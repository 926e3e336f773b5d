//! SQLite database management

mod connection;
mod tracked_rewards;
mod users;

pub use connection::Database;
pub use tracked_rewards::*;
pub use users::*;
