//! Data models for upstream entities and tracking state

mod campaign;
mod ids;
mod result;
mod reward;
mod status;
mod tracking;

pub use campaign::*;
pub use ids::*;
pub use result::*;
pub use reward::*;
pub use status::*;
pub use tracking::*;
