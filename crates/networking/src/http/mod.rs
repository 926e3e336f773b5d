//! HTTP access to the upstream API

mod client;

pub use client::{PatreonClient, DEFAULT_BASE_URL};
