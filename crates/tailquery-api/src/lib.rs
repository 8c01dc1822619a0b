// tailquery-api: Async Rust client for the Tailscale v2 REST API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::TailscaleClient;
pub use error::Error;
pub use transport::TransportConfig;
