// HTTP client side of the content API (smoke checks only)

pub mod client;
pub mod models;
pub mod smoke;

pub use client::ContentApiClient;
