//! Merpati News - A news search proxy and browser
//!
//! This crate provides a proxy in front of the GNews API that always answers,
//! serving canned articles when the provider is unavailable, together with a
//! client state machine used by the web page and the terminal client.

pub mod client;
pub mod config;
pub mod fallback;
pub mod fetcher;
pub mod models;
pub mod routes;
