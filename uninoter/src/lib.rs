//! UniNoter - a client for collaborative notes on shared topics.
//!
//! Architecture:
//! - View-models (`session`, `topics`, `detail`, `invite`) hold the state of
//!   one screen each and talk to the service through [`api::RemoteService`]
//! - The local store keeps the session and a resilience copy of what was
//!   last fetched
//! - User-facing outcomes are reported through a [`notify::Notifier`]
//! - `server` is a development backend implementing the same API

pub mod api;
pub mod cli;
pub mod config;
pub mod detail;
pub mod error;
pub mod invite;
pub mod models;
pub mod notify;
pub mod report;
pub mod server;
pub mod session;
pub mod storage;
pub mod topics;

#[cfg(test)]
mod testing;
