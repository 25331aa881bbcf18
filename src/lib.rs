//! Dashboard client for the Automoy automation backend.
//!
//! Polls and subscribes to the backend's operator state, renders it into a
//! [`document::Document`], refreshes the screenshot, and forwards goal
//! submissions and pause toggles.

pub mod api;
pub mod companion;
pub mod config;
pub mod dashboard;
pub mod document;
pub mod error;
pub mod goal;
pub mod inflight;
pub mod loading;
pub mod panels;
pub mod pause;
pub mod poller;
pub mod push;
pub mod render;
pub mod screenshot;
pub mod state;
pub mod stub;
pub mod types;
pub mod ui;

pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use error::{DashboardError, Result};
