//! Wasteboard - a municipal waste-management dashboard service.
//!
//! # Overview
//!
//! Government staff log in to view garbage-bin fill levels and citizen
//! complaints, mark bins collected, and advance complaints toward
//! resolution. Citizens submit complaints without an account.
//!
//! There is no sensor feed: each bin's fill level is simulated as a linear
//! function of the time since it was last emptied (a fixed 20-day cycle),
//! recomputed on every staff dashboard read.
//!
//! # Modules
//!
//! - [`model`]: Data types for bins, complaints, alerts, and API payloads
//! - [`storage`]: SQLite storage layer
//! - [`simulation`]: Bin fill-level simulation and bulk dispatch
//! - [`dashboard`]: Dashboard view assembly and staff alert polling
//! - [`auth`]: Staff credentials and session tokens
//! - [`api`]: HTTP API handlers and router

pub mod api;
pub mod auth;
pub mod dashboard;
pub mod model;
pub mod simulation;
pub mod storage;
