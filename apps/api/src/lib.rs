//! Mock interview session engine.
//!
//! The service side (`sessions`, `questions`, `routes`) is the Session
//! Authority and Question Content Provider. `practice` is the client-side
//! Session Controller that drives one timed session against any
//! `SessionAuthority`, in process or over HTTP.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod practice;
pub mod questions;
pub mod routes;
pub mod sessions;
pub mod state;
