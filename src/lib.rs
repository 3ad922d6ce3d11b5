//! Installr - agent-driven tool installation orchestration
//!
//! Installr reads a backlog of tools, drives each eligible one through an
//! analyze/author/check/execute/validate pipeline behind an agent
//! capability boundary, self-heals failures under a bounded retry budget,
//! and writes statuses and artifacts back for the next run.

pub mod agent;
pub mod artifact;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod scheduler;
pub mod status;

pub use error::{InstallrError, Result};
