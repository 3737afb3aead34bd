//! Slack approvals: a requester picks an approver, the approver decides.

pub mod approval;
pub mod config;
pub mod error;
pub mod server;
pub mod slack;
pub mod socket;
