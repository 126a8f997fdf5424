//! Jira REST client plus the sprint, field and ticket logic built on it.

pub mod client;
pub mod fields;
pub mod sprint;
pub mod ticket;
pub mod ticket_id;

pub use client::JiraClient;
