//! Gardisto — multi-tenant task backend.
//!
//! The interesting parts live in [`auth`] (credential verification, token
//! issuance and one-shot refresh rotation) and [`admission`] (per-identity
//! fixed-window rate limiting that gates every guarded endpoint). Everything
//! else is the plumbing around them: HTTP surface, collaborator stores, and
//! telemetry.

pub mod admission;
pub mod api;
pub mod auth;
pub mod cli;
pub mod errors;
pub mod events;
pub mod store;
pub mod tasks;
