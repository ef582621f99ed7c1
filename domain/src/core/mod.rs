//! Core domain concepts shared across all subdomains.
//!
//! - [`group_id::GroupId`]: sanitized distortion-group identifier
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod group_id;
