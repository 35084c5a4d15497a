//! Operations modules for interacting with external systems.
//!
//! This module contains the integration layers for the systems that `relprep` coordinates:
//!
//! - [`git`]: Repository operations via the git CLI (clone, checkout, branches, commits, tags, submodules)
//! - [`github`]: Pull request management via the GitHub CLI
//! - [`jira`]: Issue search against the Jira REST API
//! - [`jira_curl`]: Curl-based HTTP client for making Jira API requests
//! - [`prompt`]: Operator interaction (confirmations, choices, pauses)
//! - [`secrets`]: Token retrieval from the cloud secret manager
//!
//! Each submodule provides trait-based abstractions with real and mock implementations
//! to support both production use and testing.

pub mod git;
pub mod github;
pub mod jira;
pub mod jira_curl;
pub mod prompt;
pub mod secrets;
