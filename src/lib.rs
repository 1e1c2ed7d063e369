//! sqlgate - a guarded, read-only SQL gateway for language-model agents.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod agent;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod safety;
pub mod session;
