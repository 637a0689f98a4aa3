#![doc = "notion-sync-core: pipeline library for notion-sync."]

//! Synchronises the published pages of one Notion database into standalone
//! HTML documents plus a JSON manifest.
//!
//! # Layout
//! - [`contract`]: capability traits, shared data, error taxonomy
//! - [`notion`]: HTTP source adapter and block fetching
//! - [`extract`], [`markdown`], [`render`]: per-record transformation steps
//! - [`artifact`]: filesystem output
//! - [`synchronise`]: the orchestrator
//!
//! The CLI crate only wires configuration and credentials into [`synchronise::synchronise`].

pub mod artifact;
pub mod config;
pub mod contract;
pub mod extract;
pub mod filter;
pub mod markdown;
pub mod notion;
pub mod render;
pub mod synchronise;
