//! moodlebot-core: Core library for the moodlebot Moodle administration assistant.
//!
//! This crate contains the building blocks for a tool-calling agent that
//! administers a Moodle site on behalf of a human:
//!
//! - [`config`] — Typed configuration loading from JSON, with env overrides
//! - [`moodle`] — Authenticated client for the Moodle web-service REST API
//! - [`resolve`] — Name-to-entity resolution with ambiguity handling
//! - [`tools`] — Tool trait, registry, and the eleven Moodle admin tools
//!
//! The conversational side (LLM provider, agent loop, channels) is owned by
//! the external agent framework that consumes the tool registry; this crate
//! only provides the tool surface and the Moodle plumbing underneath it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use moodlebot_core::config::Config;
//! use moodlebot_core::moodle::MoodleClient;
//! use moodlebot_core::tools::{register_all, ToolRegistry};
//!
//! let config = Config::load().unwrap();
//! let client = Arc::new(MoodleClient::new(config.moodle.clone()).unwrap());
//!
//! let mut tools = ToolRegistry::new();
//! register_all(&mut tools, client);
//!
//! // Hand `tools.definitions()` to the agent framework.
//! ```

pub mod config;
pub mod moodle;
pub mod resolve;
pub mod tools;
