//! gantry library — exposes modules for integration testing.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod app;
pub mod cleanup;
pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod health;
pub mod output;
pub mod pipeline;
pub mod provision;
pub mod proxy;
pub mod record;
pub mod ssh;
pub mod stage;
