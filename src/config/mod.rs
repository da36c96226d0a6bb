// ABOUTME: Configuration management module for server settings and metering tables
// ABOUTME: Environment-driven server config plus the externally-supplied tool cost table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! Configuration module for the Ghosty server
//!
//! - **Environment**: server configuration from environment variables
//! - **Costs**: the tool credit cost table, supplied as external configuration

/// Tool credit cost table
pub mod costs;
/// Environment and server configuration
pub mod environment;

pub use costs::{DocumentParseMode, ToolCostTable};
pub use environment::ServerConfig;
