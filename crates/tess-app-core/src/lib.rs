// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for tessellation tools (config, prefs, render port).
//! Keeps the service and renderer binaries thin and transport-agnostic.

pub mod config;
pub mod prefs;
pub mod render_port;
