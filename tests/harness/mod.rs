// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the headless gateway.
//!
//! Builds routers over in-memory state, fakes webhook receivers and
//! simulates client traffic against the rate limiter.

#![allow(dead_code)]

pub mod fixtures;
pub mod generators;
pub mod metrics;
pub mod receiver;
