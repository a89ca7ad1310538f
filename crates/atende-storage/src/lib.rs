// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Atende platform.
//!
//! A single serialized writer (tokio-rusqlite) with refinery embedded
//! migrations. Query modules are grouped per table family under
//! [`queries`]; row types live in [`models`].

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
