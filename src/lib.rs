//! # University Catalog
//!
//! A catalog service for universities, their offered programs, and
//! admission exam-score requirements, with a chat assistant that answers
//! free-text questions by calling the same query operations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │  Seed    │──▶│    SQLite      │◀──│ Filters  │
//! │ dataset  │   │ 5-table schema │   │ builder  │
//! └──────────┘   └───────┬───────┘   └──────────┘
//!                        │
//!          ┌─────────────┼──────────────┐
//!          ▼             ▼              ▼
//!     ┌─────────┐  ┌──────────┐  ┌───────────┐
//!     │   CLI   │  │   HTTP   │  │   Chat    │
//!     │(unictl) │  │  (axum)  │  │  (tools)  │
//!     └─────────┘  └──────────┘  └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! unictl init                  # create database
//! unictl seed                  # load demo data
//! unictl list --country KZ     # filtered listing
//! unictl serve api             # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Entity row types |
//! | [`filters`] | Filter bundle and SQL predicate builder |
//! | [`service`] | Listing, detail, and meta operations |
//! | [`seed`] | Idempotent demo-data seeding |
//! | [`server`] | HTTP API |
//! | [`tools`] | Assistant tool registry |
//! | [`agent`] | OpenAI tool-calling chat agent |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod agent;
pub mod config;
pub mod db;
pub mod filters;
pub mod migrate;
pub mod models;
pub mod seed;
pub mod server;
pub mod service;
pub mod tools;
