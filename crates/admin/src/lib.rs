//! LucidSync admin library.
//!
//! Admin-only control surface for LucidBot contact sync: per-user sync
//! status, credential validation and storage, sync scheduling, and contact
//! purging. Exposed as a library so the router can be driven from tests.
//!
//! # Security
//!
//! This crate holds every user's LucidBot token (encrypted at rest) and
//! decrypts them to hand off to the sync engine. All `/api/admin` routes
//! require an admin session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod lucidbot;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod sync;
