//! Common library for the NestFind backend
//!
//! This crate provides shared infrastructure used by the NestFind
//! services: PostgreSQL connection pooling, health checks, and typed
//! database errors.

pub mod database;
pub mod error;
