//! MetaMapa portal service library crate.
//!
//! # Purpose
//! Exposes the portal's HTTP API, session validation, map feed registry,
//! configuration, and observability setup for use by the binary and tests.
//!
//! # Notes
//! Access rules live in `metamapa-authz` and the map pipeline in
//! `metamapa-map`; this crate only wires them to HTTP.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod feeds;
pub mod observability;
