//! SetDeck backend: a SQLite-backed workout hierarchy store (routines →
//! exercises → sets → history), a startup reconciler for duplicate routine
//! rows, a one-time legacy-schema migration pipeline, and an HTTP API for
//! presentation clients.

pub mod api;
pub mod db;
pub mod migration;
pub mod models;
