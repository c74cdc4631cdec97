//! Purpose: Library crate behind the `sqlscope` CLI.
//! Exports: `api` (executor pipeline and public types), `core` (building blocks), `config`, `notice`.
//! Role: Connection-scoped SQL execution with an injectable query-result cache.
//! Invariants: Every connection opened by the crate is closed on every exit path.
//! Invariants: Caches are owned values passed in by the caller, never globals.
pub mod api;
pub mod config;
pub mod core;
pub mod notice;
