// Core modules: connection scoping, result caching, logging, streaming, errors.
pub mod args;
pub mod cache;
pub mod conn;
pub mod error;
pub mod log;
pub mod row;
pub mod scope;
pub mod seed;
pub mod stream;
