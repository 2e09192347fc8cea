#[macro_use]
extern crate slog;

pub mod config;
pub mod diff;
pub mod leases;
pub mod range;
pub mod store;
pub mod tokens;
pub mod web;
