#[path = "../common/mod.rs"]
mod common;

mod compatibility;
mod config;
mod merge;
mod round_trip;
mod tagging;
mod virtual_store;
