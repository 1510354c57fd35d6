//! End-to-end tests driving the compiled `koboswitch` binary.

#[path = "../common/mod.rs"]
mod common;

mod commands;
mod environment;
mod robot_mode;
