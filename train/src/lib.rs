#![recursion_limit = "256"]

pub mod config;
pub mod history;
pub mod loss;
pub mod msg;
pub mod train;
