pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod review;
pub mod session;
pub mod stats;
pub mod store;
pub mod ticker;
