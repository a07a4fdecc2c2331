pub mod client;
pub mod config;
pub mod domain;
pub mod normalize;
pub mod runner;
pub mod store;
