pub mod app;
pub mod batch;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod lookup;
pub mod output;
pub mod parser;
pub mod transport;
