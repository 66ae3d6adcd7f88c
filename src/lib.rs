pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod queries;
pub mod relevance;
pub mod search;
pub mod sheet;
