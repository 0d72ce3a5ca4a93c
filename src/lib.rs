pub mod apis;
pub mod app;
pub mod common;
pub mod config;
pub mod convert;
pub mod extract;
pub mod infra;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod storage;
