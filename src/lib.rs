pub mod api;
pub mod config;
pub mod detect;
pub mod engine;
pub mod report;
pub mod source;
