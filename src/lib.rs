pub mod affiliation;
pub mod cluster;
pub mod config;
pub mod dedupe;
pub mod distance;
pub mod engine;
pub mod fetch;
pub mod model;
pub mod naming;
pub mod output;
pub mod parser;
pub mod publish;
pub mod stats;
