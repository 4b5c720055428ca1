pub mod config;
pub mod domain;
pub mod infra;
pub mod observability;
pub mod uploaders;
