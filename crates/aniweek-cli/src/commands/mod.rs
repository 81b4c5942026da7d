pub mod config;
pub mod schedule;
pub mod serve;
pub mod show;
