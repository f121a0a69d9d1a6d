pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod history;
pub mod output;
pub mod run;
pub mod runtime;
pub mod snapshot;
