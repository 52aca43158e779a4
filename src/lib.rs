pub mod agent;
pub mod config;
pub mod context;
pub mod memory;
pub mod model;
pub mod protocol;
pub mod server;
pub mod session;
pub mod shell;
pub mod tools;
pub mod ui;
