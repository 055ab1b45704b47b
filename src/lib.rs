pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod resource;
pub mod server;
pub mod types;

#[cfg(test)]
pub mod testing;
