mod connection;
mod gateway;
mod migrations;

pub mod helpers;
pub mod repositories;

pub use connection::Database;
pub use gateway::Persistence;
