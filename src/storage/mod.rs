pub mod accounts;
pub mod database;
pub mod migrations;
pub mod outbox;
pub mod path_utils;
pub mod run_state;

pub use accounts::{AccountStorage, SqliteStore};
