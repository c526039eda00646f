//! Database facade — pooled, scheme-dispatched CRUD over any driver.

pub mod crud;
pub mod database;
pub mod transaction;

pub use database::Database;
pub use transaction::Transaction;
