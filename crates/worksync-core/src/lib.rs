pub mod execution;
pub mod models;
pub mod persistence;
pub mod sqlite;
pub mod supervisor;
