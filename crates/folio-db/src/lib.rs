pub mod connection;
pub mod error;
pub mod sql;
pub mod store;

pub use connection::DbConnection;
pub use error::DbError;
pub use store::{JsonStore, SqliteStore};
