//! `db` crate — pure persistence layer.
//!
//! Provides the lazily-built, retrying pool manager, typed row structs, the
//! credential hashing strategy and repository functions for the `jugador`,
//! `personaje` and `mascota` tables. No business logic lives here.

pub mod config;
pub mod connector;
pub mod error;
pub mod hash;
pub mod migrate;
pub mod models;
pub mod pool;
pub mod repository;

pub use config::{PoolConfig, RetryPolicy};
pub use connector::{Connector, PgConnector};
pub use error::DbError;
pub use hash::{CredentialHasher, PgCrypto};
pub use migrate::{run_migrations, MIGRATOR};
pub use pool::{DbPool, PoolManager};
