//! Repository functions — one function per database operation.
//!
//! Every function takes a `&mut PgConnection` (a pooled connection or an open
//! transaction, both deref to it) and returns a `Result<T, DbError>`.
//! Ownership scoping is expressed in the SQL itself; no business logic here.

pub mod players;
pub mod characters;
pub mod pets;
