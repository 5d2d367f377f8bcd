pub mod entities;
pub mod health;
pub mod players;
pub mod session;
