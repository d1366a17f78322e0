pub mod auth;
pub mod comments;
pub mod error;
pub mod health;
