//! Data models for taste snapshots and authenticated users

mod tastes;
mod user;

pub use tastes::*;
pub use user::*;
