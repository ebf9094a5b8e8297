pub mod auth;
pub mod grocery;
pub mod plan;
pub mod user;
