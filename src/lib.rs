pub mod admin;
pub mod application;
pub mod catalog;
pub mod database;
pub mod middleware;
pub mod router;
pub mod user;
pub mod utils;
pub mod verification;
