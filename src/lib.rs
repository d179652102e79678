pub mod address;
pub mod auth;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod wallet;
