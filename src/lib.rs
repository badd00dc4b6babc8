pub mod access;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod sync;
pub mod utils;
