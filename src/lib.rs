pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod queue;
pub mod repositories;
pub mod services;
pub mod worker;
