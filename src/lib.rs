pub mod api;
pub mod config;
pub mod convert;
pub mod fetch;
pub mod observability;
pub mod render;
pub mod stage;
