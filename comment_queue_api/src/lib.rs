pub mod app_config;
pub mod comments;
pub mod error;
pub mod startup;
