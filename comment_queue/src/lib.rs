#![allow(clippy::too_many_arguments)]

pub mod broker;
pub mod connection;
pub mod connection_settings;
pub mod consumer;
pub mod error;
pub mod message;
pub mod producer;
pub mod shutdown;
