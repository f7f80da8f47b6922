mod client_factory;
mod retry;

pub use client_factory::*;
pub use retry::*;
