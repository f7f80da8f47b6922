mod producer_wrapper;
mod publisher;

pub use producer_wrapper::*;
pub use publisher::*;
