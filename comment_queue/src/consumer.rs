mod consumer_loop;
mod consumer_wrapper;
mod record_sink;

pub use consumer_loop::*;
pub use consumer_wrapper::*;
pub use record_sink::*;
