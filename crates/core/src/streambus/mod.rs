mod bus;
mod types;

pub use bus::StreamActivityBus;
pub use types::{StreamEvent, TooManyListeners};
