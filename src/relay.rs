//! Image relay: the per-user state machine between LINE and the image services.

mod handler;
mod messages;
mod services;

pub use handler::{Dispatcher, EventDispatch, Job, Relay};
pub use services::{ImageGenerator, ImageHost, Messenger};
