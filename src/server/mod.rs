//! HTTP surface that drives the buffer strategies.

mod body;
mod handler;
mod listener;
mod state;

pub use body::drain_body;
pub use handler::{handle, HttpResponse};
pub use listener::Listener;
pub use state::AppState;
