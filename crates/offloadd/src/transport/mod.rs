//! Socket listener serving daemon connections.
//!
//! [`SocketListener`] binds the configured endpoint and accepts connections
//! on a background thread, handing each one to a [`ConnectionHandler`] on a
//! thread of its own.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
