//! Wire protocol spoken between `offloadd` and its clients.
//!
//! Each exchange is a single request followed by a single response:
//!
//! ```text
//! request:  [u32 name len][name utf-8][u32 payload len][payload]
//! success:  [u32 output len][output][f64 elapsed seconds]
//! failure:  [u32 0xFFFFFFFF][u32 message len][message utf-8]
//! ```
//!
//! All integers are little-endian. A connection may carry any number of
//! sequential exchanges. Byte-exact reads and writes live in [`transport`];
//! [`Framed`] layers the length-prefixed primitives on top of any stream.

mod client;
mod error;
mod framing;
mod message;
pub mod transport;

pub use self::client::{ClientError, ClientStream, OffloadClient, Submission};
pub use self::error::TransportError;
pub use self::framing::{FrameLimits, Framed};
pub use self::message::{FAILURE_FLAG, JobRequest, JobResponse, write_request};
