//! Handlers compiled into the daemon.

use sha2::{Digest, Sha256};

use super::{ComputeHandler, HandlerError, HandlerFactory, OutputSlots};

/// Factory for the handlers compiled into `offloadd`.
///
/// | name      | output                        |
/// |-----------|-------------------------------|
/// | `echo`    | the input, unchanged          |
/// | `reverse` | the input bytes in reverse    |
/// | `sha256`  | the 32-byte SHA-256 digest    |
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinHandlerFactory;

impl BuiltinHandlerFactory {
    /// Names this factory can create.
    pub const NAMES: [&'static str; 3] = ["echo", "reverse", "sha256"];
}

impl HandlerFactory for BuiltinHandlerFactory {
    fn create(&self, name: &str) -> Option<Box<dyn ComputeHandler>> {
        match name {
            "echo" => Some(Box::new(Echo)),
            "reverse" => Some(Box::new(Reverse)),
            "sha256" => Some(Box::new(Sha256Digest)),
            _ => None,
        }
    }
}

struct Echo;

impl ComputeHandler for Echo {
    fn process(&self, inputs: &[&[u8]], outputs: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
        for (index, input) in inputs.iter().enumerate() {
            if let Some(output) = outputs.allocate(index, input.len())? {
                output.copy_from_slice(input);
            }
        }
        Ok(())
    }
}

struct Reverse;

impl ComputeHandler for Reverse {
    fn process(&self, inputs: &[&[u8]], outputs: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
        for (index, input) in inputs.iter().enumerate() {
            if let Some(output) = outputs.allocate(index, input.len())? {
                for (slot, byte) in output.iter_mut().zip(input.iter().rev()) {
                    *slot = *byte;
                }
            }
        }
        Ok(())
    }
}

struct Sha256Digest;

impl ComputeHandler for Sha256Digest {
    fn process(&self, inputs: &[&[u8]], outputs: &mut OutputSlots<'_>) -> Result<(), HandlerError> {
        for (index, input) in inputs.iter().enumerate() {
            let digest = Sha256::digest(input);
            if let Some(output) = outputs.allocate(index, digest.len())? {
                output.copy_from_slice(&digest);
            }
        }
        Ok(())
    }
}
