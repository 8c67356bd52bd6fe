//! Core types for quire.

mod artifact;
mod extraction;
mod message;
mod session;

pub use artifact::*;
pub use extraction::*;
pub use message::*;
pub use session::*;
