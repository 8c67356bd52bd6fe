//! In-memory session and artifact services.
//!
//! Both live only for the lifetime of the process.

mod artifact;
mod session;

pub use artifact::InMemoryArtifactService;
pub use session::{InMemorySessionService, Session};
