pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod files;
pub mod link;

// Re-export the driver and its collaborators for easy access
pub use config::{LinkConfig, SessionConfig};
pub use driver::{ProtocolDriver, SessionReport, run_with_files};
pub use error::{ErrorKind, SessionError};
pub use files::{SessionFiles, SessionInputs};
pub use link::{Link, SerialLink, StreamLink, TimedStream, open_session};
