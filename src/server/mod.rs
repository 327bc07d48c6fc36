// src/server/mod.rs

//! Talking to the community server: version parsing, the HTTP transport and
//! the version compatibility check.

pub mod transport;
pub mod version;
pub mod version_check;

pub use transport::{HttpReply, ReqwestTransport, VersionTransport};
pub use version::ServerVersion;
pub use version_check::VersionChecker;
