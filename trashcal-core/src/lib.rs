//! Core types and request logic for building trash and recycling calendar subscription URLs.

/// Domain models shared by the client and front-ends.
pub mod model;
/// Traits describing the remote service and the clipboard, plus the error taxonomy.
pub mod ports;
/// Town registry parsing and lookup.
pub mod registry;
/// Day-horizon validation and collection type rules.
pub mod selection;
/// Per-town session driving submissions to a result.
pub mod session;
/// Canonical subscription and debug URL synthesis.
pub mod url;

pub use model::*;
pub use ports::*;
pub use registry::*;
pub use selection::*;
pub use session::*;
pub use url::*;
