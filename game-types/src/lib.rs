pub mod errors;
pub mod messages;
pub mod session;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use session::*;
