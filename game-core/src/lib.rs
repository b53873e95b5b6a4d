pub mod rules;
pub mod scoring;
pub mod session;
pub mod session_code;
pub mod word_list;

// Re-export main components
pub use rules::*;
pub use scoring::*;
pub use session::*;
pub use session_code::*;
pub use word_list::*;
