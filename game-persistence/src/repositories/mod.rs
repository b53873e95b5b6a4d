pub mod session_repository;
pub mod used_word_repository;

pub use session_repository::SessionRepository;
pub use used_word_repository::UsedWordRepository;
