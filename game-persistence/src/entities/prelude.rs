pub use super::sessions::Entity as Sessions;
pub use super::used_words::Entity as UsedWords;
