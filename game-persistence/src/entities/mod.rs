pub mod prelude;

pub mod sessions;
pub mod used_words;
