use game_core::{GameRules, Session, WordList};
use std::collections::HashSet;

/// Creates a test WordList with a known set of words
pub fn create_test_word_list() -> WordList {
    WordList::new(["casa", "mare", "sole", "luna", "albero", "fiume", "gatto"])
}

/// Creates a lobby session with default rules
pub fn create_standard_session() -> Session {
    Session::new("lucky-otter-42".to_string(), GameRules::default())
}

/// Creates a lobby session with custom rules
pub fn create_session_with_rules(rules: GameRules) -> Session {
    Session::new("swift-comet-11".to_string(), rules)
}

/// Tracks used words the way the persistent store does for a session
#[derive(Default)]
pub struct UsedWords {
    words: HashSet<String>,
}

impl UsedWords {
    pub fn mark(&mut self, word: &str) {
        self.words.insert(word.to_string());
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn as_set(&self) -> &HashSet<String> {
        &self.words
    }
}
