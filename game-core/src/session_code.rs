use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "allegro", "brave", "calmo", "clever", "dolce", "eager", "fast", "felice", "gentle", "happy",
    "jolly", "lucky", "mighty", "quiet", "rapido", "shiny", "silent", "sunny", "swift", "vivace",
];

const NOUNS: &[&str] = &[
    "albero", "badger", "castle", "comet", "delfino", "falcon", "fiume", "gatto", "lemon",
    "lupo", "meadow", "otter", "pepper", "pizza", "river", "rocket", "sole", "tiger", "tulip",
    "volpe",
];

/// Upper bound on the length of a generated code.
pub const MAX_CODE_LEN: usize = 20;

/// A memorable, human-typeable code such as `lucky-otter-42`.
pub fn candidate_session_code() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("lucky");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("otter");
    let number: u8 = rng.gen_range(10..100);

    let mut code = format!("{}-{}-{}", adjective, noun, number);
    code.truncate(MAX_CODE_LEN);
    code
}

/// Used once memorable candidates keep colliding.
pub fn fallback_session_code() -> String {
    let mut code = uuid::Uuid::new_v4().simple().to_string();
    code.truncate(12);
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_code_alphabet(code: &str) -> bool {
        code.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn test_candidate_shape() {
        for _ in 0..100 {
            let code = candidate_session_code();
            assert!(code.len() <= MAX_CODE_LEN);
            assert_eq!(code.split('-').count(), 3);
            assert!(is_code_alphabet(&code));
        }
    }

    #[test]
    fn test_fallback_shape() {
        let code = fallback_session_code();
        assert_eq!(code.len(), 12);
        assert!(is_code_alphabet(&code));
        assert_ne!(code, fallback_session_code());
    }
}
