use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use game_core::{WordList, WordListFormat};
use game_persistence::repositories::UsedWordRepository;

/// Where the master word list comes from.
#[derive(Debug, Clone)]
pub enum WordSource {
    /// Re-read on every draw, so words can be added while the server runs.
    File(PathBuf),
    Static(WordList),
}

/// Candidate words for every session, minus each session's used record.
pub struct WordPool {
    source: WordSource,
    used: UsedWordRepository,
}

impl WordPool {
    pub fn new(source: WordSource, used: UsedWordRepository) -> Self {
        Self { source, used }
    }

    /// The master list as it is right now. An unreadable or malformed file
    /// is an empty list.
    pub async fn word_list(&self) -> WordList {
        match &self.source {
            WordSource::Static(list) => list.clone(),
            WordSource::File(path) => {
                let contents = match tokio::fs::read_to_string(path).await {
                    Ok(contents) => contents,
                    Err(e) => {
                        warn!("Cannot read word list {}: {}", path.display(), e);
                        return WordList::default();
                    }
                };

                match WordList::parse(&contents, WordListFormat::from_path(path)) {
                    Ok(list) => list,
                    Err(e) => {
                        warn!("Cannot parse word list {}: {:#}", path.display(), e);
                        WordList::default()
                    }
                }
            }
        }
    }

    pub async fn available(&self, session_id: &str) -> Result<Vec<String>> {
        let list = self.word_list().await;
        let used = self.used.used_set(session_id).await?;
        Ok(list
            .available(&used)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Uniformly random among the available words; `None` once exhausted.
    pub async fn draw(&self, session_id: &str) -> Result<Option<String>> {
        let list = self.word_list().await;
        let used = self.used.used_set(session_id).await?;
        let word = list.pick(&used);

        match &word {
            Some(word) => debug!("Drew {:?} for session {}", word, session_id),
            None => info!(
                "Session {} exhausted the word list ({} words, {} used)",
                session_id,
                list.len(),
                used.len()
            ),
        }
        Ok(word)
    }

    pub async fn mark_used(&self, session_id: &str, word: &str) -> Result<()> {
        if !self.used.mark_used(session_id, word).await? {
            info!("Word {:?} already recorded for session {}", word, session_id);
        }
        Ok(())
    }

    pub async fn clear_used(&self, session_id: &str) -> Result<()> {
        let removed = self.used.clear(session_id).await?;
        debug!("Cleared {} used words for session {}", removed, session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_persistence::connection::connect_to_memory_database;
    use game_persistence::repositories::SessionRepository;
    use migration::{Migrator, MigratorTrait};
    use std::io::Write;

    const SESSION: &str = "brave-falcon-20";

    async fn setup_pool(source: WordSource) -> WordPool {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SessionRepository::new(db.clone())
            .create(SESSION)
            .await
            .unwrap();
        WordPool::new(source, UsedWordRepository::new(db))
    }

    fn static_words(words: &[&str]) -> WordSource {
        WordSource::Static(WordList::new(words.iter().copied()))
    }

    #[tokio::test]
    async fn test_draw_skips_used_words() {
        let pool = setup_pool(static_words(&["casa", "mare", "sole"])).await;
        pool.mark_used(SESSION, "casa").await.unwrap();
        pool.mark_used(SESSION, "sole").await.unwrap();

        assert_eq!(pool.available(SESSION).await.unwrap(), vec!["mare"]);
        for _ in 0..10 {
            assert_eq!(pool.draw(SESSION).await.unwrap().as_deref(), Some("mare"));
        }
    }

    #[tokio::test]
    async fn test_draw_exhausted() {
        let pool = setup_pool(static_words(&["casa"])).await;
        pool.mark_used(SESSION, "casa").await.unwrap();
        assert!(pool.draw(SESSION).await.unwrap().is_none());

        pool.clear_used(SESSION).await.unwrap();
        assert_eq!(pool.draw(SESSION).await.unwrap().as_deref(), Some("casa"));
    }

    #[tokio::test]
    async fn test_mark_used_twice_is_fine() {
        let pool = setup_pool(static_words(&["casa", "mare"])).await;
        pool.mark_used(SESSION, "casa").await.unwrap();
        pool.mark_used(SESSION, "casa").await.unwrap();
        assert_eq!(pool.available(SESSION).await.unwrap(), vec!["mare"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_pool() {
        let pool = setup_pool(WordSource::File(PathBuf::from(
            "/definitely/not/here/words.json",
        )))
        .await;
        assert!(pool.available(SESSION).await.unwrap().is_empty());
        assert!(pool.draw(SESSION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_is_reread_on_every_draw() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "albero").unwrap();
        file.flush().unwrap();

        let pool = setup_pool(WordSource::File(file.path().to_path_buf())).await;
        assert_eq!(pool.draw(SESSION).await.unwrap().as_deref(), Some("albero"));
        pool.mark_used(SESSION, "albero").await.unwrap();
        assert!(pool.draw(SESSION).await.unwrap().is_none());

        writeln!(file, "fiume").unwrap();
        file.flush().unwrap();
        assert_eq!(pool.draw(SESSION).await.unwrap().as_deref(), Some("fiume"));
    }
}
