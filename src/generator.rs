use std::fmt;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::client::Completer;
use crate::error::GenerateError;
use crate::extract::extract_record;
use crate::prompt::build_request;
use crate::slug::slugify;
use crate::store::ArticleStore;

/// Where a topic is in its single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    Pending,
    Requested,
    Extracted,
    Persisted,
    Failed,
}

impl fmt::Display for TopicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TopicState::Pending => "pending",
            TopicState::Requested => "requested",
            TopicState::Extracted => "extracted",
            TopicState::Persisted => "persisted",
            TopicState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of one topic: the new collection length, or why it failed.
pub type TopicOutcome = Result<usize, GenerateError>;

/// Run summary returned after all topics are handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub persisted: usize,
    pub failed: usize,
}

impl RunStats {
    fn record(&mut self, outcome: &TopicOutcome) {
        self.total += 1;
        match outcome {
            Ok(_) => self.persisted += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub struct Generator<C> {
    completer: Arc<C>,
    store: ArticleStore,
    model: String,
    progress: bool,
}

impl<C: Completer + 'static> Generator<C> {
    pub fn new(completer: C, store: ArticleStore, model: &str) -> Self {
        Generator {
            completer: Arc::new(completer),
            store,
            model: model.to_string(),
            progress: false,
        }
    }

    /// Draw a progress bar over multi-topic runs.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    /// Request, extract and persist one topic.
    pub async fn process_topic(&self, topic: &str) -> TopicOutcome {
        debug!(topic, state = %TopicState::Pending);
        let request = build_request(&self.model, topic);
        debug!(topic, state = %TopicState::Requested);
        let text = self.completer.complete(&request).await;
        self.finish_topic(topic, text)
    }

    fn finish_topic(&self, topic: &str, text: Result<String, GenerateError>) -> TopicOutcome {
        let outcome = text.and_then(|t| self.persist(topic, &t));
        match &outcome {
            Ok(count) => info!(topic, state = %TopicState::Persisted, count, "article saved"),
            Err(e) => warn!(topic, state = %TopicState::Failed, error = %e, "topic failed"),
        }
        outcome
    }

    fn persist(&self, topic: &str, text: &str) -> TopicOutcome {
        let record = extract_record(text)?;
        debug!(topic, state = %TopicState::Extracted, title = %record.title);
        if slugify(&record.title).is_none() {
            warn!(topic, title = %record.title, "title has no usable slug, renderer will fall back to a timestamp");
        }
        Ok(self.store.append(&record)?)
    }

    /// Process topics one after another, in order.
    pub async fn run(&self, topics: &[String]) -> RunStats {
        let pb = self.progress_bar(topics.len());
        let mut stats = RunStats::default();
        for topic in topics {
            let outcome = self.process_topic(topic).await;
            stats.record(&outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!(
            "Generated {} topics ({} saved, {} failed)",
            stats.total, stats.persisted, stats.failed
        );
        stats
    }

    /// Issue up to `concurrency` requests at once. Completions flow back over a
    /// channel to this task, which is the only one touching the store, so
    /// records land in completion order.
    pub async fn run_concurrent(&self, topics: &[String], concurrency: usize) -> RunStats {
        let concurrency = concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let (tx, mut rx) =
            tokio::sync::mpsc::channel::<(usize, Result<String, GenerateError>)>(concurrency * 2);

        for (idx, topic) in topics.iter().enumerate() {
            let completer = Arc::clone(&self.completer);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let request = build_request(&self.model, topic);

            tokio::spawn(async move {
                let text = match sem.acquire().await {
                    Ok(_permit) => completer.complete(&request).await,
                    Err(e) => Err(GenerateError::Transport(e.to_string())),
                };
                let _ = tx.send((idx, text)).await;
            });
        }

        // Drop our copy of tx so rx closes when all spawned tasks finish
        drop(tx);

        let pb = self.progress_bar(topics.len());
        let mut stats = RunStats::default();
        let mut arrived = vec![false; topics.len()];
        while let Some((idx, text)) = rx.recv().await {
            arrived[idx] = true;
            let outcome = self.finish_topic(&topics[idx], text);
            stats.record(&outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        // A task that panicked never reports back.
        for (topic, _) in topics.iter().zip(&arrived).filter(|(_, seen)| !**seen) {
            warn!(topic = %topic, state = %TopicState::Failed, "request task died");
            stats.total += 1;
            stats.failed += 1;
        }

        info!(
            "Generated {} topics ({} saved, {} failed)",
            stats.total, stats.persisted, stats.failed
        );
        stats
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress || len < 2 {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ChatRequest;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies per topic; unknown topics get a 500, status 0 panics.
    struct ScriptedCompleter {
        replies: HashMap<String, (u16, String)>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedCompleter {
        fn new(replies: &[(&str, u16, &str)]) -> Self {
            ScriptedCompleter {
                replies: replies
                    .iter()
                    .map(|(t, s, b)| (t.to_string(), (*s, b.to_string())))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Completer for ScriptedCompleter {
        async fn complete(&self, request: &ChatRequest) -> Result<String, GenerateError> {
            let user = &request.messages[1].content;
            self.seen.lock().unwrap().push(user.clone());
            let topic = user
                .strip_prefix("Generate an article about \"")
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or_default();
            let (status, body) = self
                .replies
                .get(topic)
                .cloned()
                .unwrap_or((500, String::new()));
            if status == 0 {
                panic!("scripted crash for {}", topic);
            }
            crate::client::read_completion(status, &body)
        }
    }

    fn ok_body(text: &str) -> String {
        serde_json::json!({ "choices": [{ "message": { "content": text } }] }).to_string()
    }

    fn setup(replies: &[(&str, u16, &str)]) -> (TempDir, Generator<ScriptedCompleter>) {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("articles.json"));
        let generator = Generator::new(ScriptedCompleter::new(replies), store, "test-model");
        (dir, generator)
    }

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failed_middle_topic_does_not_stop_the_rest() {
        let one = ok_body("Title: One\nShort Description: d1\nArticle: Body one.");
        let three = ok_body("Title: Three\nArticle: Body three.");
        let (_dir, generator) = setup(&[
            ("first", 200, &one),
            ("second", 503, r#"{"error":{"message":"overloaded"}}"#),
            ("third", 200, &three),
        ]);

        let stats = generator.run(&topics(&["first", "second", "third"])).await;
        assert_eq!(stats, RunStats { total: 3, persisted: 2, failed: 1 });

        let saved = generator.store().load_strict().unwrap();
        let titles: Vec<&str> = saved.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Three"]);
        assert_eq!(generator.completer.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_completion_is_not_persisted() {
        let bad = ok_body("Title: \nArticle: Body text");
        let (_dir, generator) = setup(&[("x", 200, &bad)]);
        let outcome = generator.process_topic("x").await;
        assert!(matches!(outcome, Err(GenerateError::MalformedResponse("title"))));
        assert!(generator.store().load().is_empty());
    }

    #[tokio::test]
    async fn empty_response_is_not_persisted() {
        let (_dir, generator) = setup(&[("x", 200, r#"{"choices":[]}"#)]);
        assert!(matches!(
            generator.process_topic("x").await,
            Err(GenerateError::EmptyResponse)
        ));
        assert!(!generator.store().path().exists());
    }

    #[tokio::test]
    async fn topic_is_sent_verbatim() {
        let body = ok_body("Title: T\nArticle: B");
        let topic = "cats\" and \"dogs";
        let (_dir, generator) = setup(&[(topic, 200, &body)]);
        assert_eq!(generator.process_topic(topic).await.unwrap(), 1);
        let seen = generator.completer.seen.lock().unwrap();
        assert!(seen[0].contains(topic));
    }

    #[tokio::test]
    async fn concurrent_run_keeps_every_append() {
        let bodies: Vec<(String, String)> = (0..12)
            .map(|i| (format!("t{}", i), ok_body(&format!("Title: T{}\nArticle: B{}", i, i))))
            .collect();
        let replies: Vec<(&str, u16, &str)> = bodies
            .iter()
            .map(|(t, b)| (t.as_str(), 200, b.as_str()))
            .collect();
        let (_dir, generator) = setup(&replies);

        let names: Vec<String> = bodies.iter().map(|(t, _)| t.clone()).collect();
        let stats = generator.run_concurrent(&names, 4).await;
        assert_eq!(stats.persisted, 12);

        let mut titles: Vec<String> = generator
            .store()
            .load_strict()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        titles.sort();
        let mut expected: Vec<String> = (0..12).map(|i| format!("T{}", i)).collect();
        expected.sort();
        assert_eq!(titles, expected);
    }

    #[tokio::test]
    async fn crashed_request_task_counts_as_failed() {
        let a = ok_body("Title: A\nArticle: Body a.");
        let c = ok_body("Title: C\nArticle: Body c.");
        let (_dir, generator) = setup(&[("a", 200, &a), ("boom", 0, ""), ("c", 200, &c)]);

        let stats = generator.run_concurrent(&topics(&["a", "boom", "c"]), 2).await;
        assert_eq!(stats, RunStats { total: 3, persisted: 2, failed: 1 });
        assert_eq!(generator.store().load().len(), 2);
    }
}
