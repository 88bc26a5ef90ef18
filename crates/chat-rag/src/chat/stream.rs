//! Word-by-word presentation of a finished answer

use futures::stream::{self, BoxStream, Fuse, StreamExt};
use std::time::Duration;

/// Lazy, fused stream of `word + " "` tokens
pub type WordStream = Fuse<BoxStream<'static, String>>;

/// Replays a complete answer as a typing effect
#[derive(Debug, Clone, Copy)]
pub struct StreamPresenter {
    delay: Duration,
}

impl StreamPresenter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Split `text` on whitespace and yield each word followed by one space.
    ///
    /// Nothing happens until the stream is polled. The delay is applied between
    /// consecutive words, never before the first one or after the last.
    pub fn present(&self, text: &str) -> WordStream {
        let words: Vec<String> = text.split_whitespace().map(|word| format!("{} ", word)).collect();
        let delay = self.delay;

        stream::unfold((words.into_iter(), true), move |(mut words, first)| async move {
            let word = words.next()?;
            if !first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Some((word, (words, false)))
        })
        .boxed()
        .fuse()
    }
}

impl Default for StreamPresenter {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}
