//! Captcha/blocking gate
//!
//! The registry occasionally interposes a human-verification challenge. The
//! gate scans fetched page content for a fixed set of indicator phrases and,
//! when one is present, holds the pipeline until a re-check of freshly
//! re-fetched content comes back clean. The wait is unbounded: a challenge is
//! an operator-visible prompt, not a failure.

use crate::fetch::{FetchError, PageFetcher};
use std::time::Duration;

/// Phrases whose presence (case-insensitive) marks a page as blocked
pub const INDICATOR_PHRASES: &[&str] = &[
    "captcha",
    "recaptcha",
    "verify you are human",
    "security check",
    "please verify",
    "robot",
    "automation detected",
    "access denied",
    "suspicious activity",
    "prove you are human",
];

/// Blocks crawl progress while a human-verification challenge is on screen
#[derive(Debug, Clone)]
pub struct CaptchaGate {
    poll_interval: Duration,
}

impl CaptchaGate {
    /// Creates a gate that re-checks at the given interval
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Scans page content for a verification challenge
    pub fn is_blocked(page_content: &str) -> bool {
        let lowered = page_content.to_lowercase();
        INDICATOR_PHRASES
            .iter()
            .any(|phrase| lowered.contains(phrase))
    }

    /// Waits until the challenge clears, re-fetching content on every re-check
    ///
    /// Returns immediately when `content` is clean. Otherwise it sleeps one
    /// poll interval, replaces `content` with freshly fetched page content
    /// (never re-checking a stale snapshot), and repeats until clean. Returns
    /// whether the gate ever blocked.
    pub async fn clear<F>(
        &self,
        fetcher: &mut F,
        content: &mut String,
    ) -> Result<bool, FetchError>
    where
        F: PageFetcher + ?Sized,
    {
        if !Self::is_blocked(content) {
            return Ok(false);
        }

        tracing::warn!(
            "verification challenge detected; solve it in the registry session - \
             the crawl resumes automatically once it clears"
        );

        loop {
            tokio::time::sleep(self.poll_interval).await;
            *content = fetcher.refresh().await?;

            if !Self::is_blocked(content) {
                tracing::info!("verification challenge cleared, continuing");
                return Ok(true);
            }
            tracing::debug!("verification challenge still present, waiting");
        }
    }
}
