//! # Rate-Limit Retry
//!
//! Long installs against GitHub-hosted flakes run into provider-side rate
//! limiting when many CI jobs hit the same endpoints. [`RateLimitRetrier`]
//! re-runs a command only when its output is classified as a rate-limit
//! failure, waiting a Fibonacci-growing delay plus random jitter between
//! attempts.
//!
//! ## Schedule
//!
//! With `base_delay_seconds = 30` the base delays are `30, 30, 60, 90, 150,
//! …`. Attempt 1 is the first execution. No wait ever follows the final
//! attempt.
//!
//! ## Seams
//!
//! - [`FailureClassifier`] decides which results are transient. The default
//!   [`GitHubRateLimit`] matches HTTP 403 together with rate-limit phrasing
//!   and nothing else.
//! - [`Sleeper`] and [`JitterSource`] let tests observe waits instead of
//!   blocking.

use crate::context::RepoContext;
use crate::error::Result;
use crate::runner::{CommandRunner, CommandSpec, RunResult};
use rand::Rng;
use std::time::Duration;

/// Immutable retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first execution.
    pub max_attempts: u32,
    pub base_delay_seconds: u64,
    pub jitter_seconds_min: u64,
    pub jitter_seconds_max: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            base_delay_seconds: 30,
            jitter_seconds_min: 0,
            jitter_seconds_max: 60,
        }
    }
}

/// Base delay before the retry that follows `attempt`.
///
/// Seeded so that attempts 1 and 2 both wait `base`; every later attempt
/// waits the sum of the two previous delays.
pub fn fibonacci_delay(attempt: u32, base: u64) -> u64 {
    let (mut previous, mut current) = (base, base);
    for _ in 2..attempt.max(1) {
        let next = previous.saturating_add(current);
        previous = current;
        current = next;
    }
    current
}

/// Decides whether a failed result is worth retrying.
pub trait FailureClassifier: Send + Sync {
    fn is_transient(&self, result: &RunResult) -> bool;
}

/// GitHub-style rate limiting: an HTTP 403 plus rate-limit wording.
pub struct GitHubRateLimit;

const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "rate-limit", "ratelimit"];

impl FailureClassifier for GitHubRateLimit {
    fn is_transient(&self, result: &RunResult) -> bool {
        if result.success() {
            return false;
        }
        let text = result.combined_output().to_lowercase();
        text.contains("403") && RATE_LIMIT_PHRASES.iter().any(|p| text.contains(p))
    }
}

/// Blocks the current thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of the random part of each wait.
pub trait JitterSource: Send + Sync {
    /// A value in `min..=max`.
    fn jitter(&self, min: u64, max: u64) -> u64;
}

pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Runs commands, retrying rate-limited failures with backoff.
pub struct RateLimitRetrier {
    policy: RetryPolicy,
    classifier: Box<dyn FailureClassifier>,
    sleeper: Box<dyn Sleeper>,
    jitter: Box<dyn JitterSource>,
}

impl Default for RateLimitRetrier {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RateLimitRetrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: Box::new(GitHubRateLimit),
            sleeper: Box::new(ThreadSleeper),
            jitter: Box::new(RandomJitter),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_jitter(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `command` in the repository directory, retrying transient
    /// failures.
    ///
    /// Returns the last result, successful or not. Only spawn errors are
    /// returned as `Err`; deciding whether a final failure is fatal is up to
    /// the caller.
    pub fn run_with_retry(
        &self,
        ctx: &RepoContext,
        runner: &CommandRunner,
        command: &CommandSpec,
    ) -> Result<RunResult> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = runner.run(command, &ctx.repo_dir, ctx.preview, true)?;
            if result.success() || !self.classifier.is_transient(&result) {
                return Ok(result);
            }
            if attempt >= max_attempts {
                log::warn!(
                    "`{}` still rate limited after {} attempts, giving up",
                    command,
                    attempt
                );
                return Ok(result);
            }

            let delay = fibonacci_delay(attempt, self.policy.base_delay_seconds).saturating_add(
                self.jitter.jitter(
                    self.policy.jitter_seconds_min,
                    self.policy.jitter_seconds_max,
                ),
            );
            log::warn!(
                "`{}` hit a rate limit (attempt {}/{}), retrying in {}s",
                command,
                attempt,
                max_attempts,
                delay
            );
            self.sleeper.sleep(Duration::from_secs(delay));
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::context_in;
    use crate::runner::testing::ScriptedSpawner;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct FixedJitter(u64);

    impl JitterSource for FixedJitter {
        fn jitter(&self, _min: u64, _max: u64) -> u64 {
            self.0
        }
    }

    fn rate_limited() -> RunResult {
        RunResult::new(
            1,
            "",
            "error: unable to download 'https://api.github.com/repos/x/y': HTTP error 403\n\
             API rate limit exceeded for 1.2.3.4",
        )
    }

    fn retrier(policy: RetryPolicy, sleeper: &RecordingSleeper, jitter: u64) -> RateLimitRetrier {
        RateLimitRetrier::new(policy)
            .with_sleeper(Box::new(sleeper.clone()))
            .with_jitter(Box::new(FixedJitter(jitter)))
    }

    #[test]
    fn test_fibonacci_schedule() {
        let delays: Vec<u64> = (1..=6).map(|n| fibonacci_delay(n, 30)).collect();
        assert_eq!(delays, vec![30, 30, 60, 90, 150, 240]);
    }

    #[test]
    fn test_two_rate_limits_then_success() {
        let temp = TempDir::new().unwrap();
        let ctx = context_in(temp.path(), "tool");
        let spawner =
            ScriptedSpawner::with_results(vec![rate_limited(), rate_limited(), RunResult::ok()]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_seconds: 30,
            jitter_seconds_min: 0,
            jitter_seconds_max: 10,
        };

        let result = retrier(policy, &sleeper, 7)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("nix profile install ."))
            .unwrap();

        assert!(result.success());
        assert_eq!(spawner.calls().len(), 3);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(37), Duration::from_secs(37)]
        );
    }

    #[test]
    fn test_jitter_on_saturated_delay_does_not_overflow() {
        let temp = TempDir::new().unwrap();
        let ctx = context_in(temp.path(), "tool");
        let spawner = ScriptedSpawner::with_results(vec![rate_limited(), RunResult::ok()]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_seconds: u64::MAX,
            jitter_seconds_min: 0,
            jitter_seconds_max: 10,
        };

        let result = retrier(policy, &sleeper, 10)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("nix profile install ."))
            .unwrap();

        assert!(result.success());
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(u64::MAX)]);
    }

    #[test]
    fn test_non_rate_limit_failure_not_retried() {
        let temp = TempDir::new().unwrap();
        let ctx = context_in(temp.path(), "tool");
        let spawner = ScriptedSpawner::with_results(vec![RunResult::new(1, "", "error: 403 Forbidden")]);
        let sleeper = RecordingSleeper::default();

        let result = retrier(RetryPolicy::default(), &sleeper, 0)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("nix build"))
            .unwrap();

        assert_eq!(result.returncode, 1);
        assert_eq!(spawner.calls().len(), 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_sleep_after_final_attempt() {
        let temp = TempDir::new().unwrap();
        let ctx = context_in(temp.path(), "tool");
        let spawner = ScriptedSpawner::with_results(vec![rate_limited(); 5]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_seconds: 1,
            jitter_seconds_min: 0,
            jitter_seconds_max: 0,
        };

        let result = retrier(policy, &sleeper, 0)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("nix build"))
            .unwrap();

        assert!(!result.success());
        assert_eq!(spawner.calls().len(), 4);
        let sleeps: Vec<u64> = sleeper.sleeps.lock().unwrap().iter().map(Duration::as_secs).collect();
        assert_eq!(sleeps, vec![1, 1, 2]);
    }

    #[test]
    fn test_success_first_try_never_sleeps() {
        let temp = TempDir::new().unwrap();
        let ctx = context_in(temp.path(), "tool");
        let spawner = ScriptedSpawner::new();
        let sleeper = RecordingSleeper::default();

        retrier(RetryPolicy::default(), &sleeper, 0)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("true"))
            .unwrap();

        assert_eq!(spawner.calls().len(), 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_preview_runs_once_without_spawning() {
        let temp = TempDir::new().unwrap();
        let mut ctx = context_in(temp.path(), "tool");
        ctx.preview = true;
        let spawner = ScriptedSpawner::with_results(vec![rate_limited()]);
        let sleeper = RecordingSleeper::default();

        let result = retrier(RetryPolicy::default(), &sleeper, 0)
            .run_with_retry(&ctx, &spawner.runner(), &CommandSpec::shell("nix build"))
            .unwrap();

        assert!(result.success());
        assert!(spawner.calls().is_empty());
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_classifier_requires_403_and_phrase() {
        let classifier = GitHubRateLimit;
        assert!(classifier.is_transient(&rate_limited()));
        assert!(classifier.is_transient(&RunResult::new(1, "HTTP 403: Rate-Limit reached", "")));
        assert!(!classifier.is_transient(&RunResult::new(1, "", "HTTP 403 Forbidden")));
        assert!(!classifier.is_transient(&RunResult::new(1, "", "rate limit exceeded (429)")));
        assert!(!classifier.is_transient(&RunResult::new(0, "", "403 rate limit")));
    }

    #[test]
    fn test_random_jitter_bounds() {
        let jitter = RandomJitter;
        for _ in 0..100 {
            let value = jitter.jitter(5, 10);
            assert!((5..=10).contains(&value));
        }
        assert_eq!(jitter.jitter(9, 3), 9);
    }

    proptest! {
        #[test]
        fn prop_fibonacci_first_two_equal_base(base in 0u64..10_000) {
            prop_assert_eq!(fibonacci_delay(1, base), base);
            prop_assert_eq!(fibonacci_delay(2, base), base);
        }

        #[test]
        fn prop_fibonacci_recurrence(base in 0u64..10_000, attempt in 3u32..40) {
            prop_assert_eq!(
                fibonacci_delay(attempt, base),
                fibonacci_delay(attempt - 1, base) + fibonacci_delay(attempt - 2, base)
            );
        }

        #[test]
        fn prop_text_without_403_never_transient(text in "[a-z ]{0,80}") {
            let result = RunResult::new(1, "", format!("{} rate limit", text));
            prop_assert!(!GitHubRateLimit.is_transient(&result));
        }
    }
}
