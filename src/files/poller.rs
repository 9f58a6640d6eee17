//! Waiting for uploaded files to finish processing.
//!
//! Large media such as video and audio is processed by the service after the
//! upload completes. Until the file is `ACTIVE` it cannot be referenced in a
//! request. [`wait_until_active`] refreshes the file's metadata through a
//! [`StatusLookup`] until it becomes active, fails, or the [`PollPolicy`]
//! gives up.
//!
//! ```rust,ignore
//! use gemini_tokens::prelude::*;
//!
//! let mut video = client
//!     .upload_file_from_path("media/Big_Buck_Bunny.mp4")
//!     .upload()
//!     .await?;
//! video.wait_until_active(&PollPolicy::default()).await?;
//! ```

use snafu::{ResultExt, Snafu};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{
    client::Error as ClientError,
    files::model::{File, FileState, FileStatus},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "file '{name}' failed processing: {}",
        status.as_ref().map_or_else(|| "no status reported".to_string(), ToString::to_string)
    ))]
    ProcessingFailed {
        name: String,
        status: Option<FileStatus>,
    },

    #[snafu(display("file '{name}' did not become active within {timeout:?}"))]
    Timeout { name: String, timeout: Duration },

    #[snafu(display("file '{name}' still '{state:?}' after {attempts} status checks"))]
    AttemptsExhausted {
        name: String,
        attempts: u32,
        state: FileState,
    },

    #[snafu(display("waiting for file '{name}' was cancelled"))]
    Cancelled { name: String },

    #[snafu(display("failed to look up the status of file '{name}'"))]
    Lookup {
        source: Box<ClientError>,
        name: String,
    },
}

/// Something that can fetch the current metadata of a file by name.
///
/// Implemented by [`Gemini`](crate::Gemini). Tests and callers with their own
/// transport can provide their own.
#[async_trait::async_trait]
pub trait StatusLookup: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<File, ClientError>;
}

/// How often and for how long to check a file's processing state.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait before the first status check
    pub interval: Duration,
    /// Upper bound for the wait between two checks
    pub max_interval: Duration,
    /// Factor applied to the wait after every check; values below 1 are treated as 1
    pub multiplier: f64,
    /// Give up once this much time has passed since the wait started
    pub timeout: Option<Duration>,
    /// Give up after this many status checks
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Checks every `interval`, forever.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            timeout: None,
            max_attempts: None,
        }
    }

    /// Checks every five seconds, forever.
    pub fn default_fixed() -> Self {
        Self::fixed(Duration::from_secs(5))
    }

    /// Grows the wait by `multiplier` after every check, up to `max_interval`.
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        let cap = self.max_interval.max(self.interval);
        let next = current.as_secs_f64() * multiplier;
        if next >= cap.as_secs_f64() {
            cap
        } else {
            Duration::from_secs_f64(next)
        }
    }
}

impl Default for PollPolicy {
    /// Starts at five seconds, backs off by 1.5x up to 30 seconds and gives
    /// up after ten minutes.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
            .with_backoff(1.5, Duration::from_secs(30))
            .with_timeout(Duration::from_secs(600))
    }
}

/// Refreshes `file` through `lookup` until the service reports it as active.
///
/// A file that is already active is returned right away, without sleeping or
/// calling `lookup`. Otherwise every round sleeps for the current interval and
/// then fetches the file again. `STATE_UNSPECIFIED`, `PROCESSING` and states
/// this crate does not recognize keep the loop going and `FAILED` ends it with [`Error::ProcessingFailed`].
///
/// # Errors
///
/// Besides a failed file this returns [`Error::Timeout`] when the next sleep
/// would overrun the policy's timeout, [`Error::AttemptsExhausted`] once
/// `max_attempts` checks were made, [`Error::Cancelled`] when `cancel` fires,
/// and [`Error::Lookup`] when a status check fails.
#[instrument(skip_all, fields(
    file.name = %file.name,
    poll.interval.ms = policy.interval.as_millis() as u64,
    timeout.secs = policy.timeout.map(|t| t.as_secs()),
    max.attempts = policy.max_attempts,
))]
pub async fn wait_until_active<L>(
    mut file: File,
    lookup: &L,
    policy: &PollPolicy,
    cancel: Option<&CancellationToken>,
) -> Result<File, Error>
where
    L: StatusLookup + ?Sized,
{
    let start = Instant::now();
    let mut interval = policy.interval;
    let mut attempts: u32 = 0;

    loop {
        match file.state {
            FileState::Active => {
                debug!(attempts, "file is active");
                return Ok(file);
            }
            FileState::Failed => {
                warn!(attempts, error = ?file.error, "file failed processing");
                return ProcessingFailedSnafu {
                    name: file.name,
                    status: file.error,
                }
                .fail();
            }
            FileState::StateUnspecified | FileState::Processing | FileState::Unrecognized => {}
        }

        if let Some(max_attempts) = policy.max_attempts {
            if attempts >= max_attempts {
                return AttemptsExhaustedSnafu {
                    name: file.name,
                    attempts,
                    state: file.state,
                }
                .fail();
            }
        }

        if let Some(timeout) = policy.timeout {
            if start.elapsed().saturating_add(interval) > timeout {
                return TimeoutSnafu {
                    name: file.name,
                    timeout,
                }
                .fail();
            }
        }

        debug!(state = ?file.state, attempt = attempts + 1, wait.ms = interval.as_millis() as u64, "file not active yet");
        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return CancelledSnafu { name: file.name }.fail();
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            None => tokio::time::sleep(interval).await,
        }

        file = lookup
            .lookup(&file.name)
            .await
            .map_err(Box::new)
            .context(LookupSnafu { name: &file.name })?;
        attempts += 1;
        interval = policy.next_interval(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    fn file(state: FileState) -> File {
        File {
            name: "files/big-buck-bunny".to_string(),
            display_name: None,
            mime_type: Some("video/mp4".parse().unwrap()),
            size_bytes: None,
            create_time: None,
            update_time: None,
            expiration_time: None,
            sha256_hash: None,
            uri: None,
            state,
            error: None,
        }
    }

    /// Replays a fixed sequence of states; repeats the last one forever.
    struct Scripted {
        states: Mutex<VecDeque<FileState>>,
        last: FileState,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(states: impl IntoIterator<Item = FileState>) -> Self {
            let states: VecDeque<_> = states.into_iter().collect();
            let last = *states.back().unwrap_or(&FileState::Processing);
            Self {
                states: Mutex::new(states),
                last,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl StatusLookup for Scripted {
        async fn lookup(&self, name: &str) -> Result<File, ClientError> {
            assert_eq!(name, "files/big-buck-bunny");
            self.calls.fetch_add(1, Ordering::SeqCst);
            let state = self.states.lock().unwrap().pop_front().unwrap_or(self.last);
            Ok(file(state))
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl StatusLookup for Failing {
        async fn lookup(&self, _name: &str) -> Result<File, ClientError> {
            Err(ClientError::BadResponse {
                code: 404,
                description: Some("file not found".to_string()),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn active_file_returns_without_sleeping() {
        let lookup = Scripted::new([FileState::Active]);
        let start = Instant::now();

        let file = wait_until_active(
            file(FileState::Active),
            &lookup,
            &PollPolicy::default_fixed(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(file.state, FileState::Active);
        assert_eq!(lookup.calls(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_once_per_non_terminal_state() {
        for k in 1..=4usize {
            // initial handle plus k - 1 lookups are non-terminal, the k-th lookup is active
            let mut states = vec![FileState::Processing; k - 1];
            states.push(FileState::Active);
            let lookup = Scripted::new(states);
            let start = Instant::now();

            let file = wait_until_active(
                file(FileState::StateUnspecified),
                &lookup,
                &PollPolicy::default_fixed(),
                None,
            )
            .await
            .unwrap();

            assert_eq!(file.state, FileState::Active);
            assert_eq!(lookup.calls(), k);
            assert_eq!(start.elapsed(), Duration::from_secs(5) * k as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_active_is_bounded_by_attempts() {
        let lookup = Scripted::new([FileState::Processing]);
        let policy = PollPolicy::default_fixed().with_max_attempts(25);

        let error = wait_until_active(file(FileState::Processing), &lookup, &policy, None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::AttemptsExhausted {
                attempts: 25,
                state: FileState::Processing,
                ..
            }
        ));
        assert_eq!(lookup.calls(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_state_is_surfaced() {
        let lookup = Scripted::new([FileState::Processing, FileState::Failed]);

        let error = wait_until_active(
            file(FileState::Processing),
            &lookup,
            &PollPolicy::default_fixed(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::ProcessingFailed { .. }));
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_are_propagated() {
        let error = wait_until_active(
            file(FileState::Processing),
            &Failing,
            &PollPolicy::default_fixed(),
            None,
        )
        .await
        .unwrap_err();

        match error {
            Error::Lookup { source, name } => {
                assert_eq!(name, "files/big-buck-bunny");
                assert!(matches!(*source, ClientError::BadResponse { code: 404, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_stops_before_overrunning() {
        let lookup = Scripted::new([FileState::Processing]);
        let policy = PollPolicy::default_fixed().with_timeout(Duration::from_secs(12));
        let start = Instant::now();

        let error = wait_until_active(file(FileState::Processing), &lookup, &policy, None)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Timeout { .. }));
        // checks at 5s and 10s, a third sleep would end at 15s
        assert_eq!(lookup.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_up_to_cap() {
        let lookup = Scripted::new([
            FileState::Processing,
            FileState::Processing,
            FileState::Processing,
            FileState::Active,
        ]);
        let policy = PollPolicy::fixed(Duration::from_secs(2)).with_backoff(2.0, Duration::from_secs(5));
        let start = Instant::now();

        wait_until_active(file(FileState::Processing), &lookup, &policy, None)
            .await
            .unwrap();

        // 2 + 4 + 5 + 5
        assert_eq!(start.elapsed(), Duration::from_secs(16));
        assert_eq!(lookup.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let lookup = Scripted::new([FileState::Processing]);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            canceller.cancel();
        });

        let error = wait_until_active(
            file(FileState::Processing),
            &lookup,
            &PollPolicy::default_fixed(),
            Some(&token),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::Cancelled { .. }));
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_state_keeps_polling() {
        let lookup = Scripted::new([FileState::Unrecognized, FileState::Active]);

        let file = wait_until_active(
            file(FileState::Processing),
            &lookup,
            &PollPolicy::default_fixed(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(file.state, FileState::Active);
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_times_out_instead_of_overflowing() {
        let lookup = Scripted::new([FileState::Processing]);
        let policy = PollPolicy::fixed(Duration::from_secs(1))
            .with_backoff(f64::MAX, Duration::MAX)
            .with_timeout(Duration::from_secs(60));

        let error = wait_until_active(file(FileState::Processing), &lookup, &policy, None)
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Timeout { .. }));
        assert_eq!(lookup.calls(), 1);
    }

    #[test]
    fn shrinking_multiplier_is_ignored() {
        let policy = PollPolicy::fixed(Duration::from_secs(5)).with_backoff(0.5, Duration::from_secs(1));
        assert_eq!(policy.next_interval(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn default_policy_backs_off_and_times_out() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_interval, Duration::from_secs(30));
        assert_eq!(policy.timeout, Some(Duration::from_secs(600)));
        assert_eq!(policy.next_interval(Duration::from_secs(5)), Duration::from_millis(7500));
        assert_eq!(policy.next_interval(Duration::from_secs(25)), Duration::from_secs(30));
        assert_eq!(PollPolicy::default_fixed().timeout, None);
    }
}
