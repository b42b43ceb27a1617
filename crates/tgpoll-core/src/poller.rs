//! Long-poll loop.
//!
//! One fetch at a time; every decoded update is handed to its own task, so slow
//! handlers never delay the next `getUpdates`.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{
    bot::Bot,
    config::Config,
    dispatch::Dispatcher,
    model::{Decode, Update},
};

/// Delay schedule after consecutive failed fetches: `max ^ (failures / steps)` seconds.
///
/// With the defaults this is ~1.9s after one failure and exactly 600s from the
/// tenth failure on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub max_retry_interval: Duration,
    pub steps: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retry_interval: Duration::from_secs(600),
            steps: 10,
        }
    }
}

impl BackoffPolicy {
    pub fn clamp(&self, failures: u32) -> u32 {
        failures.min(self.steps)
    }

    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 || self.steps == 0 {
            return Duration::ZERO;
        }
        let exponent = f64::from(self.clamp(failures)) / f64::from(self.steps);
        Duration::from_secs_f64(self.max_retry_interval.as_secs_f64().powf(exponent))
    }
}

/// What one fetch attempt produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Transport error or `ok: false`; the failure counter stays incremented.
    Failed,
    /// A batch arrived: `received` raw updates, `dispatched` of them decoded and spawned.
    Batch { received: usize, dispatched: usize },
}

pub struct Poller {
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
    offset: i64,
    failures: u32,
    backoff: BackoffPolicy,
    timeout: Duration,
    in_flight: Option<Arc<Semaphore>>,
}

impl Poller {
    pub fn new(bot: Bot, dispatcher: Arc<Dispatcher>, timeout: Duration) -> Self {
        Self {
            bot,
            dispatcher,
            offset: 0,
            failures: 0,
            backoff: BackoffPolicy::default(),
            timeout,
            in_flight: None,
        }
    }

    pub fn from_config(bot: Bot, dispatcher: Arc<Dispatcher>, cfg: &Config) -> Self {
        let poller = Self::new(bot, dispatcher, cfg.polling_timeout);
        match cfg.max_in_flight_handlers {
            Some(limit) => poller.with_max_in_flight(limit),
            None => poller,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cap concurrently running handlers. Waiting happens inside the spawned
    /// task, never on the poll loop.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.in_flight = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    /// Next update id to request.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Consecutive failed fetches.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Poll until `shutdown` is cancelled. Fetch failures are never fatal.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(
            username = %self.bot.username(),
            timeout_secs = self.timeout.as_secs(),
            "polling started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if self.failures > 0 {
                self.failures = self.backoff.clamp(self.failures);
                let delay = self.backoff.delay(self.failures);
                tracing::debug!(
                    failures = self.failures,
                    delay_ms = delay.as_millis() as u64,
                    "backing off"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        tracing::info!(offset = self.offset, "polling stopped");
    }

    /// One fetch: optimistic failure count, offset advance, then one task per update.
    pub async fn poll_once(&mut self) -> PollOutcome {
        self.failures += 1;

        let batch = match self.bot.get_updates(self.offset, self.timeout).await {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                tracing::warn!(
                    failures = self.failures,
                    next_delay_ms = self.next_delay_ms(),
                    "getUpdates returned no result"
                );
                return PollOutcome::Failed;
            }
            Err(e) => {
                tracing::warn!(
                    failures = self.failures,
                    next_delay_ms = self.next_delay_ms(),
                    "getUpdates failed: {e}"
                );
                return PollOutcome::Failed;
            }
        };
        self.failures = 0;

        let received = batch.len();
        let updates: Vec<Update> = batch
            .iter()
            .filter_map(|raw| self.accept(raw))
            .collect();

        let dispatched = updates.len();
        for update in updates {
            self.spawn_dispatch(update);
        }

        PollOutcome::Batch {
            received,
            dispatched,
        }
    }

    /// Advance the offset past `raw` and decode it. A bad update is skipped,
    /// never the whole batch.
    fn accept(&mut self, raw: &Value) -> Option<Update> {
        let decoded = Update::decode(raw, self.bot.decode_context());
        let id = match &decoded {
            Ok(update) => Some(update.id),
            Err(_) => Update::peek_id(raw),
        };
        if let Some(id) = id {
            self.offset = self.offset.max(id.0.saturating_add(1));
        }

        match decoded {
            Ok(update) => Some(update),
            Err(e) => {
                tracing::warn!(update_id = ?id.map(|i| i.0), "skipping undecodable update: {e}");
                None
            }
        }
    }

    fn spawn_dispatch(&self, update: Update) {
        let bot = self.bot.clone();
        let dispatcher = self.dispatcher.clone();
        let in_flight = self.in_flight.clone();
        let update_id = update.id.0;

        tokio::spawn(async move {
            let _permit = match in_flight {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(p) => Some(p),
                    Err(_) => return,
                },
                None => None,
            };

            // Nested task so a panicking handler surfaces as a JoinError here.
            let handle = tokio::spawn(async move { dispatcher.dispatch(bot, update).await });
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(update_id, "handler failed: {e:#}"),
                Err(e) if e.is_panic() => tracing::error!(update_id, "handler panicked"),
                Err(e) => tracing::warn!(update_id, "handler task aborted: {e}"),
            }
        });
    }

    fn next_delay_ms(&self) -> u64 {
        self.backoff.delay(self.failures).as_millis() as u64
    }
}
