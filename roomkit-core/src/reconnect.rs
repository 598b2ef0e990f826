//! Session reconnection coordination
//!
//! The coordinator owns the session's [`ConnectionState`] and drives the retry
//! loop after a transport-level loss signal. Observers subscribe to state
//! transitions; track-owning code uses them to gate its own operations.
//!
//! ```text
//! Connected ──loss──▶ Reconnecting(1..=max) ──resume+replay──▶ Reconnected
//!     │                    │                                     │
//!     └──────close─────────┴──exhausted / fatal──▶ Disconnected ◀┘
//! ```
//!
//! `Disconnected` is terminal. A new connection needs a fresh coordinator.

use crate::error::RoomKitError;
use crate::event::{EventBus, EventStream};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Backoff policy for reconnection attempts
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Maximum number of resume attempts before giving up
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier applied per attempt
    pub multiplier: f64,
    /// Randomize delays to avoid synchronized reconnect storms
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(7),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with the given attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait before the given attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter && capped_ms > 0.0 {
            // Full delay scaled into [50%, 100%]
            capped_ms * rand::thread_rng().gen_range(0.5..=1.0)
        } else {
            capped_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DisconnectReason {
    /// The application closed the session
    ClientInitiated,
    /// The server asked us to leave
    ServerInitiated,
    /// All resume attempts failed
    MaxAttemptsExceeded,
    /// A resume attempt failed in a way retrying cannot fix
    NonRetryable(String),
    /// The underlying transport was closed without a resume attempt
    TransportClosed,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::ClientInitiated => write!(f, "client initiated"),
            DisconnectReason::ServerInitiated => write!(f, "server initiated"),
            DisconnectReason::MaxAttemptsExceeded => write!(f, "max reconnect attempts exceeded"),
            DisconnectReason::NonRetryable(reason) => write!(f, "non-retryable failure: {}", reason),
            DisconnectReason::TransportClosed => write!(f, "transport closed"),
        }
    }
}

/// Session connection state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// Session is up
    Connected,
    /// Waiting for or running a resume attempt
    Reconnecting {
        /// Current attempt (1-indexed)
        attempt: u32,
        /// Configured attempt budget
        max_attempts: u32,
        /// Delay before this attempt runs
        next_delay: Duration,
    },
    /// Session resumed and state has been replayed
    Reconnected,
    /// Terminal state
    Disconnected {
        /// Why the session ended
        reason: DisconnectReason,
    },
}

impl ConnectionState {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Reconnected => "reconnected",
            ConnectionState::Disconnected { .. } => "disconnected",
        }
    }

    /// Whether media and signaling operations may run
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Reconnected
        )
    }
}

/// Failure of a single resume attempt
#[derive(Error, Debug, Clone)]
pub enum ResumeError {
    /// The attempt failed but a later one may succeed
    #[error("Resume attempt failed: {reason}")]
    Retryable {
        /// Failure reason
        reason: String,
    },
    /// The session cannot be resumed
    #[error("Resume rejected: {reason}")]
    Fatal {
        /// Failure reason
        reason: String,
    },
}

/// Transport collaborator able to resume a dropped session
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Try to resume the session
    async fn resume(&self, attempt: u32) -> Result<(), ResumeError>;
}

/// Re-asserts room and track state to signaling after a resume
#[async_trait]
pub trait StateReplayer: Send + Sync {
    /// Push every piece of state the server may have forgotten
    async fn replay(&self) -> Result<(), RoomKitError>;
}

/// Drives [`ConnectionState`] transitions and the retry loop
#[derive(Debug)]
pub struct ReconnectCoordinator {
    policy: ReconnectPolicy,
    state: Mutex<ConnectionState>,
    events: EventBus<ConnectionState>,
}

impl ReconnectCoordinator {
    /// Create a coordinator for a freshly connected session
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(ConnectionState::Connected),
            events: EventBus::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    /// Retry policy in effect
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> EventStream<ConnectionState> {
        self.events.subscribe()
    }

    /// Whether a retry loop is in progress
    pub fn is_reconnecting(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Reconnecting { .. })
    }

    /// Whether the session has ended
    pub fn is_disconnected(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Disconnected { .. })
    }

    /// Terminate the session. Returns false if it already ended.
    pub fn disconnect(&self, reason: DisconnectReason) -> bool {
        self.transition(ConnectionState::Disconnected { reason })
    }

    /// React to a transport loss signal by running the retry loop to completion.
    ///
    /// A loss signal while already reconnecting is ignored, so only one retry
    /// loop ever runs. Returns the state the loop settled in.
    pub async fn handle_connection_lost(
        &self,
        transport: &dyn SessionTransport,
        replayer: &dyn StateReplayer,
    ) -> ConnectionState {
        let max_attempts = self.policy.max_attempts;
        let first_delay = self.policy.delay_for_attempt(1);

        {
            let mut state = self.state.lock();
            match &*state {
                ConnectionState::Connected | ConnectionState::Reconnected => {}
                other => {
                    debug!("🔁 Ignoring loss signal while {}", other.name());
                    return other.clone();
                }
            }

            let next = if max_attempts == 0 {
                ConnectionState::Disconnected {
                    reason: DisconnectReason::MaxAttemptsExceeded,
                }
            } else {
                ConnectionState::Reconnecting {
                    attempt: 1,
                    max_attempts,
                    next_delay: first_delay,
                }
            };
            info!("📡 Connection lost: {} -> {}", state.name(), next.name());
            *state = next.clone();
            self.events.emit(next.clone());

            if max_attempts == 0 {
                return next;
            }
        }

        let mut delay = first_delay;
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                delay = self.policy.delay_for_attempt(attempt);
                let next = ConnectionState::Reconnecting {
                    attempt,
                    max_attempts,
                    next_delay: delay,
                };
                if !self.transition(next) {
                    return self.state();
                }
            }

            debug!(
                "⏳ Reconnect attempt {}/{} in {:?}",
                attempt, max_attempts, delay
            );
            tokio::time::sleep(delay).await;

            if self.is_disconnected() {
                debug!("🛑 Session closed during backoff, abandoning reconnect");
                return self.state();
            }

            let resumed = transport.resume(attempt).await;
            if self.is_disconnected() {
                debug!("🛑 Session closed during resume, skipping replay");
                return self.state();
            }

            match resumed {
                Ok(()) => match replayer.replay().await {
                    Ok(()) => {
                        self.transition(ConnectionState::Reconnected);
                        return self.state();
                    }
                    Err(e) => {
                        warn!(
                            "⚠️ State replay failed after resume attempt {}: {}",
                            attempt, e
                        );
                    }
                },
                Err(ResumeError::Retryable { reason }) => {
                    warn!(
                        "⚠️ Resume attempt {}/{} failed: {}",
                        attempt, max_attempts, reason
                    );
                }
                Err(ResumeError::Fatal { reason }) => {
                    warn!("❌ Resume rejected, giving up: {}", reason);
                    self.disconnect(DisconnectReason::NonRetryable(reason));
                    return self.state();
                }
            }
        }

        self.disconnect(DisconnectReason::MaxAttemptsExceeded);
        self.state()
    }

    /// Apply a transition unless the session already ended
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, ConnectionState::Disconnected { .. }) {
            return false;
        }
        info!("🔄 Session state changed: {} -> {}", state.name(), next.name());
        *state = next.clone();
        // Emitted under the lock so observers see transitions in order
        self.events.emit(next);
        true
    }
}
