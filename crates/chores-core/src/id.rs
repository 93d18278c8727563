//! Time-ordered 64-bit id generation.
//!
//! Layout, most significant bit first:
//!
//! ```text
//! | 41 bits ms since EPOCH_MS | 10 bits node | 12 bits sequence |
//! ```
//!
//! A single mutex guards the `(last_ms, sequence)` pair, so ids handed out by
//! one generator are strictly increasing across threads.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::error::ErrorCode;
use crate::model::ChoreId;

pub const TIMESTAMP_BITS: u32 = 41;
pub const NODE_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;

pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
pub const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

const NODE_SHIFT: u32 = SEQUENCE_BITS;
const TIME_SHIFT: u32 = NODE_BITS + SEQUENCE_BITS;

/// 2024-01-01T00:00:00Z in unix milliseconds.
pub const EPOCH_MS: u64 = 1_704_067_200_000;

/// Errors raised by [`IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("node id {0} is out of range (0..={MAX_NODE_ID})")]
    NodeOutOfRange(u16),

    #[error("clock moved backwards: last id used {last_ms}ms, clock now reads {now_ms}ms")]
    ClockMovedBackwards { last_ms: u64, now_ms: u64 },

    #[error("clock reads {now_ms}ms, before the id epoch")]
    BeforeEpoch { now_ms: u64 },
}

impl IdError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NodeOutOfRange(_) => ErrorCode::ConfigParseError,
            Self::ClockMovedBackwards { .. } | Self::BeforeEpoch { .. } => {
                ErrorCode::ClockMovedBackwards
            }
        }
    }
}

/// Millisecond wall-clock source.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_ms: Option<u64>,
    sequence: u64,
}

/// Mutex-protected snowflake generator.
pub struct IdGenerator<C: Clock = SystemClock> {
    node_id: u16,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl IdGenerator<SystemClock> {
    /// Create a generator on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::NodeOutOfRange`] if `node_id` does not fit in 10 bits.
    pub fn new(node_id: u16) -> Result<Self, IdError> {
        Self::with_clock(node_id, SystemClock)
    }
}

impl<C: Clock> IdGenerator<C> {
    /// Create a generator on a caller-supplied clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::NodeOutOfRange`] if `node_id` does not fit in 10 bits.
    pub fn with_clock(node_id: u16, clock: C) -> Result<Self, IdError> {
        if node_id > MAX_NODE_ID {
            return Err(IdError::NodeOutOfRange(node_id));
        }
        Ok(Self {
            node_id,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    #[must_use]
    pub const fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Produce the next id.
    ///
    /// Within one millisecond the sequence increments; once it wraps the call
    /// spins until the clock advances. A clock reading earlier than the last
    /// issued timestamp is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::ClockMovedBackwards`] or [`IdError::BeforeEpoch`].
    pub fn next_id(&self) -> Result<ChoreId, IdError> {
        // A poisoned lock only means another caller panicked mid-generation;
        // the state pair itself is always written atomically.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut now = self.clock.now_ms();
        if now < EPOCH_MS {
            return Err(IdError::BeforeEpoch { now_ms: now });
        }

        match state.last_ms {
            Some(last) if now < last => {
                return Err(IdError::ClockMovedBackwards {
                    last_ms: last,
                    now_ms: now,
                });
            }
            Some(last) if now == last => {
                state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
                if state.sequence == 0 {
                    now = self.wait_next_ms(last)?;
                }
            }
            _ => state.sequence = 0,
        }

        state.last_ms = Some(now);
        let raw = ((now - EPOCH_MS) << TIME_SHIFT)
            | (u64::from(self.node_id) << NODE_SHIFT)
            | state.sequence;
        Ok(ChoreId::new(raw))
    }

    fn wait_next_ms(&self, last: u64) -> Result<u64, IdError> {
        loop {
            let now = self.clock.now_ms();
            if now > last {
                return Ok(now);
            }
            if now < last {
                return Err(IdError::ClockMovedBackwards {
                    last_ms: last,
                    now_ms: now,
                });
            }
            std::hint::spin_loop();
        }
    }
}

/// Parts packed into an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub unix_ms: u64,
    pub node_id: u16,
    pub sequence: u16,
}

/// Unpack an id into its timestamp, node and sequence.
#[must_use]
pub fn decompose(id: ChoreId) -> IdParts {
    let raw = id.get();
    let sequence = u16::try_from(raw & MAX_SEQUENCE).unwrap_or(u16::MAX);
    let node_id = u16::try_from((raw >> NODE_SHIFT) & u64::from(MAX_NODE_ID)).unwrap_or(u16::MAX);
    IdParts {
        unix_ms: (raw >> TIME_SHIFT) + EPOCH_MS,
        node_id,
        sequence,
    }
}

/// Creation time encoded in an id.
#[must_use]
pub fn created_at(id: ChoreId) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(decompose(id).unix_ms).ok()?;
    DateTime::from_timestamp_millis(millis)
}
