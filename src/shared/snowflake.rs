//! Job Identifier Generator
//!
//! Time-ordered unique IDs for typing jobs, in the same 64-bit layout the
//! platform uses for its own snowflakes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Platform epoch (2015-01-01T00:00:00.000Z)
const PLATFORM_EPOCH: u64 = 1420070400000;

const SEQUENCE_BITS: u64 = 12;
const WORKER_BITS: u64 = 10;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Generates `job_<snowflake>` identifiers.
///
/// Timestamp and sequence live in a single atomic word, so two submissions
/// in the same millisecond can never observe the same pair.
#[derive(Debug)]
pub struct JobIdGenerator {
    worker_id: u64,
    /// `(millis_since_epoch << SEQUENCE_BITS) | sequence`
    state: AtomicU64,
}

impl JobIdGenerator {
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: u64::from(worker_id) & ((1 << WORKER_BITS) - 1),
            state: AtomicU64::new(0),
        }
    }

    /// Next raw snowflake value
    pub fn next_id(&self) -> u64 {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let now = current_millis();
            let last = current >> SEQUENCE_BITS;
            let next = if now > last {
                now << SEQUENCE_BITS
            } else if current & SEQUENCE_MASK == SEQUENCE_MASK {
                // Sequence exhausted for this millisecond, borrow the next one.
                (last + 1) << SEQUENCE_BITS
            } else {
                current + 1
            };

            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    let millis = next >> SEQUENCE_BITS;
                    let sequence = next & SEQUENCE_MASK;
                    return (millis << (WORKER_BITS + SEQUENCE_BITS))
                        | (self.worker_id << SEQUENCE_BITS)
                        | sequence;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Next job identifier
    pub fn next_job_id(&self) -> String {
        format!("job_{}", self.next_id())
    }
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(PLATFORM_EPOCH)
        .saturating_sub(PLATFORM_EPOCH)
}
