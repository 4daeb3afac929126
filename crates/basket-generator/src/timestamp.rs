//! Timestamp formatting and payment delay.

use chrono::{DateTime, Local, TimeDelta};
use rand::Rng;

/// Longest delay between a sale and its payment: 5 minutes 59 seconds.
pub const MAX_PAYMENT_DELAY_MS: i64 = 359_000;

/// Local wall time with millisecond precision, with `offset` appended verbatim.
pub fn format_local(instant: &DateTime<Local>, offset: &str) -> String {
    format!("{}{}", instant.format("%Y-%m-%dT%H:%M:%S%.3f"), offset)
}

/// Epoch milliseconds as a decimal string.
pub fn epoch_millis(instant: &DateTime<Local>) -> String {
    instant.timestamp_millis().to_string()
}

/// Draw a payment delay of 0-5 minutes plus 0-59 seconds.
pub fn payment_delay<R: Rng>(rng: &mut R) -> TimeDelta {
    let minutes = rng.gen_range(0..=5);
    let seconds = rng.gen_range(0..=59);
    TimeDelta::minutes(minutes) + TimeDelta::seconds(seconds)
}
