//! Monotonic nanosecond timestamp generation.
//!
//! Thread and message keys embed a nanosecond timestamp as their ordering
//! component. Two calls in the same nanosecond would collide, so this
//! clock guarantees strict monotonicity by bumping past any previously
//! issued value.

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_NS: AtomicI64 = AtomicI64::new(0);

fn wall_clock_ns() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as i64
}

/// Return a nanosecond timestamp strictly greater than every value
/// previously returned by this process.
pub fn next_ns() -> i64 {
    loop {
        let now = wall_clock_ns();
        let last = LAST_NS.load(Ordering::Acquire);
        let candidate = if now > last { now } else { last + 1 };
        if LAST_NS
            .compare_exchange(last, candidate, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_strictly_increasing() {
        let mut last = next_ns();
        for _ in 0..1000 {
            let next = next_ns();
            assert!(next > last);
            last = next;
        }
    }
}
