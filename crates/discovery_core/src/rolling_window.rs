//! Fixed-size per-second bucket counter: "did at least `m` events occur in
//! the last `n` seconds?" Single-threaded use only — owned by its Watch.

use std::time::Instant;

/// A fixed-size ring of per-second counters.
///
/// Time is injected via `_at`-suffixed methods for deterministic testing;
/// production callers use the convenience methods that default to
/// `Instant::now()`.
#[derive(Debug)]
pub struct RollingWindow {
    size: usize,
    data: Vec<u64>,
    /// `-1` before the first increment, matching the upstream
    /// implementation's "not yet positioned" sentinel.
    cur: isize,
    now: Instant,
}

impl RollingWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![0; size],
            cur: -1,
            now: Instant::now(),
        }
    }

    pub fn incr(&mut self) {
        self.incr_at(Instant::now());
    }

    pub fn incr_at(&mut self, now: Instant) {
        let since = now
            .saturating_duration_since(self.now)
            .as_secs()
            .min(self.size as u64) as usize;

        if since == 0 {
            if self.cur < 0 {
                self.cur = (self.cur + self.size as isize).rem_euclid(self.size as isize);
            }
            self.data[self.cur as usize] += 1;
            return;
        }

        for _ in 0..since {
            self.cur = (self.cur + 1).rem_euclid(self.size as isize);
            self.data[self.cur as usize] = 0;
        }
        self.data[self.cur as usize] += 1;
        self.now = now;
    }

    /// True iff the sum of the last `n` buckets (clamped to the window size)
    /// reaches at least `m`.
    pub fn is_match(&self, n: usize, m: u64) -> bool {
        let n = n.min(self.size);
        if n == 0 || self.cur < 0 {
            return false;
        }
        let mut last = (self.cur - n as isize + 1).rem_euclid(self.size as isize);
        let mut count = 0u64;
        loop {
            count += self.data[last as usize];
            if count >= m {
                return true;
            }
            if last == self.cur {
                break;
            }
            last = (last + 1).rem_euclid(self.size as isize);
        }
        false
    }

    /// Sum of the last `n` buckets (clamped to the window size), without the
    /// early exit `is_match` uses.
    pub fn sum(&self, n: usize) -> u64 {
        let n = n.min(self.size);
        if n == 0 || self.cur < 0 {
            return 0;
        }
        let mut last = (self.cur - n as isize + 1).rem_euclid(self.size as isize);
        let mut count = 0u64;
        loop {
            count += self.data[last as usize];
            if last == self.cur {
                break;
            }
            last = (last + 1).rem_euclid(self.size as isize);
        }
        count
    }
}
