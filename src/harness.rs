//! Bencher - per-run timing state.
//!
//! A benchmark body receives a [`Bencher`] whose iteration count is chosen
//! from outside. Setup happens before [`Bencher::reset_timer`]; only the work
//! after it is measured.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::BenchError;

/// Upper bound on iterations for a single run.
pub const MAX_ITERATIONS: u64 = 1_000_000_000;

pub struct Bencher {
    n: u64,
    start: Option<Instant>,
    elapsed: Duration,
}

impl Bencher {
    pub fn new(n: u64) -> Self {
        Self {
            n: n.max(1),
            start: Some(Instant::now()),
            elapsed: Duration::ZERO,
        }
    }

    /// Iterations the timed phase must perform.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Discard everything measured so far; keeps the timer running if it was.
    pub fn reset_timer(&mut self) {
        self.elapsed = Duration::ZERO;
        if self.start.is_some() {
            self.start = Some(Instant::now());
        }
    }

    pub fn start_timer(&mut self) {
        if self.start.is_none() {
            self.start = Some(Instant::now());
        }
    }

    pub fn stop_timer(&mut self) {
        if let Some(start) = self.start.take() {
            self.elapsed += start.elapsed();
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.start {
            Some(start) => self.elapsed + start.elapsed(),
            None => self.elapsed,
        }
    }

    /// Reset the clock, run `f` exactly `n` times, stop the clock. The first
    /// error aborts the run.
    pub fn iter<T, F>(&mut self, mut f: F) -> Result<(), BenchError>
    where
        F: FnMut() -> Result<T, BenchError>,
    {
        self.reset_timer();
        self.start_timer();
        for _ in 0..self.n {
            std::hint::black_box(f()?);
        }
        self.stop_timer();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub name: String,
    pub iterations: u64,
    #[serde(rename = "elapsed_ns", serialize_with = "serialize_nanos")]
    pub elapsed: Duration,
    pub ns_per_op: u64,
}

fn serialize_nanos<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_nanos())
}

impl BenchResult {
    pub fn new(name: impl Into<String>, bencher: &Bencher) -> Self {
        let elapsed = bencher.elapsed();
        Self {
            name: name.into(),
            iterations: bencher.n(),
            elapsed,
            ns_per_op: ns_per_op(elapsed, bencher.n()),
        }
    }
}

impl fmt::Display for BenchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Benchmark{:<24}\t{:>10}\t{:>10} ns/op",
            self.name, self.iterations, self.ns_per_op
        )
    }
}

fn ns_per_op(elapsed: Duration, n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    (elapsed.as_nanos() / n as u128) as u64
}

/// Next iteration count when growing toward `target`, given that `last`
/// iterations took `elapsed`.
///
/// Aims 20% past the linear estimate, grows at most 100x and at least by one,
/// and never exceeds [`MAX_ITERATIONS`].
pub fn predict_n(target: Duration, last: u64, elapsed: Duration) -> u64 {
    let last = last.max(1);
    let elapsed_ns = elapsed.as_nanos().max(1);
    let goal = (target.as_nanos() * last as u128 / elapsed_ns).min(MAX_ITERATIONS as u128) as u64;

    let mut n = goal.saturating_add(goal / 5);
    n = n.min(last.saturating_mul(100));
    n = n.max(last + 1);
    n.min(MAX_ITERATIONS)
}

/// How the driver picks iteration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run once with exactly this many iterations.
    Fixed(u64),
    /// Grow the iteration count until one run takes at least this long.
    Scaled(Duration),
}

impl RunMode {
    /// Whether a run of `bencher` is the final one, and if not, the next `n`.
    pub fn next(&self, bencher: &Bencher) -> Option<u64> {
        match *self {
            RunMode::Fixed(_) => None,
            RunMode::Scaled(target) => {
                if bencher.elapsed() >= target || bencher.n() >= MAX_ITERATIONS {
                    None
                } else {
                    Some(predict_n(target, bencher.n(), bencher.elapsed()))
                }
            }
        }
    }

    pub fn initial(&self) -> u64 {
        match *self {
            RunMode::Fixed(n) => n.max(1),
            RunMode::Scaled(_) => 1,
        }
    }
}
