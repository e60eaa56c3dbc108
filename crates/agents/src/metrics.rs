use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use extract::ParseStrategy;

use crate::call::{AgentResponse, FailureKind};

pub struct Metrics {
    // Counters
    total_calls: AtomicUsize,
    successful_calls: AtomicUsize,
    upstream_failures: AtomicUsize,
    parse_failures: AtomicUsize,

    // Which parse attempt recovered the response
    strict_parses: AtomicUsize,
    repaired_parses: AtomicUsize,
    lenient_parses: AtomicUsize,

    fallbacks_used: AtomicUsize,
    regenerations: AtomicUsize,

    // Timing (in microseconds)
    total_call_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_calls: AtomicUsize::new(0),
            successful_calls: AtomicUsize::new(0),
            upstream_failures: AtomicUsize::new(0),
            parse_failures: AtomicUsize::new(0),
            strict_parses: AtomicUsize::new(0),
            repaired_parses: AtomicUsize::new(0),
            lenient_parses: AtomicUsize::new(0),
            fallbacks_used: AtomicUsize::new(0),
            regenerations: AtomicUsize::new(0),
            total_call_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_call(&self, response: &AgentResponse) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_call_time_us
            .fetch_add(response.metadata.duration_us, Ordering::Relaxed);

        match response.metadata.failure {
            None => {
                self.successful_calls.fetch_add(1, Ordering::Relaxed);
            }
            Some(FailureKind::Upstream | FailureKind::EmptyResponse) => {
                self.upstream_failures.fetch_add(1, Ordering::Relaxed);
            }
            Some(FailureKind::Parse) => {
                self.parse_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        let counter = match response.metadata.strategy {
            Some(ParseStrategy::StrictJson) => &self.strict_parses,
            Some(ParseStrategy::RepairedJson) => &self.repaired_parses,
            Some(ParseStrategy::LenientLiteral) => &self.lenient_parses,
            None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks_used.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_regeneration(&self) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let total_us = self.total_call_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_calls,
            successful_calls: self.successful_calls.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            strict_parses: self.strict_parses.load(Ordering::Relaxed),
            repaired_parses: self.repaired_parses.load(Ordering::Relaxed),
            lenient_parses: self.lenient_parses.load(Ordering::Relaxed),
            fallbacks_used: self.fallbacks_used.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            avg_call_time_ms: if total_calls > 0 {
                total_us / total_calls as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_calls: usize,
    pub successful_calls: usize,
    pub upstream_failures: usize,
    pub parse_failures: usize,
    pub strict_parses: usize,
    pub repaired_parses: usize,
    pub lenient_parses: usize,
    pub fallbacks_used: usize,
    pub regenerations: usize,
    pub avg_call_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
