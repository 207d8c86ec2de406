// src/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Default)]
pub struct Metrics {
    pub records_total: AtomicU64,
    pub records_dropped: AtomicU64,
    pub lines_printed: AtomicU64,

    // coarse apply-latency counters, one per nanosecond band
    pub eng_lat_b0: AtomicU64,
    pub eng_lat_b1: AtomicU64,
    pub eng_lat_b2: AtomicU64,
    pub eng_lat_b3: AtomicU64,
    pub eng_lat_b4: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_total(&self) {
        self.records_total.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_printed(&self) {
        self.lines_printed.fetch_add(1, Ordering::Relaxed);
    }

    /// Tallies one engine apply into a latency band: under 200ns, 800ns,
    /// 3.2us, or 16us, with everything slower in the last counter.
    #[inline]
    pub fn record_engine(&self, dur: Duration) {
        let ns = dur.as_nanos() as u64;
        let band = match ns {
            0..=199 => &self.eng_lat_b0,
            200..=799 => &self.eng_lat_b1,
            800..=3_199 => &self.eng_lat_b2,
            3_200..=15_999 => &self.eng_lat_b3,
            _ => &self.eng_lat_b4,
        };
        band.fetch_add(1, Ordering::Relaxed);
    }

    pub fn log_summary(&self) {
        info!(
            records_total = self.records_total.load(Ordering::Relaxed),
            records_dropped = self.records_dropped.load(Ordering::Relaxed),
            lines_printed = self.lines_printed.load(Ordering::Relaxed),
            "stream complete"
        );
        debug!(
            lt_200ns = self.eng_lat_b0.load(Ordering::Relaxed),
            lt_800ns = self.eng_lat_b1.load(Ordering::Relaxed),
            lt_3200ns = self.eng_lat_b2.load(Ordering::Relaxed),
            lt_16us = self.eng_lat_b3.load(Ordering::Relaxed),
            ge_16us = self.eng_lat_b4.load(Ordering::Relaxed),
            "engine apply latency bands"
        );
    }
}
