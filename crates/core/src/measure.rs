//! This module provide the `Measure` trait and its overlay-wide
//! implementation. It is used to count routing behaviour, since routing
//! failures are local and never raised as errors.
#![warn(missing_docs)]
use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

const COUNTERS: usize = 8;

/// The tag of counters in measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeasureCounter {
    /// The number of application messages sent.
    Sent,
    /// The number of application messages delivered.
    Delivered,
    /// Sum of hop counts of delivered application messages.
    Hops,
    /// The number of messages that found no route.
    NoRoute,
    /// The number of backtracks out of dead ends.
    DeadEnd,
    /// The number of messages dropped on the hop ceiling.
    HopLimit,
    /// The number of rejected identity collisions.
    Collision,
    /// The number of messages dropped by unavailable nodes.
    Dropped,
}

impl MeasureCounter {
    /// All counters, in declaration order.
    pub const ALL: [MeasureCounter; COUNTERS] = [
        MeasureCounter::Sent,
        MeasureCounter::Delivered,
        MeasureCounter::Hops,
        MeasureCounter::NoRoute,
        MeasureCounter::DeadEnd,
        MeasureCounter::HopLimit,
        MeasureCounter::Collision,
        MeasureCounter::Dropped,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Snake case name of the counter.
    pub fn name(self) -> &'static str {
        match self {
            MeasureCounter::Sent => "sent",
            MeasureCounter::Delivered => "delivered",
            MeasureCounter::Hops => "hops",
            MeasureCounter::NoRoute => "no_route",
            MeasureCounter::DeadEnd => "dead_end",
            MeasureCounter::HopLimit => "hop_limit",
            MeasureCounter::Collision => "collision",
            MeasureCounter::Dropped => "dropped",
        }
    }
}

/// `Measure` counts overlay behaviour.
/// The method [Measure::incr] should be called in the proper places.
pub trait Measure {
    /// `add` increases the counter by `n`.
    fn add(&self, counter: MeasureCounter, n: u64);
    /// `get_count` returns the counter.
    fn get_count(&self, counter: MeasureCounter) -> u64;
    /// `incr` increments the counter.
    fn incr(&self, counter: MeasureCounter) {
        self.add(counter, 1)
    }
}

/// Lock free [Measure] shared by every node of one overlay.
#[derive(Debug, Default)]
pub struct OverlayMeasure {
    counters: [AtomicU64; COUNTERS],
}

impl OverlayMeasure {
    /// Create a zeroed measure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Average hop count of delivered application messages.
    pub fn average_hops(&self) -> Option<f64> {
        let delivered = self.get_count(MeasureCounter::Delivered);
        if delivered == 0 {
            return None;
        }
        Some(self.get_count(MeasureCounter::Hops) as f64 / delivered as f64)
    }

    /// Every counter by name.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        MeasureCounter::ALL
            .iter()
            .map(|c| (c.name().to_string(), self.get_count(*c)))
            .collect()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for c in self.counters.iter() {
            c.store(0, Ordering::SeqCst);
        }
    }
}

impl Measure for OverlayMeasure {
    fn add(&self, counter: MeasureCounter, n: u64) {
        self.counters[counter.index()].fetch_add(n, Ordering::SeqCst);
    }

    fn get_count(&self, counter: MeasureCounter) -> u64 {
        self.counters[counter.index()].load(Ordering::SeqCst)
    }
}
