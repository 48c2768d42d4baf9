//! Helpers for asserting on metrics recorded during a test.
//!
//! Taking a snapshot from a [`DebuggingRecorder`] resets its counters, so
//! tests capture one [`CounterSnapshot`] and query it as often as needed.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Creates a debugging recorder and the snapshotter that reads it.
#[must_use]
pub fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[derive(Debug)]
struct CounterEntry {
    name: String,
    labels: Vec<(String, String)>,
    value: u64,
}

/// Counter values captured from a single recorder snapshot.
#[derive(Debug, Default)]
pub struct CounterSnapshot {
    counters: Vec<CounterEntry>,
}

impl CounterSnapshot {
    /// Drain the recorder behind `snapshotter` into a reusable snapshot.
    #[must_use]
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let counters = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(value) => Some(CounterEntry {
                    name: key.key().name().to_owned(),
                    labels: key
                        .key()
                        .labels()
                        .map(|l| (l.key().to_owned(), l.value().to_owned()))
                        .collect(),
                    value,
                }),
                _ => None,
            })
            .collect();
        Self { counters }
    }

    /// Sum of the counters named `name`, optionally filtered by one label.
    #[must_use]
    pub fn counter(&self, name: &str, label: Option<(&str, &str)>) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.name == name)
            .filter(|entry| {
                label.is_none_or(|(label_key, label_value)| {
                    entry
                        .labels
                        .iter()
                        .any(|(k, v)| k == label_key && v == label_value)
                })
            })
            .map(|entry| entry.value)
            .sum()
    }
}

/// Read one counter from a fresh snapshot.
///
/// This drains the recorder; use [`CounterSnapshot`] to check several values.
#[must_use]
pub fn counter_value(snapshotter: &Snapshotter, name: &str, label: Option<(&str, &str)>) -> u64 {
    CounterSnapshot::take(snapshotter).counter(name, label)
}
