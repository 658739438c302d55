use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Default)]
struct Counts {
    total: u64,
    stations: HashMap<String, u64>,
}

/// [ByteActivityCounter] accumulates the volume received on each
/// inbound stream. Shared between all stream readers and the status display.
#[derive(Debug, Default)]
pub struct ByteActivityCounter {
    counts: Mutex<Counts>,
}

impl ByteActivityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accounts for these bytes, received from this station
    pub fn add(&self, station: &str, bytes: u64) {
        let mut counts = self.counts();
        counts.total = counts.total.saturating_add(bytes);
        let entry = counts.stations.entry(station.to_string()).or_default();
        *entry = entry.saturating_add(bytes);
    }

    /// Total bytes received since creation or last reset
    pub fn read(&self) -> u64 {
        self.counts().total
    }

    /// Bytes received from this station
    pub fn station(&self, station: &str) -> u64 {
        self.counts().stations.get(station).copied().unwrap_or_default()
    }

    /// Per station totals, sorted by station
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut snapshot = self
            .counts()
            .stations
            .iter()
            .map(|(station, bytes)| (station.clone(), *bytes))
            .collect::<Vec<_>>();
        snapshot.sort();
        snapshot
    }

    /// Returns the total and clears all counters
    pub fn reset(&self) -> u64 {
        let mut counts = self.counts();
        counts.stations.clear();
        std::mem::take(&mut counts.total)
    }
}

#[cfg(test)]
mod test {
    use super::ByteActivityCounter;
    use std::{sync::Arc, thread};

    #[test]
    fn per_station_totals() {
        let counter = ByteActivityCounter::new();
        counter.add("WTZR", 100);
        counter.add("BRUX", 10);
        counter.add("WTZR", 50);

        assert_eq!(counter.read(), 160);
        assert_eq!(counter.station("WTZR"), 150);
        assert_eq!(counter.station("ZIM2"), 0);
        assert_eq!(
            counter.snapshot(),
            vec![("BRUX".to_string(), 10), ("WTZR".to_string(), 150)]
        );

        assert_eq!(counter.reset(), 160);
        assert_eq!(counter.read(), 0);
        assert!(counter.snapshot().is_empty());
    }

    #[test]
    fn concurrent_readers() {
        let counter = Arc::new(ByteActivityCounter::new());

        let handles = (0..8)
            .map(|i| {
                let counter = counter.clone();
                thread::spawn(move || {
                    let station = format!("ST{:02}", i % 4);
                    for _ in 0..1000 {
                        counter.add(&station, 3);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.read(), 8 * 1000 * 3);
        for (_, bytes) in counter.snapshot() {
            assert_eq!(bytes, 2 * 1000 * 3);
        }
    }
}
