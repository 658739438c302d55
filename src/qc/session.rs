use std::{
    sync::mpsc::Receiver,
    thread::{self, JoinHandle},
};

use log::{error, info, warn};

use crate::{
    ephemeris::EphemerisGate,
    prelude::{Config, Error, ObservationEpoch},
    qc::{
        processor::EpochProcessor,
        report::{QcReport, QcReportAggregator, SessionInfo},
        summary::QcEpochRecord,
    },
};

/// [QcSession] analyzes one observation stream, from first to last epoch.
/// Each session owns its tracking states and summaries exclusively:
/// independent sessions may run in parallel.
#[derive(Debug, Clone)]
pub struct QcSession {
    processor: EpochProcessor,
    gate: EphemerisGate,
    aggregator: QcReportAggregator,
}

impl QcSession {
    /// Creates new [QcSession]. Satellites known to the [EphemerisGate]
    /// are expected to be observed during the whole session.
    pub fn new(cfg: Config, gate: EphemerisGate) -> Self {
        let mut aggregator = QcReportAggregator::new(cfg.sampling_interval);
        aggregator.expect(gate.satellites());

        info!(
            "qc session: interval={} ephemerides={} reference={}",
            cfg.sampling_interval,
            gate.len(),
            cfg.reference_position.is_some()
        );

        Self {
            gate,
            aggregator,
            processor: EpochProcessor::new(cfg),
        }
    }

    /// Copies and returns [QcSession] with [SessionInfo]
    pub fn with_info(&self, info: SessionInfo) -> Self {
        let mut s = self.clone();
        s.aggregator = s.aggregator.with_info(info);
        s
    }

    pub fn processor(&self) -> &EpochProcessor {
        &self.processor
    }

    pub fn aggregator(&self) -> &QcReportAggregator {
        &self.aggregator
    }

    /// Processes a new [ObservationEpoch]. Malformed epochs are
    /// logged and skipped: they never abort the session.
    pub fn push(&mut self, epoch: &ObservationEpoch) -> Result<&QcEpochRecord, Error> {
        if self.aggregator.is_finalized() {
            return Err(Error::ReportFinalized);
        }
        match self.processor.process_epoch(epoch, &self.gate) {
            Ok(record) => {
                self.aggregator.add(record)?;
                self.aggregator
                    .records()
                    .last()
                    .ok_or(Error::ReportFinalized)
            },
            Err(e) => {
                warn!("{} - epoch skipped: {}", epoch.epoch, e);
                self.aggregator.reject()?;
                Err(e)
            },
        }
    }

    /// Finalizes this session
    pub fn finalize(&mut self) -> &QcReport {
        self.aggregator.finalize()
    }

    /// Runs this session over a whole epoch stream and returns the [QcReport].
    pub fn run<I: IntoIterator<Item = ObservationEpoch>>(mut self, epochs: I) -> QcReport {
        for epoch in epochs {
            let _ = self.push(&epoch);
        }
        self.aggregator.into_report()
    }

    /// Moves this session to a dedicated worker thread, fed through
    /// a channel. The worker finalizes the report once all senders
    /// have been dropped.
    pub fn spawn(
        self,
        epochs: Receiver<ObservationEpoch>,
    ) -> std::io::Result<JoinHandle<QcReport>> {
        thread::Builder::new()
            .name("qc-session".to_string())
            .spawn(move || self.run(epochs))
    }

    /// Waits for a spawned session
    pub fn join(handle: JoinHandle<QcReport>) -> Result<QcReport, Error> {
        handle.join().map_err(|_| {
            error!("qc worker thread panicked");
            Error::WorkerPanic
        })
    }
}
