//! Station position relay
use std::{
    fmt::{Display, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration as StdDuration,
};

use log::{debug, error, info, warn, LevelFilter};

use crate::{
    prelude::Error,
    transport::{Attachment, Registry, Transport},
};

mod config;
mod directive;
mod heartbeat;
mod packet;
mod station;

pub use config::{AxisCorrections, ConfigError, LogDestination, Logos, RelayConfig};
pub use directive::{Directive, DirectiveReader, PARAMS_DIR_VAR};
pub use packet::{
    heartbeat_message, status_message, unix_start_time, TracePacket, MAX_TRACEBUF_SIZE,
    TRACE2_HEADER_SIZE,
};
pub use station::{Axis, StationPosition};

use heartbeat::Heartbeat;
use packet::unix_now;

/// Delay before each trace packet submission
const DEFAULT_PACING: StdDuration = StdDuration::from_millis(10);

/// Station code length
const STATION_LEN: usize = 4;

/// [PositionRelay] lifecycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Initial state
    #[default]
    Unconfigured,
    /// Complete and valid configuration
    ConfigLoaded,
    /// Attached to the ring
    Attached,
    /// Heartbeat running, ready to relay
    Connected,
    /// Detached
    Disconnected,
}

impl Display for RelayState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "Unconfigured"),
            Self::ConfigLoaded => write!(f, "ConfigLoaded"),
            Self::Attached => write!(f, "Attached"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// [PositionRelay] translates [StationPosition]s into trace packets
/// and submits them to the [Transport], under a periodic heartbeat.
/// The heartbeat and the relay calls share the transport handle:
/// one submission at a time.
pub struct PositionRelay<T: Transport> {
    state: RelayState,
    transport: Arc<Mutex<T>>,
    config: Option<RelayConfig>,
    attachment: Option<Arc<Attachment<T>>>,
    heartbeat: Option<Heartbeat>,
    pid: u32,
    pacing: StdDuration,
    delivery_errors: AtomicU64,
}

impl<T: Transport> std::fmt::Debug for PositionRelay<T> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("PositionRelay")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("pid", &self.pid)
            .field("delivery_errors", &self.delivery_errors())
            .finish()
    }
}

impl<T: Transport> PositionRelay<T> {
    /// Creates a new [PositionRelay] owning this [Transport]
    pub fn new(transport: T) -> Self {
        Self {
            state: RelayState::Unconfigured,
            transport: Arc::new(Mutex::new(transport)),
            config: None,
            attachment: None,
            heartbeat: None,
            pid: std::process::id(),
            pacing: DEFAULT_PACING,
            delivery_errors: AtomicU64::new(0),
        }
    }

    /// Copies and returns [PositionRelay] announcing this process id
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Copies and returns [PositionRelay] with this delay between trace packets
    pub fn with_pacing(mut self, pacing: StdDuration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn config(&self) -> Option<&RelayConfig> {
        self.config.as_ref()
    }

    /// Number of failed submissions since creation
    pub fn delivery_errors(&self) -> u64 {
        self.delivery_errors.load(Ordering::Relaxed)
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            state: self.state,
        }
    }

    /// Loads this configuration file, from the parameter directory
    /// designated by the environment.
    pub fn load_config(&mut self, file: &str, registry: &dyn Registry) -> Result<(), Error> {
        if !self.may_configure() {
            return Err(self.invalid_state("load_config"));
        }
        let reader = DirectiveReader::from_env()?;
        self.load_config_from(&reader, file, registry)
    }

    /// Loads this configuration file, using this [DirectiveReader]
    pub fn load_config_from(
        &mut self,
        reader: &DirectiveReader,
        file: &str,
        registry: &dyn Registry,
    ) -> Result<(), Error> {
        if !self.may_configure() {
            return Err(self.invalid_state("load_config"));
        }
        let directives = reader.read(file)?;
        self.configure(&directives, registry)
    }

    /// Applies these configuration [Directive]s. The relay stays
    /// in its current state unless the configuration is complete and valid.
    pub fn configure(
        &mut self,
        directives: &[Directive],
        registry: &dyn Registry,
    ) -> Result<(), Error> {
        if !self.may_configure() {
            return Err(self.invalid_state("load_config"));
        }

        match RelayConfig::from_directives(directives, registry) {
            Ok(cfg) => {
                info!(
                    "relay configured: module={} ring={} rate={}Hz network={}",
                    cfg.module_name, cfg.ring_name, cfg.sample_rate_hz, cfg.network
                );
                self.config = Some(cfg);
                self.state = RelayState::ConfigLoaded;
                Ok(())
            },
            Err(e) => {
                error!("{}", e);
                Err(e.into())
            },
        }
    }

    fn may_configure(&self) -> bool {
        matches!(
            self.state,
            RelayState::Unconfigured | RelayState::Disconnected
        )
    }

    /// Attaches to the configured ring
    pub fn attach(&mut self) -> Result<(), Error> {
        let ring_key = match (self.state, &self.config) {
            (RelayState::ConfigLoaded | RelayState::Disconnected, Some(cfg)) => cfg.ring_key,
            _ => return Err(self.invalid_state("attach")),
        };

        match Attachment::new(self.transport.clone(), ring_key) {
            Ok(attachment) => {
                info!("attached to ring {}", ring_key);
                self.attachment = Some(Arc::new(attachment));
                self.state = RelayState::Attached;
                Ok(())
            },
            Err(e) => {
                error!("failed to attach to ring {}: {}", ring_key, e);
                self.state = RelayState::ConfigLoaded;
                Err(e.into())
            },
        }
    }

    /// Starts the heartbeat. Does nothing when already connected.
    pub fn connect(&mut self) -> Result<(), Error> {
        match self.state {
            RelayState::Connected => return Ok(()),
            RelayState::Attached => {},
            _ => return Err(self.invalid_state("connect")),
        }

        let (attachment, cfg) = match (&self.attachment, &self.config) {
            (Some(attachment), Some(cfg)) => (attachment.clone(), cfg),
            _ => return Err(self.invalid_state("connect")),
        };

        let heartbeat = Heartbeat::start(
            attachment,
            cfg.logos.heartbeat,
            self.pid,
            cfg.heartbeat_period(),
        )
        .map_err(|e| {
            error!("failed to start heartbeat: {}", e);
            self.invalid_state("connect")
        })?;

        info!("connected: heartbeat every {}s", cfg.heartbeat_interval_s);
        self.heartbeat = Some(heartbeat);
        self.state = RelayState::Connected;
        Ok(())
    }

    /// Stops the heartbeat and detaches. Always succeeds.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        self.attachment = None;

        match self.state {
            RelayState::Attached | RelayState::Connected => {
                info!("disconnected");
                self.state = RelayState::Disconnected;
            },
            RelayState::Disconnected => {},
            RelayState::Unconfigured | RelayState::ConfigLoaded => {
                debug!("disconnect: never attached");
            },
        }
        Ok(())
    }

    /// Builds the three trace packets for this [StationPosition], in axis order.
    /// All packets are validated: none is produced on any failure.
    pub fn trace_packets(
        &self,
        position: &StationPosition,
    ) -> Result<Vec<(Axis, Vec<u8>)>, Error> {
        let cfg = self
            .config
            .as_ref()
            .ok_or_else(|| self.invalid_state("relay"))?;

        let station = position.station.chars().take(STATION_LEN).collect::<String>();
        let start_time = unix_start_time(position.epoch);

        Axis::ALL
            .iter()
            .map(|axis| {
                let value_mm = position.axis_value_m(*axis, &cfg.corrections) * 1000.0;
                let sample = to_sample(value_mm).ok_or(Error::SampleOverflow {
                    channel: axis.channel(),
                    value_mm,
                })?;

                let packet = TracePacket::constant(
                    &station,
                    &cfg.network,
                    axis.channel(),
                    start_time,
                    cfg.sample_rate_hz,
                    sample,
                )?;

                Ok((*axis, packet.encode()?))
            })
            .collect()
    }

    /// Relays this [StationPosition] as three trace packets.
    /// A transport failure aborts the remaining packets.
    pub fn relay(&self, position: &StationPosition) -> Result<(), Error> {
        if self.state != RelayState::Connected {
            return Err(self.invalid_state("relay"));
        }

        let (attachment, cfg) = match (&self.attachment, &self.config) {
            (Some(attachment), Some(cfg)) => (attachment, cfg),
            _ => return Err(self.invalid_state("relay")),
        };

        let verbosity = cfg.log_filter();

        if verbosity >= LevelFilter::Trace {
            info!(
                "{} ({}) - ecef={:?} neu={:?}",
                position.station, position.epoch, position.ecef_m, position.neu_m
            );
        }

        let packets = self.trace_packets(position).map_err(|e| {
            error!("{} ({}) - {}", position.station, position.epoch, e);
            e
        })?;

        for (axis, packet) in packets.iter() {
            thread::sleep(self.pacing);
            attachment.put(&cfg.logos.trace, packet).map_err(|e| {
                self.delivery_errors.fetch_add(1, Ordering::Relaxed);
                error!(
                    "{} ({}) - failed to submit {}: {}",
                    position.station,
                    position.epoch,
                    axis.channel(),
                    e
                );
                e
            })?;
        }

        if verbosity >= LevelFilter::Debug {
            debug!("{} ({}) - relayed", position.station, position.epoch);
        }
        Ok(())
    }

    /// Submits one status message
    pub fn report_status(&self, code: i16, message: Option<&str>) -> Result<(), Error> {
        let (attachment, cfg) = match (self.state, &self.attachment, &self.config) {
            (
                RelayState::Attached | RelayState::Connected,
                Some(attachment),
                Some(cfg),
            ) => (attachment, cfg),
            _ => return Err(self.invalid_state("report_status")),
        };

        let msg = status_message(unix_now(), code, message);
        attachment.put(&cfg.logos.status, &msg).map_err(|e| {
            self.delivery_errors.fetch_add(1, Ordering::Relaxed);
            warn!("failed to report status {}: {}", code, e);
            e.into()
        })
    }
}

/// Truncates toward zero, when this fits a 32-bit sample
fn to_sample(value_mm: f64) -> Option<i32> {
    let truncated = value_mm.trunc();
    if truncated.is_finite() && truncated >= i32::MIN as f64 && truncated <= i32::MAX as f64 {
        Some(truncated as i32)
    } else {
        None
    }
}
