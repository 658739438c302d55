use std::time::Duration as StdDuration;

use log::{debug, warn, LevelFilter};
use thiserror::Error;

use crate::{
    relay::{station::Axis, Directive},
    transport::{MessageLogo, Registry, TYPE_ERROR, TYPE_HEARTBEAT, TYPE_TRACEBUF2},
};

/// Directives that must all be present
pub const REQUIRED_DIRECTIVES: [&str; 6] = [
    "ModuleId",
    "RingName",
    "HeartbeatInt",
    "SampRate",
    "LogFile",
    "Network",
];

/// Longest network code a trace header can hold
const MAX_NETWORK_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("EW_PARAMS is not defined")]
    MissingParamsDir,
    #[error("EW_PARAMS is defined but empty")]
    EmptyParamsDir,
    #[error("parameter directory {0} does not exist")]
    ParamsDirNotFound(String),
    #[error("failed to open {file}: {reason}")]
    Open { file: String, reason: String },
    #[error("{0}: nested includes too deep")]
    IncludeDepth(String),
    #[error("@{0}: include without parameter directory")]
    UnresolvedInclude(String),
    #[error(
        "incomplete configuration: missing [{}] invalid [{}]",
        .missing.join(", "),
        .invalid.join("; ")
    )]
    Incomplete {
        /// Required directives never encountered
        missing: Vec<&'static str>,
        /// Directives that did not parse or resolve
        invalid: Vec<String>,
    },
}

/// Where the hosting process writes its log
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// No log file
    #[default]
    Disabled,
    /// Log file and standard error
    FileAndConsole,
    /// Log file only
    FileOnly,
}

impl LogDestination {
    fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Disabled),
            1 => Some(Self::FileAndConsole),
            2 => Some(Self::FileOnly),
            _ => None,
        }
    }
}

/// Per-axis zero levels. When defined for one axis, that axis carries
/// the topocentric offset minus the zero level, instead of the cartesian coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisCorrections {
    /// North zero level (m), replaces X
    pub x: Option<f64>,
    /// East zero level (m), replaces Y
    pub y: Option<f64>,
    /// Up zero level (m), replaces Z
    pub z: Option<f64>,
}

impl AxisCorrections {
    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    fn set(&mut self, axis: Axis, zero_level_m: f64) {
        match axis {
            Axis::X => self.x = Some(zero_level_m),
            Axis::Y => self.y = Some(zero_level_m),
            Axis::Z => self.z = Some(zero_level_m),
        }
    }
}

/// Logos of the three message classes this relay produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logos {
    pub trace: MessageLogo,
    pub heartbeat: MessageLogo,
    pub status: MessageLogo,
}

/// [RelayConfig] is validated once, then immutable for the
/// lifetime of the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Module name, as registered
    pub module_name: String,
    /// Module id
    pub module_id: u8,
    /// Ring name, as registered
    pub ring_name: String,
    /// Ring key
    pub ring_key: i64,
    /// Heartbeat period in seconds
    pub heartbeat_interval_s: u64,
    /// Nominal sample rate (Hz), also the number of samples per packet
    pub sample_rate_hz: u32,
    /// Log destination
    pub log_destination: LogDestination,
    /// Network code
    pub network: String,
    /// Verbosity (0-2)
    pub debug: u8,
    /// Per axis corrections
    pub corrections: AxisCorrections,
    /// Velocity mode
    pub inject_velocity: bool,
    /// Resolved message logos
    pub logos: Logos,
}

impl RelayConfig {
    /// Heartbeat period
    pub fn heartbeat_period(&self) -> StdDuration {
        StdDuration::from_secs(self.heartbeat_interval_s)
    }

    /// Relay local verbosity, from the `LogFile` and `Debug` levels.
    /// Errors always go through.
    pub fn log_filter(&self) -> LevelFilter {
        match (self.log_destination, self.debug) {
            (LogDestination::Disabled, _) => LevelFilter::Error,
            (_, 0) => LevelFilter::Info,
            (_, 1) => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Builds [RelayConfig] from these directives. Every missing and every
    /// invalid directive is reported at once.
    pub fn from_directives(
        directives: &[Directive],
        registry: &dyn Registry,
    ) -> Result<Self, ConfigError> {
        let mut seen = [false; REQUIRED_DIRECTIVES.len()];
        let mut invalid = Vec::<String>::new();

        let mut module = None::<(String, u8)>;
        let mut ring = None::<(String, i64)>;
        let mut heartbeat_interval_s = 0;
        let mut sample_rate_hz = 0;
        let mut log_destination = LogDestination::default();
        let mut network = String::new();
        let mut debug_level = 0;
        let mut corrections = AxisCorrections::default();
        let mut inject_velocity = false;

        for directive in directives {
            let key = directive.key.as_str();

            if let Some(index) = REQUIRED_DIRECTIVES.iter().position(|req| *req == key) {
                seen[index] = true;
            }

            if key != "InjectVel" && directive.args.is_empty() {
                invalid.push(format!("{}: missing value", directive));
                continue;
            }

            let value = directive.arg(0).unwrap_or_default();

            match key {
                "ModuleId" => match registry.module_id(value) {
                    Some(id) => module = Some((value.to_string(), id)),
                    None => {
                        invalid.push(format!("{}: module {} is not registered", directive, value))
                    },
                },
                "RingName" => match registry.ring_key(value) {
                    Some(k) => ring = Some((value.to_string(), k)),
                    None => {
                        invalid.push(format!("{}: ring {} is not registered", directive, value))
                    },
                },
                "HeartbeatInt" => match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => heartbeat_interval_s = secs,
                    _ => invalid.push(format!("{}: invalid interval \"{}\"", directive, value)),
                },
                "SampRate" => match value.parse::<u32>() {
                    Ok(rate) if rate > 0 => sample_rate_hz = rate,
                    _ => {
                        invalid.push(format!("{}: invalid sample rate \"{}\"", directive, value))
                    },
                },
                "LogFile" => match value.parse::<u8>().ok().and_then(LogDestination::from_level) {
                    Some(dest) => log_destination = dest,
                    None => {
                        invalid.push(format!("{}: invalid log level \"{}\"", directive, value))
                    },
                },
                "Network" => {
                    if value.len() > MAX_NETWORK_LEN {
                        warn!(
                            "{}: network code truncated to {} characters",
                            directive, MAX_NETWORK_LEN
                        );
                    }
                    network = value.to_string();
                },
                "Debug" => match value.parse::<u8>() {
                    Ok(level) if level <= 2 => debug_level = level,
                    _ => {
                        invalid.push(format!("{}: invalid debug level \"{}\"", directive, value))
                    },
                },
                "SubX" | "SubY" | "SubZ" => {
                    let axis = match key {
                        "SubX" => Axis::X,
                        "SubY" => Axis::Y,
                        _ => Axis::Z,
                    };
                    match value.parse::<f64>() {
                        Ok(zero) if zero.is_finite() => corrections.set(axis, zero),
                        _ => invalid.push(format!(
                            "{}: invalid zero level \"{}\"",
                            directive, value
                        )),
                    }
                },
                "InjectVel" => inject_velocity = true,
                _ => invalid.push(format!("{}: unknown directive", directive)),
            }
        }

        let missing = REQUIRED_DIRECTIVES
            .iter()
            .zip(seen.iter())
            .filter_map(|(name, seen)| if *seen { None } else { Some(*name) })
            .collect::<Vec<_>>();

        let installation = registry.local_installation();
        if installation.is_none() {
            invalid.push("local installation is not registered".to_string());
        }

        let mut message_type = |name: &str| match registry.message_type(name) {
            Some(id) => id,
            None => {
                invalid.push(format!("message type {} is not registered", name));
                0
            },
        };

        let trace_type = message_type(TYPE_TRACEBUF2);
        let heartbeat_type = message_type(TYPE_HEARTBEAT);
        let status_type = message_type(TYPE_ERROR);

        match (module, ring, installation) {
            (Some((module_name, module_id)), Some((ring_name, ring_key)), Some(installation))
                if missing.is_empty() && invalid.is_empty() =>
            {
                let logo = |msg_type| MessageLogo {
                    msg_type,
                    module: module_id,
                    installation,
                };

                let cfg = Self {
                    module_name,
                    module_id,
                    ring_name,
                    ring_key,
                    heartbeat_interval_s,
                    sample_rate_hz,
                    log_destination,
                    network,
                    debug: debug_level,
                    corrections,
                    inject_velocity,
                    logos: Logos {
                        trace: logo(trace_type),
                        heartbeat: logo(heartbeat_type),
                        status: logo(status_type),
                    },
                };

                debug!("{:?}", cfg);
                Ok(cfg)
            },
            _ => Err(ConfigError::Incomplete { missing, invalid }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{AxisCorrections, ConfigError, LogDestination, RelayConfig};
    use crate::{
        relay::DirectiveReader,
        transport::{Registry, StaticRegistry},
    };
    use log::LevelFilter;
    use rstest::rstest;

    fn registry() -> StaticRegistry {
        StaticRegistry::with_standard_types()
            .with_module("MOD_GNSS", 151)
            .with_ring("WAVE_RING", 1000)
            .with_local_installation(13)
    }

    const COMPLETE: &str = "ModuleId MOD_GNSS
RingName WAVE_RING
HeartbeatInt 30
SampRate 1
LogFile 1
Network GP
";

    #[test]
    fn complete_configuration() {
        let directives = DirectiveReader::parse_str(COMPLETE, "relay.d").unwrap();
        let cfg = RelayConfig::from_directives(&directives, &registry()).unwrap();

        assert_eq!(cfg.module_id, 151);
        assert_eq!(cfg.ring_key, 1000);
        assert_eq!(cfg.heartbeat_interval_s, 30);
        assert_eq!(cfg.sample_rate_hz, 1);
        assert_eq!(cfg.log_destination, LogDestination::FileAndConsole);
        assert_eq!(cfg.network, "GP");
        assert_eq!(cfg.debug, 0);
        assert_eq!(cfg.corrections, AxisCorrections::default());
        assert!(!cfg.inject_velocity);

        assert_eq!(cfg.logos.trace.msg_type, 19);
        assert_eq!(cfg.logos.heartbeat.msg_type, 3);
        assert_eq!(cfg.logos.status.msg_type, 2);
        assert_eq!(cfg.logos.trace.module, 151);
        assert_eq!(cfg.logos.trace.installation, 13);
    }

    #[test]
    fn optional_directives() {
        let text = format!("{}Debug 2\nSubZ 0.25\nSubX -1.5\nInjectVel\n", COMPLETE);
        let directives = DirectiveReader::parse_str(&text, "relay.d").unwrap();
        let cfg = RelayConfig::from_directives(&directives, &registry()).unwrap();

        assert_eq!(cfg.debug, 2);
        assert_eq!(cfg.corrections.x, Some(-1.5));
        assert_eq!(cfg.corrections.y, None);
        assert_eq!(cfg.corrections.z, Some(0.25));
        assert!(cfg.inject_velocity);
        assert_eq!(cfg.log_filter(), LevelFilter::Trace);
    }

    #[rstest]
    #[case("LogFile 0\nDebug 2\n", LevelFilter::Error)]
    #[case("LogFile 1\n", LevelFilter::Info)]
    #[case("LogFile 2\nDebug 1\n", LevelFilter::Debug)]
    fn verbosity(#[case] levels: &str, #[case] expected: LevelFilter) {
        let text = format!("{}{}", COMPLETE.replace("LogFile 1\n", ""), levels);
        let directives = DirectiveReader::parse_str(&text, "relay.d").unwrap();
        let cfg = RelayConfig::from_directives(&directives, &registry()).unwrap();
        assert_eq!(cfg.log_filter(), expected);
    }

    #[test]
    fn every_defect_reported() {
        let directives = DirectiveReader::parse_str(
            "ModuleId MOD_UNKNOWN
RingName WAVE_RING
SampRate fast
LogFile 7
Network GP
Colour blue
",
            "relay.d",
        )
        .unwrap();

        match RelayConfig::from_directives(&directives, &registry()) {
            Err(ConfigError::Incomplete { missing, invalid }) => {
                assert_eq!(missing, vec!["HeartbeatInt"]);
                assert_eq!(invalid.len(), 4, "{:?}", invalid);
                assert!(invalid[0].contains("MOD_UNKNOWN"));
                assert!(invalid[3].contains("Colour"));
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unregistered_message_types() {
        let registry = StaticRegistry::new()
            .with_module("MOD_GNSS", 151)
            .with_ring("WAVE_RING", 1000)
            .with_local_installation(13);

        assert_eq!(registry.message_type("TYPE_TRACEBUF2"), None);

        let directives = DirectiveReader::parse_str(COMPLETE, "relay.d").unwrap();
        match RelayConfig::from_directives(&directives, &registry) {
            Err(ConfigError::Incomplete { missing, invalid }) => {
                assert!(missing.is_empty());
                assert_eq!(invalid.len(), 3);
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
