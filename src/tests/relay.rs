use crate::{
    prelude::{
        Epoch, Error, MemoryRing, PositionRelay, Registry, RelayState, StaticRegistry,
        StationPosition,
    },
    relay::{ConfigError, DirectiveReader, TracePacket, PARAMS_DIR_VAR},
    tests::init_logger,
    transport::{TransportError, TYPE_ERROR},
};

use std::{fs, thread, time::Duration};

const TRACEBUF2: u8 = 19;
const HEARTBEAT: u8 = 3;

fn registry() -> StaticRegistry {
    StaticRegistry::with_standard_types()
        .with_module("MOD_GNSS", 151)
        .with_ring("WAVE_RING", 1000)
        .with_local_installation(13)
}

fn relay_d(sample_rate: u32, extra: &str) -> String {
    format!(
        "# gnss relay
ModuleId     MOD_GNSS
RingName     WAVE_RING
HeartbeatInt 30
SampRate     {}
LogFile      1
Network      GP
{}",
        sample_rate, extra
    )
}

fn configured(ring: &MemoryRing, text: &str) -> PositionRelay<MemoryRing> {
    let directives = DirectiveReader::parse_str(text, "relay.d").unwrap();
    let mut relay = PositionRelay::new(ring.clone())
        .with_pid(4242)
        .with_pacing(Duration::from_millis(1));
    relay.configure(&directives, &registry()).unwrap();
    relay
}

fn connected(ring: &MemoryRing, text: &str) -> PositionRelay<MemoryRing> {
    let mut relay = configured(ring, text);
    relay.attach().unwrap();
    relay.connect().unwrap();
    assert_eq!(relay.state(), RelayState::Connected);
    relay
}

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc(2020, 6, 25, 12, 30, 15, 123_456_789)
}

/// Station on the surface, slightly moved from its zero levels
fn surface_position() -> StationPosition {
    StationPosition::from_vector(
        "WTZR00DEU",
        epoch(),
        &[4075580.3785, 931853.9877, 4801568.2174, 0.1234, -0.0456, 1.0009],
    )
    .unwrap()
}

fn trace_packets(ring: &MemoryRing) -> Vec<TracePacket> {
    ring.messages_of_type(TRACEBUF2)
        .iter()
        .map(|bytes| TracePacket::decode(bytes).unwrap())
        .collect()
}

#[test]
fn missing_fields_reported() {
    init_logger();

    let directives = DirectiveReader::parse_str(
        "ModuleId MOD_GNSS
RingName WAVE_RING
SampRate 1
LogFile 0
",
        "relay.d",
    )
    .unwrap();

    let mut relay = PositionRelay::new(MemoryRing::new());

    match relay.configure(&directives, &registry()) {
        Err(Error::Config(ConfigError::Incomplete { missing, invalid })) => {
            assert_eq!(missing, vec!["HeartbeatInt", "Network"]);
            assert!(invalid.is_empty(), "{:?}", invalid);
        },
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(relay.state(), RelayState::Unconfigured);
    assert!(relay.config().is_none());
}

#[test]
fn unknown_directive_refused() {
    init_logger();

    let directives = DirectiveReader::parse_str(&relay_d(1, "MaxLatency 10\n"), "relay.d").unwrap();
    let mut relay = PositionRelay::new(MemoryRing::new());

    match relay.configure(&directives, &registry()) {
        Err(Error::Config(ConfigError::Incomplete { missing, invalid })) => {
            assert!(missing.is_empty());
            assert_eq!(invalid.len(), 1);
            assert!(invalid[0].contains("MaxLatency"));
        },
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(relay.state(), RelayState::Unconfigured);
}

#[test]
fn configuration_files() {
    init_logger();

    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("relay.d"),
        "ModuleId MOD_GNSS
@ring.d
SampRate 1
LogFile 2
Network GP
Debug 1
",
    )
    .unwrap();
    fs::write(dir.path().join("ring.d"), "RingName WAVE_RING\nHeartbeatInt 15\n").unwrap();

    // the parameter directory is designated by the environment
    std::env::remove_var(PARAMS_DIR_VAR);
    let mut relay = PositionRelay::new(MemoryRing::new());
    assert!(matches!(
        relay.load_config("relay.d", &registry()),
        Err(Error::Config(ConfigError::MissingParamsDir))
    ));

    std::env::set_var(PARAMS_DIR_VAR, "");
    assert!(matches!(
        relay.load_config("relay.d", &registry()),
        Err(Error::Config(ConfigError::EmptyParamsDir))
    ));

    std::env::set_var(PARAMS_DIR_VAR, dir.path());
    relay.load_config("relay.d", &registry()).unwrap();
    std::env::remove_var(PARAMS_DIR_VAR);

    assert_eq!(relay.state(), RelayState::ConfigLoaded);

    let cfg = relay.config().unwrap();
    assert_eq!(cfg.ring_name, "WAVE_RING");
    assert_eq!(cfg.heartbeat_interval_s, 15);
    assert_eq!(cfg.debug, 1);

    // explicit directory
    let reader = DirectiveReader::new(dir.path());
    let mut other = PositionRelay::new(MemoryRing::new());
    other.load_config_from(&reader, "relay.d", &registry()).unwrap();
    assert_eq!(other.config(), relay.config());
}

#[test]
fn three_packets_per_position() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(5, "SubX 0.0\nSubY 0.0\nSubZ 1.0\n"));

    let position = surface_position();
    relay.relay(&position).unwrap();

    let packets = trace_packets(&ring);
    assert_eq!(packets.len(), 3);

    let expected_mm = [123.4, -45.6, 0.9];

    for (packet, (channel, expected)) in packets
        .iter()
        .zip(["GPX", "GPY", "GPZ"].iter().zip(expected_mm.iter()))
    {
        assert_eq!(packet.channel, *channel);
        assert_eq!(packet.station, "WTZR");
        assert_eq!(packet.network, "GP");
        assert_eq!(packet.location, "--");
        assert_eq!(packet.sample_rate, 5.0);
        assert_eq!(packet.samples.len(), 5);

        assert!((packet.start_time - 1593088215.123).abs() < 1.0E-6);
        assert!((packet.end_time - packet.start_time - 0.8).abs() < 1.0E-9);

        for sample in packet.samples.iter() {
            assert!(
                (*sample as f64 - expected).abs() <= 1.0,
                "{}: {} != {}",
                channel,
                sample,
                expected
            );
        }
    }

    let logos = relay.config().unwrap().logos;
    for (logo, _) in ring.messages() {
        assert_eq!(logo, logos.trace);
    }
}

#[test]
fn cartesian_axes() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(1, ""));

    let position = StationPosition::from_vector(
        "ABMF",
        epoch(),
        &[1234.5678, -2000.0004, 999_999.9999, 0.0, 0.0, 0.0],
    )
    .unwrap();

    relay.relay(&position).unwrap();

    let samples = trace_packets(&ring)
        .iter()
        .map(|packet| packet.samples[0])
        .collect::<Vec<_>>();

    // truncated toward zero
    assert_eq!(samples, vec![1234567, -2000000, 999_999_999]);
}

#[test]
fn earth_centered_millimeters_overflow() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(1, ""));

    match relay.relay(&surface_position()) {
        Err(Error::SampleOverflow { channel, .. }) => assert_eq!(channel, "GPX"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(ring.messages().is_empty());
}

#[test]
fn oversized_packets_never_sent() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(2000, "SubX 0\nSubY 0\nSubZ 0\n"));

    match relay.relay(&surface_position()) {
        Err(Error::PacketTooLarge { size, max }) => {
            assert_eq!(size, 64 + 2000 * 4);
            assert_eq!(max, 4096);
        },
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(ring.messages().is_empty());
    assert_eq!(relay.state(), RelayState::Connected);
}

#[test]
fn extreme_sample_rate_fails_the_call() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(1_000_000_000, "SubX 0\nSubY 0\nSubZ 0\n"));

    match relay.trace_packets(&surface_position()) {
        Err(Error::PacketTooLarge { size, max }) => {
            assert_eq!(size, 64 + 4_000_000_000);
            assert_eq!(max, 4096);
        },
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(relay.relay(&surface_position()).is_err());
    assert!(ring.messages_of_type(TRACEBUF2).is_empty());
    assert_eq!(relay.state(), RelayState::Connected);
}

#[test]
fn transport_failure_aborts_sequence() {
    init_logger();

    let ring = MemoryRing::new();
    let relay = connected(&ring, &relay_d(1, "SubX 0\nSubY 0\nSubZ 0\n"));

    ring.fail_puts_after(1);

    match relay.relay(&surface_position()) {
        Err(Error::Transport(TransportError::Rejected(_))) => {},
        other => panic!("unexpected result: {:?}", other),
    }

    let packets = trace_packets(&ring);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].channel, "GPX");
    assert_eq!(relay.delivery_errors(), 1);

    // the relay remains usable, retry is up to the caller
    assert_eq!(relay.state(), RelayState::Connected);
    ring.fail_puts_after(usize::MAX);
    relay.relay(&surface_position()).unwrap();
    assert_eq!(trace_packets(&ring).len(), 4);
}

#[test]
fn operations_gated_by_state() {
    init_logger();

    let ring = MemoryRing::new();
    let mut relay = PositionRelay::new(ring.clone());

    assert!(matches!(
        relay.attach(),
        Err(Error::InvalidState {
            operation: "attach",
            state: RelayState::Unconfigured
        })
    ));
    assert!(matches!(relay.connect(), Err(Error::InvalidState { .. })));
    assert!(matches!(
        relay.relay(&surface_position()),
        Err(Error::InvalidState { .. })
    ));

    let directives =
        DirectiveReader::parse_str(&relay_d(1, "SubX 0\nSubY 0\nSubZ 0\n"), "relay.d").unwrap();
    relay.configure(&directives, &registry()).unwrap();

    // configuration is immutable while it is in use
    relay.attach().unwrap();
    assert!(matches!(
        relay.configure(&directives, &registry()),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(
        relay.relay(&surface_position()),
        Err(Error::InvalidState {
            operation: "relay",
            state: RelayState::Attached
        })
    ));

    relay.connect().unwrap();
    relay.connect().unwrap();
    assert_eq!(relay.state(), RelayState::Connected);
    relay.relay(&surface_position()).unwrap();

    relay.disconnect().unwrap();
    assert!(matches!(
        relay.relay(&surface_position()),
        Err(Error::InvalidState { .. })
    ));
    assert_eq!(trace_packets(&ring).len(), 3);
}

#[test]
fn repeated_disconnects() {
    init_logger();

    let mut idle = PositionRelay::new(MemoryRing::new());
    assert!(idle.disconnect().is_ok());
    assert_eq!(idle.state(), RelayState::Unconfigured);

    let ring = MemoryRing::new();
    let mut relay = connected(&ring, &relay_d(1, ""));
    assert_eq!(ring.attached(), Some(1000));

    relay.disconnect().unwrap();
    assert_eq!(relay.state(), RelayState::Disconnected);
    assert_eq!(ring.attached(), None);

    relay.disconnect().unwrap();
    assert_eq!(relay.state(), RelayState::Disconnected);

    // reattaching reuses the loaded configuration
    relay.attach().unwrap();
    relay.connect().unwrap();
    assert_eq!(ring.attached(), Some(1000));

    drop(relay);
    assert_eq!(ring.attached(), None);
}

#[test]
fn attach_failure_keeps_configuration() {
    init_logger();

    let ring = MemoryRing::new().refusing_attach();
    let mut relay = configured(&ring, &relay_d(1, ""));

    assert!(matches!(
        relay.attach(),
        Err(Error::Transport(TransportError::Attach(1000)))
    ));
    assert_eq!(relay.state(), RelayState::ConfigLoaded);
    assert!(relay.config().is_some());
}

#[test]
fn heartbeats_while_connected() {
    init_logger();

    let ring = MemoryRing::new();
    let text = relay_d(1, "").replace("HeartbeatInt 30", "HeartbeatInt 1");
    let mut relay = connected(&ring, &text);

    thread::sleep(Duration::from_millis(2300));
    relay.disconnect().unwrap();

    let beats = ring.messages_of_type(HEARTBEAT);
    assert!(beats.len() >= 1 && beats.len() <= 3, "{} heartbeats", beats.len());

    for beat in beats.iter() {
        let text = String::from_utf8(beat.clone()).unwrap();
        let mut fields = text.trim_end().split(' ');
        assert!(fields.next().unwrap().parse::<u64>().is_ok());
        assert_eq!(fields.next(), Some("4242"));
        assert!(text.ends_with('\n'));
    }

    let count = ring.messages().len();
    thread::sleep(Duration::from_millis(1200));
    assert_eq!(ring.messages().len(), count, "heartbeat still running");
}

#[test]
fn status_reports() {
    init_logger();

    let ring = MemoryRing::new();
    let mut relay = configured(&ring, &relay_d(1, ""));

    assert!(relay.report_status(7, Some("ring overflow")).is_err());

    relay.attach().unwrap();
    relay.report_status(7, Some("ring overflow")).unwrap();
    relay.report_status(3, None).unwrap();

    let status_type = registry().message_type(TYPE_ERROR).unwrap();
    let reports = ring.messages_of_type(status_type);
    assert_eq!(reports.len(), 2);

    let first = String::from_utf8(reports[0].clone()).unwrap();
    assert!(first.ends_with(" 7 ring overflow\n"), "{}", first);

    let second = String::from_utf8(reports[1].clone()).unwrap();
    assert!(second.ends_with(" 3\n"), "{}", second);
}
