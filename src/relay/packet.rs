//! TRACEBUF2 wire format and text messages
use crate::prelude::{Epoch, Error};

/// Trace header size, in bytes
pub const TRACE2_HEADER_SIZE: usize = 64;

/// Largest trace packet the transport accepts, in bytes
pub const MAX_TRACEBUF_SIZE: usize = 4096;

/// Largest text message, in bytes
pub const MAX_MESSAGE_SIZE: usize = 256;

const STA_LEN: usize = 7;
const NET_LEN: usize = 9;
const CHAN_LEN: usize = 4;
const LOC_LEN: usize = 3;

const VERSION: &[u8; 2] = b"20";
const DATATYPE: &str = "i4";

/// Location code placeholder
pub const NO_LOCATION: &str = "--";

/// [TracePacket] is one TRACEBUF2 message: fixed header
/// followed by 32-bit little endian samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePacket {
    /// Pin number
    pub pinno: i32,
    /// First sample time, seconds since 1970 (UTC)
    pub start_time: f64,
    /// Last sample time, seconds since 1970 (UTC)
    pub end_time: f64,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Station code
    pub station: String,
    /// Network code
    pub network: String,
    /// Channel tag
    pub channel: String,
    /// Location code
    pub location: String,
    /// Data quality flags
    pub quality: [u8; 2],
    /// Payload
    pub samples: Vec<i32>,
}

impl TracePacket {
    /// Builds a [TracePacket] replicating this value over one second of samples.
    /// Fails when the packet would exceed [MAX_TRACEBUF_SIZE]: nothing is allocated then.
    pub fn constant(
        station: &str,
        network: &str,
        channel: &str,
        start_time: f64,
        sample_rate_hz: u32,
        value: i32,
    ) -> Result<Self, Error> {
        let sample_rate = sample_rate_hz as f64;
        let nsamp = sample_rate_hz as usize;

        let size = nsamp
            .checked_mul(4)
            .and_then(|payload| payload.checked_add(TRACE2_HEADER_SIZE))
            .unwrap_or(usize::MAX);

        if size > MAX_TRACEBUF_SIZE {
            return Err(Error::PacketTooLarge {
                size,
                max: MAX_TRACEBUF_SIZE,
            });
        }

        Ok(Self {
            pinno: 0,
            start_time,
            end_time: start_time + (nsamp.saturating_sub(1)) as f64 / sample_rate,
            sample_rate,
            station: station.to_string(),
            network: network.to_string(),
            channel: channel.to_string(),
            location: NO_LOCATION.to_string(),
            quality: [0, 0],
            samples: vec![value; nsamp],
        })
    }

    /// Encoded size, in bytes
    pub fn size(&self) -> usize {
        TRACE2_HEADER_SIZE + self.samples.len() * 4
    }

    /// Encodes this [TracePacket]. Fails when it exceeds [MAX_TRACEBUF_SIZE].
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let size = self.size();
        if size > MAX_TRACEBUF_SIZE {
            return Err(Error::PacketTooLarge {
                size,
                max: MAX_TRACEBUF_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&self.pinno.to_le_bytes());
        buf.extend_from_slice(&(self.samples.len() as i32).to_le_bytes());
        buf.extend_from_slice(&self.start_time.to_le_bytes());
        buf.extend_from_slice(&self.end_time.to_le_bytes());
        buf.extend_from_slice(&self.sample_rate.to_le_bytes());
        put_field(&mut buf, &self.station, STA_LEN);
        put_field(&mut buf, &self.network, NET_LEN);
        put_field(&mut buf, &self.channel, CHAN_LEN);
        put_field(&mut buf, &self.location, LOC_LEN);
        buf.extend_from_slice(VERSION);
        put_field(&mut buf, DATATYPE, 3);
        buf.extend_from_slice(&self.quality);
        buf.extend_from_slice(&[0, 0]);

        for sample in self.samples.iter() {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(buf)
    }

    /// Decodes a [TracePacket]
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < TRACE2_HEADER_SIZE {
            return Err(Error::MalformedPacket("truncated header"));
        }

        let i32_at = |offset: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[offset..offset + 4]);
            i32::from_le_bytes(word)
        };

        let f64_at = |offset: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[offset..offset + 8]);
            f64::from_le_bytes(word)
        };

        if &bytes[55..57] != VERSION {
            return Err(Error::MalformedPacket("unknown header version"));
        }

        if get_field(&bytes[57..60]) != DATATYPE {
            return Err(Error::MalformedPacket("unsupported data type"));
        }

        let nsamp = usize::try_from(i32_at(4))
            .map_err(|_| Error::MalformedPacket("negative sample count"))?;

        if bytes.len() != TRACE2_HEADER_SIZE + nsamp * 4 {
            return Err(Error::MalformedPacket("payload size mismatch"));
        }

        let samples = (0..nsamp)
            .map(|i| i32_at(TRACE2_HEADER_SIZE + i * 4))
            .collect();

        Ok(Self {
            pinno: i32_at(0),
            start_time: f64_at(8),
            end_time: f64_at(16),
            sample_rate: f64_at(24),
            station: get_field(&bytes[32..39]),
            network: get_field(&bytes[39..48]),
            channel: get_field(&bytes[48..52]),
            location: get_field(&bytes[52..55]),
            quality: [bytes[60], bytes[61]],
            samples,
        })
    }
}

/// Copies up to `len - 1` bytes, then NUL pads the field.
fn put_field(buf: &mut Vec<u8>, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len - 1);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + len - n, 0);
}

fn get_field(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).to_string()
}

/// Seconds since 1970 (UTC) of this [Epoch], truncated to the millisecond
pub fn unix_start_time(epoch: Epoch) -> f64 {
    let (y, m, d, hh, mm, ss, nanos) = epoch.to_gregorian_utc();
    let millis = (nanos / 1_000_000) * 1_000_000;
    Epoch::from_gregorian_utc(y, m, d, hh, mm, ss, millis).to_unix_seconds()
}

/// Current time, in seconds since 1970
pub fn unix_now() -> u64 {
    Epoch::now()
        .map(|now| now.to_unix_seconds() as u64)
        .unwrap_or_default()
}

/// Heartbeat message: `<unix seconds> <pid>`
pub fn heartbeat_message(unix_s: u64, pid: u32) -> Vec<u8> {
    format!("{} {}\n", unix_s, pid).into_bytes()
}

/// Status message: `<unix seconds> <code> [text]`, truncated to [MAX_MESSAGE_SIZE]
pub fn status_message(unix_s: u64, code: i16, text: Option<&str>) -> Vec<u8> {
    let mut msg = match text {
        Some(text) => format!("{} {} {}", unix_s, code, text),
        None => format!("{} {}", unix_s, code),
    };

    let mut len = msg.len().min(MAX_MESSAGE_SIZE - 1);
    while !msg.is_char_boundary(len) {
        len -= 1;
    }
    msg.truncate(len);
    msg.push('\n');
    msg.into_bytes()
}
