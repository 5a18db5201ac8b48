// src/link.rs

use crate::config::LinkConfig;
use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::error::SessionError;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Byte-oriented duplex channel to the device.
///
/// Implementations are used by exactly one session at a time and are released
/// when dropped.
pub trait Link {
    /// Human readable identifier, used in logs.
    fn name(&self) -> &str;

    /// Write all of `data` to the device.
    fn send(&mut self, data: &[u8]) -> Result<(), SessionError>;

    /// Fill `buf` completely from the device.
    ///
    /// With `timeout == None` this blocks until every byte has arrived.
    fn receive_exact(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<(), SessionError>;

    fn flush(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// A blocking byte stream whose reads give up after a settable timeout.
///
/// Streams without a configurable timeout keep the default no-op; their
/// reads are expected to return `TimedOut` or `WouldBlock` on their own.
pub trait TimedStream: Read + Write {
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl TimedStream for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout)?;
        Ok(())
    }
}

/// A [`Link`] over any [`TimedStream`].
pub struct StreamLink<S> {
    stream: S,
    name: String,
    poll_interval: Duration,
}

impl<S> std::fmt::Debug for StreamLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("name", &self.name)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// The production link: an opened serial port.
pub type SerialLink = StreamLink<Box<dyn SerialPort>>;

impl<S: TimedStream> StreamLink<S> {
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            stream,
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: TimedStream> Link for StreamLink<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        debug!(port = %self.name, bytes = hex::encode(data), "Link Write");
        self.stream.write_all(data)?;
        Ok(())
    }

    fn receive_exact(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<(), SessionError> {
        read_exact_within(&mut self.stream, buf, timeout, self.poll_interval)?;
        debug!(port = %self.name, bytes = hex::encode(&buf[..]), "Link Read");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        self.stream.flush()?;
        Ok(())
    }
}

/// Open and configure the serial port named `port`.
///
/// Framing parameters the port cannot be configured with are reported as
/// `Connection` errors, like a port that fails to open.
pub fn open_session(port: &str, config: &LinkConfig) -> Result<SerialLink, SessionError> {
    let connection_error = |source| SessionError::Connection {
        port: port.to_string(),
        source,
    };

    config.validate().map_err(|e| {
        connection_error(serialport::Error::new(serialport::ErrorKind::InvalidInput, e.to_string()))
    })?;
    info!(
        %port,
        baud = config.baud_rate,
        data_bits = ?config.data_bits,
        parity = ?config.parity,
        stop_bits = ?config.stop_bits,
        flow_control = ?config.flow_control,
        "Opening serial port"
    );

    let serial = serialport::new(port, config.baud_rate)
        .data_bits(config.data_bits)
        .parity(config.parity)
        .stop_bits(config.stop_bits)
        .flow_control(config.flow_control)
        .timeout(config.poll_interval)
        .open()
        .map_err(connection_error)?;

    // Bytes left over from a previous run would shift every response.
    serial.clear(ClearBuffer::All).map_err(connection_error)?;
    info!(%port, "Serial port ready");

    Ok(StreamLink::new(serial, port).with_poll_interval(config.poll_interval))
}

/// Read until `buf` is full, tolerating per-read timeouts until `timeout` has elapsed.
///
/// Each read waits at most `poll_interval`, shortened to what is left of the
/// deadline so a bounded read never overshoots it by a whole poll.
pub(crate) fn read_exact_within<R: TimedStream>(
    reader: &mut R,
    buf: &mut [u8],
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<(), SessionError> {
    let start = Instant::now();
    let mut filled = 0;
    let mut current_wait = None;

    while filled < buf.len() {
        let wait = match timeout {
            Some(limit) => {
                let remaining = limit.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    return Err(SessionError::Timeout {
                        expected: buf.len(),
                        received: filled,
                        after: limit,
                    });
                }
                remaining.min(poll_interval)
            }
            None => poll_interval,
        };
        if current_wait != Some(wait) {
            reader.set_read_timeout(wait)?;
            current_wait = Some(wait);
        }

        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("link closed after {} of {} bytes", filled, buf.len()),
                )
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
