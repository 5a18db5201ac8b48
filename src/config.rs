use crate::constants::{BLOCK_SIZE, DEFAULT_BAUD_RATE, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT, KEY_SIZE, RESPONSE_SIZE};
use crate::error::SessionError;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// Serial framing parameters used when opening the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Timeout of a single port read; longer waits are built from several polls.
    pub poll_interval: Duration,
}

impl Default for LinkConfig {
    /// 115200 baud, 8N1, no XON/XOFF, no RTS/CTS
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl LinkConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.baud_rate == 0 {
            return Err(SessionError::invalid("baud rate must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(SessionError::invalid("poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Buffer sizes and read deadline of one session.
///
/// The sizes are fixed by the device; they are kept here rather than inlined
/// so the driver checks every buffer against one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub key_len: usize,
    pub block_len: usize,
    pub response_len: usize,
    /// Deadline for each block response. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_len: KEY_SIZE,
            block_len: BLOCK_SIZE,
            response_len: RESPONSE_SIZE,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }
}

impl SessionConfig {
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.key_len == 0 || self.block_len == 0 || self.response_len == 0 {
            return Err(SessionError::invalid(format!(
                "buffer sizes must be non-zero (key {}, block {}, response {})",
                self.key_len, self.block_len, self.response_len
            )));
        }
        if matches!(self.read_timeout, Some(t) if t.is_zero()) {
            return Err(SessionError::invalid("read timeout must be non-zero, use None to wait forever"));
        }
        Ok(())
    }

    /// Number of blocks in a ciphertext stream, or `InvalidInput` if it is not block aligned.
    pub fn block_count(&self, ciphertext_len: usize) -> Result<usize, SessionError> {
        if ciphertext_len % self.block_len != 0 {
            return Err(SessionError::invalid(format!(
                "ciphertext length {} is not a multiple of {}",
                ciphertext_len, self.block_len
            )));
        }
        Ok(ciphertext_len / self.block_len)
    }

    pub fn check_key(&self, key: &[u8]) -> Result<(), SessionError> {
        if key.len() != self.key_len {
            return Err(SessionError::invalid(format!(
                "key must be {} bytes, got {}",
                self.key_len,
                key.len()
            )));
        }
        Ok(())
    }

    pub fn check_block(&self, block: &[u8]) -> Result<(), SessionError> {
        if block.len() != self.block_len {
            return Err(SessionError::invalid(format!(
                "block must be {} bytes, got {}",
                self.block_len,
                block.len()
            )));
        }
        Ok(())
    }
}
