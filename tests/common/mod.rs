//! Common test utilities: a simulated device and scratch directories

// Shared across test files - not every helper is used in each one
#![allow(dead_code)]

use rs232_session::constants::{BLOCK_SIZE, KEY_SIZE, RESPONSE_SIZE};
use rs232_session::{Link, SessionError, TimedStream};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// One observed operation on the simulated link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    Read(usize),
}

/// A device that echoes the first 31 bytes of every 32-byte block it receives.
///
/// The first write is taken as the key. Every operation is recorded so tests
/// can check ordering.
#[derive(Debug, Default)]
pub struct EchoDevice {
    pub ops: Vec<Op>,
    pending: VecDeque<u8>,
    key_seen: bool,
    /// Stop answering after this many responses.
    pub respond_limit: Option<usize>,
    /// Fail the n-th write (0-based) with a broken pipe.
    pub fail_write: Option<usize>,
    responses: usize,
}

impl EchoDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<&[u8]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write(data) => Some(data.as_slice()),
                Op::Read(_) => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Read(_))).count()
    }

    pub fn bytes_written(&self) -> usize {
        self.writes().iter().map(|w| w.len()).sum()
    }
}

impl Link for EchoDevice {
    fn name(&self) -> &str {
        "echo-sim"
    }

    fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        let index = self.writes().len();
        if self.fail_write == Some(index) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated unplug").into());
        }
        self.ops.push(Op::Write(data.to_vec()));

        if !self.key_seen {
            self.key_seen = true;
        } else if data.len() == BLOCK_SIZE && self.respond_limit.is_none_or(|limit| self.responses < limit) {
            self.pending.extend(&data[..RESPONSE_SIZE]);
            self.responses += 1;
        }
        Ok(())
    }

    fn receive_exact(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<(), SessionError> {
        self.ops.push(Op::Read(buf.len()));
        if self.pending.len() < buf.len() {
            return Err(SessionError::Timeout {
                expected: buf.len(),
                received: self.pending.len(),
                after: timeout.unwrap_or(Duration::MAX),
            });
        }
        for byte in buf.iter_mut() {
            *byte = self.pending.pop_front().unwrap();
        }
        Ok(())
    }
}

/// Byte-stream view of the same echo device, for exercising `StreamLink`.
///
/// Responses are handed out a few bytes at a time, with a poll timeout in
/// between, the way a slow UART delivers them.
#[derive(Debug, Default)]
pub struct EchoStream {
    pub tx: Vec<u8>,
    rx: VecDeque<u8>,
    consumed: usize,
    stalled: bool,
}

impl EchoStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Write for EchoStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.extend_from_slice(buf);
        loop {
            if self.consumed == 0 {
                if self.tx.len() < KEY_SIZE {
                    break;
                }
                self.consumed = KEY_SIZE;
            }
            if self.tx.len() < self.consumed + BLOCK_SIZE {
                break;
            }
            let block = &self.tx[self.consumed..self.consumed + BLOCK_SIZE];
            self.rx.extend(&block[..RESPONSE_SIZE]);
            self.consumed += BLOCK_SIZE;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for EchoStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Alternate between a short chunk and an idle poll.
        self.stalled = !self.stalled;
        if self.stalled || self.rx.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "poll"));
        }
        let n = buf.len().min(self.rx.len()).min(7);
        for slot in buf.iter_mut().take(n) {
            *slot = self.rx.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl TimedStream for EchoStream {}

/// Scratch directory for session files, removed on drop.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new(tag: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("rs232-session-{}-", tag))
            .tempdir()
            .expect("Failed to create scratch dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, data: &[u8]) {
        std::fs::write(self.path().join(name), data).expect("Failed to write scratch file");
    }

    pub fn read(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path().join(name)).expect("Failed to read scratch file")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }
}

/// Ciphertext of `blocks` blocks where block `i` is filled with byte `i`.
pub fn numbered_blocks(blocks: usize) -> Vec<u8> {
    (0..blocks).flat_map(|i| vec![i as u8; BLOCK_SIZE]).collect()
}
