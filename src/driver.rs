// src/driver.rs

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::files::SessionFiles;
use crate::link::Link;
use std::io::Write;
use tracing::{debug, info};

/// Totals of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionReport {
    pub blocks: usize,
    pub response_bytes: usize,
    pub trailer_bytes: usize,
}

/// Drives one key / blocks / trailer exchange with the device.
///
/// The device is single-buffered and stateful: every block write is followed
/// by a full read of its response before the next block goes out.
pub struct ProtocolDriver<L: Link> {
    link: L,
    config: SessionConfig,
}

impl<L: Link> ProtocolDriver<L> {
    pub fn new(link: L, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self { link, config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Give back the link, e.g. to inspect a simulated device.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Write the session key. No response is read.
    pub fn send_key(&mut self, key: &[u8]) -> Result<(), SessionError> {
        self.config.check_key(key)?;
        debug!(len = key.len(), "Sending key");
        self.link.send(key)
    }

    /// Write one block and wait for its response.
    pub fn transfer_block(&mut self, block: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.config.check_block(block)?;
        self.link.send(block)?;
        let mut response = vec![0u8; self.config.response_len];
        self.link.receive_exact(&mut response, self.config.read_timeout)?;
        Ok(response)
    }

    /// Run the whole session, streaming each response into `sink` as it arrives.
    ///
    /// Input lengths are checked before the first byte goes out. On failure,
    /// responses already written to `sink` are left in place.
    pub fn run_session<W: Write>(
        &mut self,
        key: &[u8],
        ciphertext: &[u8],
        trailer: &[u8],
        sink: &mut W,
    ) -> Result<SessionReport, SessionError> {
        let blocks = self.config.block_count(ciphertext.len())?;
        self.config.check_key(key)?;

        info!(
            link = self.link.name(),
            blocks,
            trailer_bytes = trailer.len(),
            "--- Starting Session ---"
        );
        self.send_key(key)?;

        let mut report = SessionReport::default();
        for (index, block) in ciphertext.chunks_exact(self.config.block_len).enumerate() {
            let response = self.transfer_block(block)?;
            sink.write_all(&response)?;
            report.blocks += 1;
            report.response_bytes += response.len();
            debug!(block = index, of = blocks, "Block transferred");
        }
        sink.flush()?;

        if !trailer.is_empty() {
            debug!(len = trailer.len(), "Sending trailer");
            self.link.send(trailer)?;
            report.trailer_bytes = trailer.len();
        }
        self.link.flush()?;

        info!(
            blocks = report.blocks,
            response_bytes = report.response_bytes,
            "--- Session Complete ---"
        );
        Ok(report)
    }
}

/// Load the session files, then open the link and run the session.
///
/// Inputs are validated before `open_link` is called, so a bad ciphertext
/// length never touches the port or the output file.
pub fn run_with_files<L, F>(
    files: &SessionFiles,
    config: SessionConfig,
    open_link: F,
) -> Result<SessionReport, SessionError>
where
    L: Link,
    F: FnOnce() -> Result<L, SessionError>,
{
    let inputs = files.load(&config)?;
    let mut driver = ProtocolDriver::new(open_link()?, config)?;
    let mut output = files.create_output()?;
    info!(output = %files.output.display(), "Writing responses");
    driver.run_session(&inputs.key, &inputs.ciphertext, &inputs.trailer, &mut output)
}
