// Protocol constants for the block-transfer session

use std::time::Duration;

/// Size of the session key sent before the first block (64 bytes)
pub const KEY_SIZE: usize = 64;

/// Size of one outbound ciphertext block (32 bytes)
pub const BLOCK_SIZE: usize = 32;

/// Size of the device response to one block (31 bytes)
pub const RESPONSE_SIZE: usize = 31;

/// Serial line speed expected by the device
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default deadline for a single block response
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Granularity of blocking reads on the serial port
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// File holding the key (only the first `KEY_SIZE` bytes are used)
pub const KEY_FILE: &str = "key.bin";

/// File holding the ciphertext stream
pub const CIPHERTEXT_FILE: &str = "enc1.bin";

/// File receiving the concatenated device responses
pub const OUTPUT_FILE: &str = "dec1.bin";

/// File holding the end-of-session trailer
pub const TRAILER_FILE: &str = "end.bin";
