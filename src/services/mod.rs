// Service exports
pub mod encoder;
pub mod snapshot;

pub use encoder::{EncoderError, HashingEncoder, HttpEncoder, TextEncoder};
pub use snapshot::{filter_eligible, load_snapshot, parse_snapshot, write_report, SnapshotError};
