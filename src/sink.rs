//! Downstream byte-sink collaborator trait.
//!
//! The engine never owns the destination of received file data (spec
//! §6): a file on disk, a PXE-loaded image buffer, or (in the demo
//! binary's case) a plain `std::fs::File`. Shaped after
//! `jonasjelonek-tftp/src/client.rs`'s file-writing loop, generalised
//! into a trait so `request.rs` can be exercised against an in-memory
//! fake in tests.

/// Where received, in-order file bytes ultimately go.
pub trait DownstreamSink {
	/// Called once, as soon as the file size is known (from a
	/// negotiated `tsize`, or never, if the server didn't offer one).
	fn set_size(&mut self, bytes: u64);

	/// Positioned write at `offset` (spec §6). Under multicast,
	/// blocks can arrive out of order, so the sink must tolerate
	/// gaps and must treat repeated `(offset, bytes)` writes as
	/// idempotent.
	fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), SinkError>;

	/// Final notification: `Ok(())` on a complete transfer, `Err` with
	/// the terminal reason otherwise. Called exactly once.
	fn close(&mut self, status: Result<(), crate::error::TftpError>);

	/// The sink's preferred write granularity, if any (spec §6:
	/// mirrors gPXE's downstream `window()` call, historically abused
	/// by some callers to report a desired `blksize`). `Request::open`
	/// reads this once, before sending the RRQ, and proposes it in
	/// place of the configured default blksize (clamped to
	/// `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE`). Returning `0` means "no
	/// preference".
	fn window(&self) -> usize {
		0
	}
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
	#[error("downstream sink I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("downstream sink rejected the write")]
	Rejected,
}

/// A [`DownstreamSink`] backed by a plain file, used by the demo
/// binary.
pub struct FileSink {
	file: std::fs::File,
}

impl FileSink {
	pub fn create(path: &std::path::Path) -> std::io::Result<Self> {
		Ok(Self {
			file: std::fs::File::create(path)?,
		})
	}
}

impl DownstreamSink for FileSink {
	fn set_size(&mut self, bytes: u64) {
		if let Err(e) = self.file.set_len(bytes) {
			log::warn!("failed to size output file to {bytes} bytes: {e}");
		}
	}

	fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), SinkError> {
		use std::io::{Seek, SeekFrom, Write};
		self.file.seek(SeekFrom::Start(offset))?;
		self.file.write_all(bytes)?;
		Ok(())
	}

	fn close(&mut self, status: Result<(), crate::error::TftpError>) {
		match status {
			Ok(()) => log::debug!("transfer complete"),
			Err(e) => log::warn!("transfer failed: {e}"),
		}
	}
}
