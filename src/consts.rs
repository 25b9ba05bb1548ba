//! Wire-format opcodes and protocol-wide default values.
//!
//! Values are cross-checked against the gPXE `tftp.c` reference
//! implementation this engine is ported from.

/// Minimum legal block size (spec §3 invariant: `blksize >= 512`).
pub const MIN_BLOCK_SIZE: u16 = 512;
/// Block size used until a `blksize` option is negotiated.
pub const DEFAULT_BLOCK_SIZE: u16 = 512;
/// Largest block size this engine will ever request.
pub const MAX_BLOCK_SIZE: u16 = 65464;

/// Standard TFTP/TFTM port (RFC 1350).
pub const TFTP_PORT: u16 = 69;
/// PXE MTFTP listen port.
pub const MTFTP_PORT: u16 = 1759;

/// Consecutive MTFTP-open timeouts tolerated before falling back to
/// plain unicast TFTP (spec §4.5, gPXE `MTFTP_MAX_TIMEOUTS`).
pub const MTFTP_MAX_TIMEOUTS: u32 = 3;

/// Default number of consecutive retransmits a [`crate::timer::RetryTimer`]
/// tolerates before declaring `fail` (spec §4.5's `expired(fail)`),
/// matching the teacher's `DEFAULT_RETRANSMIT_TRIES`.
pub const DEFAULT_RETRANSMIT_TRIES: u32 = 3;

/// Default MTFTP multicast group, matching gPXE's `tftp_mtftp_socket`
/// default of `239.255.1.1:3001`.
pub const DEFAULT_MTFTP_MULTICAST_ADDR: std::net::Ipv4Addr = std::net::Ipv4Addr::new(239, 255, 1, 1);
pub const DEFAULT_MTFTP_MULTICAST_PORT: u16 = 3001;

pub mod opcode {
	pub const RRQ: u16 = 1;
	pub const DATA: u16 = 3;
	pub const ACK: u16 = 4;
	pub const ERROR: u16 = 5;
	pub const OACK: u16 = 6;
}

pub mod option_name {
	pub const BLKSIZE: &str = "blksize";
	pub const TSIZE: &str = "tsize";
	pub const MULTICAST: &str = "multicast";
}

/// Transfer mode TFTP requests are always sent with; this engine is
/// read-only and binary-only (spec §1 Non-goals exclude netascii).
pub const TRANSFER_MODE: &str = "octet";
