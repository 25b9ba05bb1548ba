use std::fmt;

/// Errors that can occur while decoding or building a wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
	#[error("packet shorter than the minimum for its opcode")]
	UnexpectedEof,
	#[error("malformed packet")]
	Malformed,
	#[error("unknown opcode")]
	UnknownOpcode,
	#[error("DATA payload exceeds negotiated block size")]
	Overlength,
	#[error("option name or value missing its NUL terminator")]
	NotNullTerminated,
	#[error("non-UTF8 bytes in packet")]
	InvalidCharacters,
}

/// Errors raised while processing a single negotiated option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
	#[error("blksize value is not a valid decimal integer")]
	InvalidBlksize,
	#[error("tsize value is not a valid decimal integer")]
	InvalidTsize,
	#[error("multicast option missing port/mc fields")]
	McNoPort,
	#[error("multicast option missing mc field")]
	McNoMc,
	#[error("multicast option mc field is not 0 or 1")]
	McInvalidMc,
	#[error("multicast option address is not a valid IPv4 address")]
	McInvalidIp,
	#[error("multicast option port is not a valid decimal integer")]
	McInvalidPort,
}

/// The error kinds a [`crate::request::Request`] can terminate with.
///
/// These map 1:1 onto spec §7's taxonomy; `done(status)` carries exactly
/// one of these (or `Ok(())` on success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TftpError {
	#[error("invalid argument: {0}")]
	InvalidArg(&'static str),
	#[error("out of memory")]
	OutOfMemory,
	#[error("timed out waiting for a reply")]
	Timeout,
	#[error("malformed or out-of-bounds packet: {0}")]
	BadPacket(PacketError),
	#[error("invalid blksize option value")]
	InvalidBlksize,
	#[error("invalid tsize option value")]
	InvalidTsize,
	#[error("multicast option missing port/mc fields")]
	McNoPort,
	#[error("multicast option missing mc field")]
	McNoMc,
	#[error("multicast option mc field invalid")]
	McInvalidMc,
	#[error("multicast option address invalid")]
	McInvalidIp,
	#[error("multicast option port invalid")]
	McInvalidPort,
	#[error("server reported file not found")]
	NotFound,
	#[error("server reported access denied")]
	AccessDenied,
	#[error("server reported operation not supported")]
	NotSupported,
}

impl From<PacketError> for TftpError {
	fn from(e: PacketError) -> Self {
		TftpError::BadPacket(e)
	}
}

impl From<OptionError> for TftpError {
	fn from(e: OptionError) -> Self {
		match e {
			OptionError::InvalidBlksize => TftpError::InvalidBlksize,
			OptionError::InvalidTsize => TftpError::InvalidTsize,
			OptionError::McNoPort => TftpError::McNoPort,
			OptionError::McNoMc => TftpError::McNoMc,
			OptionError::McInvalidMc => TftpError::McInvalidMc,
			OptionError::McInvalidIp => TftpError::McInvalidIp,
			OptionError::McInvalidPort => TftpError::McInvalidPort,
		}
	}
}

/// Server-side ERROR opcode values, mapped per spec §6's numeric map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerErrorCode(pub u16);

impl ServerErrorCode {
	pub fn to_tftp_error(self) -> TftpError {
		match self.0 {
			1 => TftpError::NotFound,
			2 => TftpError::AccessDenied,
			4 => TftpError::NotSupported,
			_ => TftpError::NotSupported,
		}
	}
}

impl fmt::Display for ServerErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
