//! A minimal parser for the three URI schemes this engine accepts.
//!
//! The real "URI parser" is an external collaborator per spec §1; this
//! is just enough to make the crate self-contained and testable without
//! pulling in a general-purpose URI crate (none appears anywhere in the
//! retrieved example pack).

use crate::consts::{MTFTP_PORT, TFTP_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
	Tftp,
	Tftm,
	Mtftp,
}

impl Scheme {
	pub fn default_port(self) -> u16 {
		match self {
			Scheme::Tftp | Scheme::Tftm => TFTP_PORT,
			Scheme::Mtftp => MTFTP_PORT,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TftpUri {
	pub scheme: Scheme,
	pub host: String,
	pub port: Option<u16>,
	pub path: String,
}

impl TftpUri {
	/// The port an RRQ should initially target.
	pub fn port_or_default(&self) -> u16 {
		self.port.unwrap_or(self.scheme.default_port())
	}

	/// Parse a `tftp://host[:port]/path` (or `tftm://`/`mtftp://`) URI.
	///
	/// Fails if the scheme is unrecognised or the host/path is missing,
	/// mirroring gPXE's `tftp_core_open` sanity checks (`!uri->host` /
	/// `!uri->path`).
	pub fn parse(input: &str) -> Option<Self> {
		let (scheme_str, rest) = input.split_once("://")?;
		let scheme = match scheme_str {
			"tftp" => Scheme::Tftp,
			"tftm" => Scheme::Tftm,
			"mtftp" => Scheme::Mtftp,
			_ => return None,
		};

		let (authority, path) = match rest.find('/') {
			Some(idx) => (&rest[..idx], &rest[idx..]),
			None => (rest, "/"),
		};
		if authority.is_empty() {
			return None;
		}

		let (host, port) = match authority.rsplit_once(':') {
			Some((h, p)) => (h, Some(p.parse::<u16>().ok()?)),
			None => (authority, None),
		};
		if host.is_empty() || path.is_empty() {
			return None;
		}

		Some(TftpUri {
			scheme,
			host: host.to_string(),
			port,
			path: path.to_string(),
		})
	}

	/// The filename sent in the RRQ: `uri.path` with a single leading
	/// `/` stripped if present (spec §4.2).
	pub fn rrq_filename(&self) -> &str {
		self.path.strip_prefix('/').unwrap_or(&self.path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_tftp() {
		let uri = TftpUri::parse("tftp://10.0.0.1/boot/pxelinux.0").unwrap();
		assert_eq!(uri.scheme, Scheme::Tftp);
		assert_eq!(uri.host, "10.0.0.1");
		assert_eq!(uri.port, None);
		assert_eq!(uri.port_or_default(), 69);
		assert_eq!(uri.rrq_filename(), "boot/pxelinux.0");
	}

	#[test]
	fn parses_explicit_port() {
		let uri = TftpUri::parse("mtftp://srv:1760/file").unwrap();
		assert_eq!(uri.port_or_default(), 1760);
	}

	#[test]
	fn mtftp_defaults_to_pxe_port() {
		let uri = TftpUri::parse("mtftp://srv/file").unwrap();
		assert_eq!(uri.port_or_default(), MTFTP_PORT);
	}

	#[test]
	fn rejects_missing_host() {
		assert!(TftpUri::parse("tftp:///file").is_none());
	}

	#[test]
	fn rejects_unknown_scheme() {
		assert!(TftpUri::parse("ftp://host/file").is_none());
	}

	#[test]
	fn root_path_defaults_to_slash() {
		let uri = TftpUri::parse("tftp://host").unwrap();
		assert_eq!(uri.path, "/");
		assert_eq!(uri.rrq_filename(), "");
	}
}
