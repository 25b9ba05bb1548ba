//! Option processor: parses `blksize` / `tsize` / `multicast` option
//! values and reports how they should mutate request state.
//!
//! Ported from gPXE's `tftp_process_blksize` / `tftp_process_tsize` /
//! `tftp_process_multicast`, restated in the teacher's `TftpOption`-enum
//! style (`jonasjelonek-tftp/src/tftp/options.rs`).

use std::net::Ipv4Addr;

use crate::consts::option_name;
use crate::error::OptionError;

/// The effect of a successfully-parsed `multicast` option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastOption {
	/// `None` when both `addr` and `port` were left empty in the value.
	pub group: Option<(Ipv4Addr, u16)>,
	/// `false` clears `SEND_ACK` (this client is not the master).
	pub is_master: bool,
}

/// One option as parsed out of an OACK, in the order the option
/// processor should apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedOption {
	Blksize(u16),
	Tsize(u64),
	Multicast(MulticastOption),
}

/// Recognised option names are matched case-insensitively (spec §4.4);
/// unknown names are silently ignored by the caller.
pub fn recognize(name: &str) -> Option<&'static str> {
	if name.eq_ignore_ascii_case(option_name::BLKSIZE) {
		Some(option_name::BLKSIZE)
	} else if name.eq_ignore_ascii_case(option_name::TSIZE) {
		Some(option_name::TSIZE)
	} else if name.eq_ignore_ascii_case(option_name::MULTICAST) {
		Some(option_name::MULTICAST)
	} else {
		None
	}
}

/// Parse a single `(name, value)` pair already matched to a recognised
/// option name via [`recognize`].
pub fn parse_option(canonical_name: &str, value: &str) -> Result<ParsedOption, OptionError> {
	match canonical_name {
		option_name::BLKSIZE => {
			let size: u16 = value.parse().map_err(|_| OptionError::InvalidBlksize)?;
			Ok(ParsedOption::Blksize(size))
		}
		option_name::TSIZE => {
			let size: u64 = value.parse().map_err(|_| OptionError::InvalidTsize)?;
			Ok(ParsedOption::Tsize(size))
		}
		option_name::MULTICAST => parse_multicast(value).map(ParsedOption::Multicast),
		_ => unreachable!("caller must pass a name returned by recognize()"),
	}
}

fn parse_multicast(value: &str) -> Result<MulticastOption, OptionError> {
	let mut parts = value.splitn(3, ',');
	let addr = parts.next().unwrap_or("");
	let port = parts.next().ok_or(OptionError::McNoPort)?;
	let mc = parts.next().ok_or(OptionError::McNoMc)?;

	let mc_val: u32 = mc.parse().map_err(|_| OptionError::McInvalidMc)?;
	let is_master = mc_val != 0;

	let group = if !addr.is_empty() && !port.is_empty() {
		let ip: Ipv4Addr = addr.parse().map_err(|_| OptionError::McInvalidIp)?;
		let port_num: u16 = port.parse().map_err(|_| OptionError::McInvalidPort)?;
		Some((ip, port_num))
	} else {
		None
	};

	Ok(MulticastOption { group, is_master })
}

/// Walk the `(name, value)*` sequence decoded from an OACK, ignoring
/// unrecognised names, and stop at (returning) the first parse error —
/// mirroring gPXE's `tftp_rx_oack` loop which bails out of option
/// processing entirely on the first hard error.
pub fn parse_oack_options<'a, I>(pairs: I) -> Result<Vec<ParsedOption>, OptionError>
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let mut out = Vec::new();
	for (name, value) in pairs {
		if let Some(canonical) = recognize(name) {
			out.push(parse_option(canonical, value)?);
		}
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_option_is_ignored() {
		let parsed = parse_oack_options([("windowsize", "4")]).unwrap();
		assert!(parsed.is_empty());
	}

	#[test]
	fn blksize_roundtrip() {
		let parsed = parse_oack_options([("blksize", "1432")]).unwrap();
		assert_eq!(parsed, vec![ParsedOption::Blksize(1432)]);
	}

	#[test]
	fn blksize_case_insensitive() {
		let parsed = parse_oack_options([("BlkSize", "1024")]).unwrap();
		assert_eq!(parsed, vec![ParsedOption::Blksize(1024)]);
	}

	#[test]
	fn blksize_non_numeric_is_fatal() {
		let err = parse_option(option_name::BLKSIZE, "big").unwrap_err();
		assert_eq!(err, OptionError::InvalidBlksize);
	}

	#[test]
	fn tsize_non_numeric_is_fatal() {
		let err = parse_option(option_name::TSIZE, "???").unwrap_err();
		assert_eq!(err, OptionError::InvalidTsize);
	}

	#[test]
	fn multicast_missing_port_is_fatal() {
		let err = parse_multicast("239.1.1.1").unwrap_err();
		assert_eq!(err, OptionError::McNoPort);
	}

	#[test]
	fn multicast_missing_mc_is_fatal() {
		let err = parse_multicast("239.1.1.1,3001").unwrap_err();
		assert_eq!(err, OptionError::McNoMc);
	}

	#[test]
	fn multicast_non_master_clears_ack() {
		let opt = parse_multicast("239.1.1.1,3001,0").unwrap();
		assert!(!opt.is_master);
		assert_eq!(opt.group, Some((Ipv4Addr::new(239, 1, 1, 1), 3001)));
	}

	#[test]
	fn multicast_master_with_empty_addr_port() {
		let opt = parse_multicast(",,1").unwrap();
		assert!(opt.is_master);
		assert_eq!(opt.group, None);
	}

	#[test]
	fn multicast_invalid_ip_is_fatal() {
		let err = parse_multicast("not-an-ip,3001,1").unwrap_err();
		assert_eq!(err, OptionError::McInvalidIp);
	}

	#[test]
	fn multicast_invalid_port_is_fatal() {
		let err = parse_multicast("239.1.1.1,not-a-port,1").unwrap_err();
		assert_eq!(err, OptionError::McInvalidPort);
	}
}
