//! Process-wide configuration.
//!
//! Per spec §5, request-open-time settings (default `blksize`, default
//! MTFTP group/port) are read from a small process-global config
//! rather than threaded through every call, the way
//! `jonasjelonek-tftp/src/cli.rs` parses a handful of flags once at
//! startup into a struct the rest of the binary reads from. Values are
//! guarded by an `RwLock` rather than an atomic-per-field, since the
//! granular setters (`set_request_blksize`,
//! `set_mtftp_multicast_address`, `set_mtftp_multicast_port`) are each
//! called far more rarely than the config is read from request
//! state machines.

use std::net::Ipv4Addr;
use std::sync::RwLock;

use crate::consts::{DEFAULT_BLOCK_SIZE, DEFAULT_MTFTP_MULTICAST_ADDR, DEFAULT_MTFTP_MULTICAST_PORT, MIN_BLOCK_SIZE};
use crate::uri::{Scheme, TftpUri};

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
	/// `blksize` requested by default when a caller doesn't override it.
	pub default_blksize: u16,
	/// Default MTFTP multicast group/port, overridable per-request via
	/// DHCP option 93/94/95-style settings (spec §4.5).
	pub default_mc_group: (Ipv4Addr, u16),
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			default_blksize: DEFAULT_BLOCK_SIZE,
			default_mc_group: (DEFAULT_MTFTP_MULTICAST_ADDR, DEFAULT_MTFTP_MULTICAST_PORT),
		}
	}
}

static CONFIG: RwLock<EngineConfig> = RwLock::new(EngineConfig {
	default_blksize: DEFAULT_BLOCK_SIZE,
	default_mc_group: (DEFAULT_MTFTP_MULTICAST_ADDR, DEFAULT_MTFTP_MULTICAST_PORT),
});

/// Read the current process-wide defaults.
pub fn current() -> EngineConfig {
	*CONFIG.read().expect("config lock poisoned")
}

/// Replace the process-wide defaults wholesale, e.g. from DHCP-learned
/// settings at boot. Performs no clamping; prefer the granular setters
/// below for values coming from untrusted or loosely-validated sources.
pub fn set_defaults(cfg: EngineConfig) {
	*CONFIG.write().expect("config lock poisoned") = cfg;
}

/// `set-request-blksize`: set the default `blksize` a future request
/// proposes in its RRQ, floored at [`MIN_BLOCK_SIZE`] per spec §5 —
/// anything smaller isn't a legal block size to *propose*, even though
/// a server is free to negotiate one down via OACK (see
/// `Request::on_oack`, which applies no such floor to what it reads
/// off the wire).
pub fn set_request_blksize(blksize: u16) {
	CONFIG.write().expect("config lock poisoned").default_blksize = blksize.max(MIN_BLOCK_SIZE);
}

/// `set-mtftp-multicast-address`: set the default MTFTP multicast
/// group a future request joins before any server-specific OACK
/// override arrives.
pub fn set_mtftp_multicast_address(addr: Ipv4Addr) {
	CONFIG.write().expect("config lock poisoned").default_mc_group.0 = addr;
}

/// `set-mtftp-multicast-port`: set the default MTFTP multicast port a
/// future request joins before any server-specific OACK override
/// arrives.
pub fn set_mtftp_multicast_port(port: u16) {
	CONFIG.write().expect("config lock poisoned").default_mc_group.1 = port;
}

/// Apply a newly-learned `next-server` (DHCP option 66 / siaddr)
/// setting, per spec §5's supplemented DHCP-interaction behavior.
///
/// Ported from gPXE's `tftp_apply_settings`: the process-wide "current
/// working URI" is *replaced* with `tftp://<ipv4>/`, a fresh root URI,
/// not patched in place — `old`'s scheme, port and path are all
/// discarded along with its host. Returns `None` if `new` is unset
/// (the caller keeps using `old` unmodified).
pub fn apply_next_server(_old: &TftpUri, new: Option<Ipv4Addr>) -> Option<TftpUri> {
	let new = new?;
	Some(TftpUri {
		scheme: Scheme::Tftp,
		host: new.to_string(),
		port: None,
		path: "/".into(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn apply_next_server_replaces_with_fresh_tftp_root_uri() {
		let old = TftpUri {
			scheme: Scheme::Mtftp,
			host: "10.0.0.1".into(),
			port: Some(1760),
			path: "/boot.bin".into(),
		};
		let updated = apply_next_server(&old, Some(Ipv4Addr::new(10, 0, 0, 9))).unwrap();
		assert_eq!(updated.scheme, Scheme::Tftp);
		assert_eq!(updated.host, "10.0.0.9");
		assert_eq!(updated.port, None);
		assert_eq!(updated.path, "/");
	}

	#[test]
	fn apply_next_server_none_is_passthrough() {
		let old = TftpUri {
			scheme: Scheme::Tftp,
			host: "10.0.0.1".into(),
			port: None,
			path: "/boot.bin".into(),
		};
		assert!(apply_next_server(&old, None).is_none());
	}

	#[test]
	fn defaults_roundtrip_through_set_and_current() {
		let before = current();
		set_defaults(EngineConfig {
			default_blksize: 1432,
			..before
		});
		assert_eq!(current().default_blksize, 1432);
		set_defaults(before);
	}

	#[test]
	fn set_request_blksize_floors_at_minimum() {
		let before = current();
		set_request_blksize(8);
		assert_eq!(current().default_blksize, MIN_BLOCK_SIZE);
		set_request_blksize(1432);
		assert_eq!(current().default_blksize, 1432);
		set_defaults(before);
	}

	#[test]
	fn set_mtftp_multicast_address_and_port_update_independently() {
		let before = current();
		set_mtftp_multicast_address(Ipv4Addr::new(239, 1, 1, 9));
		set_mtftp_multicast_port(4321);
		let cfg = current();
		assert_eq!(cfg.default_mc_group, (Ipv4Addr::new(239, 1, 1, 9), 4321));
		set_defaults(before);
	}
}
