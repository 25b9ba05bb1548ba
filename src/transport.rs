//! Transport collaborator traits.
//!
//! Per spec §1/§6 the UDP socket is owned by the caller, not the
//! engine; the engine only needs to send/receive datagrams and learn
//! the peer's address. Shaped after the teacher's blocking
//! `std::net::UdpSocket` usage in `jonasjelonek-tftp/src/client.rs`,
//! generalised into a trait so the engine core stays test-doubleable
//! and so the MTFTP fallback ladder can `reopen()` a transport bound to
//! a new peer without the engine knowing the concrete socket type.

use std::io;
use std::net::SocketAddr;

/// A single non-blocking (or blocking-but-caller-polled) UDP endpoint.
///
/// The engine never blocks on this trait: `recv_from` is expected to
/// return `Err` of kind `WouldBlock` (or an engine-specific sentinel,
/// see [`TransportError::WouldBlock`]) when nothing is queued, and the
/// caller's event loop is responsible for calling back in once data
/// (or a timer expiry) is ready.
pub trait UdpTransport {
	/// Send `buf` to `to`.
	fn send_to(&mut self, buf: &[u8], to: SocketAddr) -> Result<(), TransportError>;

	/// Non-blocking receive. Returns the number of bytes written into
	/// `buf` and the sender's address, or `Err(WouldBlock)` if nothing
	/// is currently queued.
	fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError>;

	/// The local address this transport is bound to (used to detect
	/// the MTFTP multicast quirk of a server echoing back the client's
	/// own bind address as its "peer").
	fn local_addr(&self) -> Result<SocketAddr, TransportError>;

	/// Replace the underlying socket, rebinding to `local` if given.
	/// Used by the MTFTP-retry-with-peer fallback step (spec §4.5's
	/// fallback ladder), which must start talking to a specific
	/// unicast peer port rather than the multicast group.
	fn reopen(&mut self, local: Option<SocketAddr>) -> Result<(), TransportError>;
}

/// A transport that has additionally joined a multicast group, used
/// for the `mtftp://` and `tftm://` open paths.
pub trait McTransport: UdpTransport {
	/// Join the given multicast group on the transport's existing
	/// local interface.
	fn join_multicast(&mut self, group: std::net::Ipv4Addr) -> Result<(), TransportError>;

	/// Leave a previously joined multicast group.
	fn leave_multicast(&mut self, group: std::net::Ipv4Addr) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
	#[error("no datagram currently queued")]
	WouldBlock,
	#[error("transport I/O error: {0}")]
	Io(#[from] io::Error),
}

impl TransportError {
	pub fn is_would_block(&self) -> bool {
		matches!(self, TransportError::WouldBlock)
	}
}

/// A concrete, blocking-with-timeout [`UdpTransport`] backed by
/// `std::net::UdpSocket`, used by the demo binary. Mirrors
/// `jonasjelonek-tftp/src/client.rs`'s socket setup, but exposes
/// `recv_from` as a bounded-wait poll rather than the teacher's
/// indefinite blocking read, since the engine core drives its own
/// retransmit timer instead of relying on socket read timeouts alone.
pub struct StdUdpTransport {
	socket: std::net::UdpSocket,
}

impl StdUdpTransport {
	pub fn bind(local: SocketAddr) -> Result<Self, TransportError> {
		let socket = std::net::UdpSocket::bind(local)?;
		socket.set_nonblocking(true)?;
		Ok(Self { socket })
	}
}

impl UdpTransport for StdUdpTransport {
	fn send_to(&mut self, buf: &[u8], to: SocketAddr) -> Result<(), TransportError> {
		self.socket.send_to(buf, to)?;
		Ok(())
	}

	fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
		match self.socket.recv_from(buf) {
			Ok(r) => Ok(r),
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(TransportError::WouldBlock),
			Err(e) => Err(TransportError::Io(e)),
		}
	}

	fn local_addr(&self) -> Result<SocketAddr, TransportError> {
		Ok(self.socket.local_addr()?)
	}

	fn reopen(&mut self, local: Option<SocketAddr>) -> Result<(), TransportError> {
		let bind_addr = local.unwrap_or_else(|| self.socket.local_addr().unwrap());
		let socket = std::net::UdpSocket::bind(bind_addr)?;
		socket.set_nonblocking(true)?;
		self.socket = socket;
		Ok(())
	}
}

impl McTransport for StdUdpTransport {
	fn join_multicast(&mut self, group: std::net::Ipv4Addr) -> Result<(), TransportError> {
		self.socket.join_multicast_v4(&group, &std::net::Ipv4Addr::UNSPECIFIED)?;
		Ok(())
	}

	fn leave_multicast(&mut self, group: std::net::Ipv4Addr) -> Result<(), TransportError> {
		self.socket.leave_multicast_v4(&group, &std::net::Ipv4Addr::UNSPECIFIED)?;
		Ok(())
	}
}
