//! Request Controller: the state machine at the heart of the engine.
//!
//! Owns one download end-to-end — option negotiation, block assembly,
//! retransmission, and the MTFTP fallback ladder — dispatching into
//! the collaborator traits in [`crate::transport`], [`crate::timer`]
//! and [`crate::sink`]. Structured the way
//! `jonasjelonek-tftp/src/client.rs` drives its receive loop around a
//! single `TftpConnection`, but reworked into an explicit,
//! callback-driven state machine per the non-blocking, single-threaded
//! event model this engine requires.

use std::net::{Ipv4Addr, SocketAddr};

use crate::bitmap::BlockBitmap;
use crate::config::EngineConfig;
use crate::consts::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, MTFTP_MAX_TIMEOUTS, TFTP_PORT};
use crate::error::{PacketError, ServerErrorCode, TftpError};
use crate::options::ParsedOption;
use crate::packet::{self, Packet, RrqOptions};
use crate::sink::DownstreamSink;
use crate::timer::RetryTimer;
use crate::transport::{McTransport, TransportError, UdpTransport};
use crate::uri::TftpUri;

/// Which of the three URI schemes opened this request; fixes the
/// initial flag set (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Tftp,
	Tftm,
	Mtftp,
}

/// Request-state flags. A plain bitset rather than a crate: the set is
/// small, fixed, and never grows past four members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestFlags(u8);

impl RequestFlags {
	pub const SEND_ACK: Self = Self(1 << 0);
	pub const RRQ_SIZES: Self = Self(1 << 1);
	pub const RRQ_MULTICAST: Self = Self(1 << 2);
	pub const MTFTP_RECOVERY: Self = Self(1 << 3);

	pub const fn empty() -> Self {
		Self(0)
	}

	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	pub fn insert(&mut self, other: Self) {
		self.0 |= other.0;
	}

	pub fn remove(&mut self, other: Self) {
		self.0 &= !other.0;
	}
}

impl std::ops::BitOr for RequestFlags {
	type Output = Self;
	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

/// Drives one download. Generic over its four collaborators so tests
/// can exercise the state machine against in-memory fakes without any
/// real sockets or clock.
pub struct Request<U, M, T, S> {
	uri: TftpUri,
	host_addr: std::net::IpAddr,
	port: u16,
	peer: Option<SocketAddr>,
	blksize: u16,
	tsize: u64,
	filesize: u64,
	flags: RequestFlags,
	mtftp_timeouts: u32,
	bitmap: BlockBitmap,
	done: bool,

	transport: U,
	mc_transport: Option<M>,
	timer: T,
	sink: S,
}

impl<U, M, T, S> Request<U, M, T, S>
where
	U: UdpTransport,
	M: McTransport,
	T: RetryTimer,
	S: DownstreamSink,
{
	/// Open a new request. Establishes the unicast transport to
	/// `(uri.host, uri.port or default)`; for [`Mode::Mtftp`],
	/// additionally joins the configured multicast group on
	/// `mc_transport`. Arms the timer to fire immediately.
	pub fn open(
		sink: S,
		uri: TftpUri,
		mode: Mode,
		mut transport: U,
		mut mc_transport: Option<M>,
		mut timer: T,
		cfg: EngineConfig,
	) -> Result<Self, TftpError> {
		if uri.host.is_empty() {
			return Err(TftpError::InvalidArg("uri must have a host and a path"));
		}

		// Resolved once up front rather than re-parsed on every
		// retransmit (see `resolve_host`).
		let host_addr = resolve_host(&uri.host)?;

		let flags = match mode {
			Mode::Tftp => RequestFlags::RRQ_SIZES,
			Mode::Tftm => RequestFlags::RRQ_SIZES | RequestFlags::RRQ_MULTICAST,
			Mode::Mtftp => RequestFlags::MTFTP_RECOVERY,
		};

		let port = uri.port_or_default();

		match mode {
			// MTFTP's group/port is known up front (process-wide config);
			// join immediately so DATA can arrive before any unicast reply.
			Mode::Mtftp => {
				if let Some(mc) = mc_transport.as_mut() {
					mc.join_multicast(cfg.default_mc_group.0)
						.map_err(transport_err_to_tftp)?;
				}
			}
			// TFTM's group/port is server-assigned via the OACK `multicast`
			// option (spec §4.4); keep the slot so `rejoin_multicast` can
			// bind and join once that option is processed.
			Mode::Tftm => {}
			// Plain TFTP never uses multicast.
			Mode::Tftp => mc_transport = None,
		}

		timer.start();

		// Spec §3 invariant: `bitmap.len() >= ceil(filesize / blksize) + 1`
		// must hold at all times, including before any DATA has arrived.
		// At `filesize == 0` that's 1 bit — otherwise a genuinely empty
		// file's single trailing zero-length block has nowhere to land,
		// since `presize(0)` is a no-op once `filesize` is already 0.
		let mut bitmap = BlockBitmap::new();
		bitmap.resize(1);

		// spec §6: a sink may report a preferred write granularity via
		// `window()`; a nonzero value overrides the configured default
		// blksize we're about to propose in the RRQ. `0` means "no
		// preference", the common case for a plain file sink.
		let blksize = match sink.window() {
			0 => cfg.default_blksize,
			w => (w.min(MAX_BLOCK_SIZE as usize).max(MIN_BLOCK_SIZE as usize)) as u16,
		};

		let mut req = Self {
			uri,
			host_addr,
			port,
			peer: None,
			blksize,
			tsize: 0,
			filesize: 0,
			flags,
			mtftp_timeouts: 0,
			bitmap,
			done: false,
			transport,
			mc_transport,
			timer,
			sink,
		};

		req.send_rrq()?;
		Ok(req)
	}

	/// Downstream-initiated close.
	pub fn close(&mut self, reason: Result<(), TftpError>) {
		self.done_with(reason);
	}

	pub fn is_done(&self) -> bool {
		self.done
	}

	/// Direct access to the retry timer, for callers that need to poll
	/// a concrete timer type's own exhaustion bookkeeping (e.g. the
	/// demo binary's [`crate::timer::BackoffTimer::poll_expired_fail`])
	/// before deciding what `fail` value to pass to
	/// [`Self::on_timer_expired`].
	pub fn timer_mut(&mut self) -> &mut T {
		&mut self.timer
	}

	/// Drain any datagrams currently queued on the unicast transport,
	/// and (if open) the multicast transport, dispatching each into
	/// [`Self::on_packet`]. A convenience wrapper for callers driving a
	/// simple poll loop (spec §5: the engine itself never blocks;
	/// *something* still has to ask the sockets for data).
	pub fn poll_transports(&mut self, buf: &mut [u8]) {
		while let Some((data, from)) = Self::try_recv(&mut self.transport, buf, "unicast") {
			self.on_packet(&data, from, false);
		}

		if self.mc_transport.is_some() {
			loop {
				let received = {
					let mc = self.mc_transport.as_mut().expect("checked above");
					Self::try_recv(mc, buf, "multicast")
				};
				match received {
					Some((data, from)) => self.on_packet(&data, from, true),
					None => break,
				}
			}
		}
	}

	fn try_recv(transport: &mut impl UdpTransport, buf: &mut [u8], label: &str) -> Option<(Vec<u8>, SocketAddr)> {
		match transport.recv_from(buf) {
			Ok((n, from)) => Some((buf[..n].to_vec(), from)),
			Err(e) if e.is_would_block() => None,
			Err(e) => {
				log::debug!("{label} transport error: {e}");
				None
			}
		}
	}

	// ------------------------------------------------------------------
	// Packet reception
	// ------------------------------------------------------------------

	/// Deliver a datagram received on either socket. `via_multicast`
	/// distinguishes the two dispatcher identities of spec §4.6 and
	/// §4.1's "unicast arrival sets SEND_ACK" rule; `from` is the
	/// packet's source address for the peer filter.
	pub fn on_packet(&mut self, buf: &[u8], from: SocketAddr, via_multicast: bool) {
		if self.done {
			return;
		}

		if let Some(peer) = self.peer {
			if from != peer {
				log::debug!("dropping packet from unexpected peer {from}");
				return;
			}
		}

		if !via_multicast {
			self.flags.insert(RequestFlags::SEND_ACK);
		}

		let pkt = match packet::decode(buf) {
			Ok(pkt) => pkt,
			// An unrecognised opcode from our own peer is the only soft
			// case (spec §4.1: "any other opcode -> dropped, not
			// fatal"). Every other decode failure is a short or
			// otherwise malformed packet for an opcode we do recognise,
			// which spec §8's "per-packet hard errors" terminates via
			// `done_with` rather than silently dropping.
			Err(e @ PacketError::UnknownOpcode) => {
				log::debug!("dropping packet with unknown opcode: {e}");
				return;
			}
			Err(e) => {
				log::warn!("terminating on malformed packet: {e}");
				return self.done_with(Err(TftpError::BadPacket(e)));
			}
		};

		if self.peer.is_none() {
			self.peer = Some(from);
		}

		match pkt {
			Packet::Oack(oack) => self.on_oack(oack.options()),
			Packet::Data(data) => self.on_data(data.block16(), data.payload()),
			Packet::Error(err) => {
				let code = ServerErrorCode(err.code());
				log::warn!("server ERROR {}: {}", code, err.message());
				self.done_with(Err(code.to_tftp_error()));
			}
			Packet::Other => log::debug!("dropping unexpected opcode from peer"),
		}
	}

	fn on_oack(&mut self, pairs: packet::OackOptionsIter<'_>) {
		let parsed = match crate::options::parse_oack_options(pairs) {
			Ok(p) => p,
			Err(e) => {
				log::warn!("fatal option error: {e}");
				return self.done_with(Err(e.into()));
			}
		};

		for opt in parsed {
			match opt {
				ParsedOption::Blksize(size) => {
					// spec §4.4: no upper-bound check here — the server
					// is trusted to echo back a value <= what the client
					// proposed. (The >= 512 floor belongs to the global
					// `set-request-blksize` config setter, not here.)
					self.blksize = size;
				}
				ParsedOption::Tsize(size) => self.tsize = size,
				ParsedOption::Multicast(mc) => {
					if !mc.is_master {
						self.flags.remove(RequestFlags::SEND_ACK);
					}
					if let Some((addr, port)) = mc.group {
						if let Err(e) = self.rejoin_multicast(addr, port) {
							log::warn!("failed to (re)join multicast group: {e}");
						}
					}
				}
			}
		}

		if self.tsize > 0 {
			self.presize(self.tsize);
		}

		if let Err(e) = self.send_next_logical_packet() {
			self.done_with(Err(e));
		}
	}

	fn on_data(&mut self, block16: u16, payload: &[u8]) {
		if payload.len() > self.blksize as usize {
			return self.done_with(Err(TftpError::BadPacket(PacketError::Overlength)));
		}

		let g = self.bitmap.first_gap();
		if block16 == 0 && g == 0 {
			// Block 0 doesn't exist (blocks are 1-indexed); a server
			// that sends it before we've placed any block is malformed,
			// not a benign reordering, and terminates the request the
			// same way an overlength DATA does above.
			return self.done_with(Err(TftpError::BadPacket(PacketError::Malformed)));
		}

		let block = reconstruct_block(g, block16);
		let offset = block as u64 * self.blksize as u64;

		self.presize(offset + payload.len() as u64);

		if !self.bitmap.is_set(block) {
			if let Err(e) = self.sink.write(offset, payload) {
				log::warn!("downstream sink rejected write: {e}");
				return self.done_with(Err(TftpError::OutOfMemory));
			}
			self.bitmap.set(block);
		}

		if self.flags.contains(RequestFlags::SEND_ACK) {
			let next = self.bitmap.first_gap();
			if let Err(e) = self.send_ack(next as u16) {
				return self.done_with(Err(e));
			}
		}

		self.timer.start_at_floor();

		if self.bitmap.full() {
			self.done_with(Ok(()));
		}
	}

	// ------------------------------------------------------------------
	// Timer expiry (spec §4.5)
	// ------------------------------------------------------------------

	pub fn on_timer_expired(&mut self, fail: bool) {
		if self.done {
			return;
		}

		if !self.flags.contains(RequestFlags::MTFTP_RECOVERY) {
			if fail {
				return self.done_with(Err(TftpError::Timeout));
			}
			if let Err(e) = self.send_current_logical_packet() {
				self.done_with(Err(e));
			}
			return;
		}

		// MTFTP_RECOVERY
		if self.peer.is_some() {
			if let Err(e) = self.transport.reopen(None) {
				log::warn!("failed to reopen unicast socket for MTFTP retry: {e}");
			}
			self.peer = None;
			self.flags.remove(RequestFlags::SEND_ACK);
			if let Err(e) = self.send_current_logical_packet() {
				self.done_with(Err(e));
			}
			return;
		}

		self.mtftp_timeouts += 1;
		if self.mtftp_timeouts > MTFTP_MAX_TIMEOUTS {
			debug_assert!(
				self.bitmap.none_set(),
				"MTFTP fallback must only occur before any DATA has been delivered"
			);
			self.flags = RequestFlags::RRQ_SIZES;
			if let Some(mc) = self.mc_transport.as_mut() {
				let _ = mc.leave_multicast(crate::config::current().default_mc_group.0);
			}
			self.mc_transport = None;
			self.bitmap.discard();
			self.bitmap.resize(1);
			self.port = TFTP_PORT;
			if let Err(e) = self.transport.reopen(None) {
				log::warn!("failed to reopen unicast socket for TFTP fallback: {e}");
			}
			self.timer.start_at_floor();
		}

		if let Err(e) = self.send_current_logical_packet() {
			self.done_with(Err(e));
		}
	}

	// ------------------------------------------------------------------
	// Sizer (spec §4.3)
	// ------------------------------------------------------------------

	fn presize(&mut self, f: u64) {
		if f <= self.filesize {
			return;
		}
		self.filesize = f;
		self.sink.set_size(f);
		let blocks = (f / self.blksize as u64) as usize + 1;
		self.bitmap.resize(blocks);
	}

	// ------------------------------------------------------------------
	// Transmit helpers
	// ------------------------------------------------------------------

	fn send_rrq(&mut self) -> Result<(), TftpError> {
		let opts = RrqOptions {
			sizes: self
				.flags
				.contains(RequestFlags::RRQ_SIZES)
				.then_some((self.blksize, 0)),
			multicast: self.flags.contains(RequestFlags::RRQ_MULTICAST),
		};
		let buf = packet::encode_rrq(self.uri.rrq_filename(), opts);
		self.send_to_peer_or_host(&buf)
	}

	fn send_ack(&mut self, block16: u16) -> Result<(), TftpError> {
		let buf = packet::encode_ack(block16);
		self.send_to_peer_or_host(&buf)
	}

	/// Resend whichever packet is "current" for the present state:
	/// RRQ if `peer` is still unset, ACK if `peer` is set and
	/// `SEND_ACK`, otherwise nothing (spec §4.1/§4.5).
	fn send_current_logical_packet(&mut self) -> Result<(), TftpError> {
		if self.peer.is_none() {
			self.send_rrq()
		} else if self.flags.contains(RequestFlags::SEND_ACK) {
			let next = self.bitmap.first_gap();
			self.send_ack(next as u16)
		} else {
			Ok(())
		}
	}

	/// Send the packet that follows option negotiation: same logic as
	/// [`Self::send_current_logical_packet`], used after an OACK.
	fn send_next_logical_packet(&mut self) -> Result<(), TftpError> {
		self.send_current_logical_packet()
	}

	fn send_to_peer_or_host(&mut self, buf: &[u8]) -> Result<(), TftpError> {
		let to = self.peer.unwrap_or(SocketAddr::new(self.host_addr, self.port));
		self.transport.send_to(buf, to).map_err(transport_err_to_tftp)?;
		self.timer.start();
		Ok(())
	}

	/// Per spec §4.4: a `multicast` option carrying a non-empty
	/// addr/port (re)opens the multicast socket bound to that group.
	fn rejoin_multicast(&mut self, addr: Ipv4Addr, port: u16) -> Result<(), TftpError> {
		if let Some(mc) = self.mc_transport.as_mut() {
			let bind = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
			mc.reopen(Some(bind)).map_err(transport_err_to_tftp)?;
			mc.join_multicast(addr).map_err(transport_err_to_tftp)?;
		}
		Ok(())
	}

	/// Terminal transition (spec §3 lifecycle / §5 cancellation). Stops
	/// the timer and closes the downstream sink with `status`; `done`
	/// additionally short-circuits every public entry point above so no
	/// further side effects occur (spec §8). Unlike the source's
	/// reference-counted `tftp_request`, which must explicitly `close()`
	/// and then "nullify" each socket adapter to guard against
	/// late-arriving callbacks touching a half-freed request, this
	/// engine's transports are owned outright by `Request` — they are
	/// closed implicitly (`Drop`) once the caller drops the `Request`
	/// after observing `is_done()`, and the `done` flag alone is enough
	/// to make every callback a no-op in the meantime.
	fn done_with(&mut self, status: Result<(), TftpError>) {
		if self.done {
			return;
		}
		self.done = true;
		self.timer.stop();
		self.sink.close(status);
	}
}

/// Reconstruct the full block index from the wire's 16-bit field,
/// given the bitmap's first unreceived index `g`. Ported verbatim from
/// gPXE's `tftp_rx_data`: round `g + 1` down to a 64K boundary, then
/// add the wire offset.
fn reconstruct_block(g: usize, b16: u16) -> usize {
	let base = ((g + 1) & !0xFFFF) as i64;
	let block = base + (b16 as i64 - 1);
	block.max(0) as usize
}

/// Resolve a URI host to a concrete address: a dotted-quad parses
/// directly. gPXE's own `tftp_open` never resolves hostnames either —
/// PXE/DHCP environments hand the client a `next-server` IPv4 literal
/// (see [`crate::config::apply_next_server`]), never a DNS name — so a
/// non-numeric host is rejected up front rather than silently sent to
/// a wrong or unspecified address.
fn resolve_host(host: &str) -> Result<std::net::IpAddr, TftpError> {
	host.parse()
		.map_err(|_| TftpError::InvalidArg("uri host must be a numeric IPv4/IPv6 address"))
}

fn transport_err_to_tftp(e: TransportError) -> TftpError {
	match e {
		TransportError::WouldBlock => TftpError::InvalidArg("transport has no data queued"),
		TransportError::Io(_) => TftpError::OutOfMemory,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sink::SinkError;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[derive(Default)]
	struct FakeTransportInner {
		sent: Vec<Vec<u8>>,
		reopened: u32,
		joined: Vec<Ipv4Addr>,
	}

	#[derive(Clone, Default)]
	struct FakeTransport(Rc<RefCell<FakeTransportInner>>);

	impl UdpTransport for FakeTransport {
		fn send_to(&mut self, buf: &[u8], _to: SocketAddr) -> Result<(), TransportError> {
			self.0.borrow_mut().sent.push(buf.to_vec());
			Ok(())
		}
		fn recv_from(&mut self, _buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
			Err(TransportError::WouldBlock)
		}
		fn local_addr(&self) -> Result<SocketAddr, TransportError> {
			Ok("0.0.0.0:0".parse().unwrap())
		}
		fn reopen(&mut self, _local: Option<SocketAddr>) -> Result<(), TransportError> {
			self.0.borrow_mut().reopened += 1;
			Ok(())
		}
	}

	impl McTransport for FakeTransport {
		fn join_multicast(&mut self, group: Ipv4Addr) -> Result<(), TransportError> {
			self.0.borrow_mut().joined.push(group);
			Ok(())
		}
		fn leave_multicast(&mut self, _group: Ipv4Addr) -> Result<(), TransportError> {
			Ok(())
		}
	}

	#[derive(Default)]
	struct FakeTimer {
		started: u32,
		stopped: bool,
	}

	impl RetryTimer for FakeTimer {
		fn start(&mut self) {
			self.started += 1;
		}
		fn start_at_floor(&mut self) {
			self.started += 1;
		}
		fn stop(&mut self) {
			self.stopped = true;
		}
		fn poll_expired(&mut self) -> bool {
			false
		}
	}

	#[derive(Default)]
	struct FakeSink {
		writes: Vec<(u64, Vec<u8>)>,
		size: Option<u64>,
		closed: Option<Result<(), TftpError>>,
		window: usize,
	}

	impl DownstreamSink for FakeSink {
		fn set_size(&mut self, bytes: u64) {
			self.size = Some(bytes);
		}
		fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), SinkError> {
			self.writes.push((offset, bytes.to_vec()));
			Ok(())
		}
		fn close(&mut self, status: Result<(), TftpError>) {
			self.closed = Some(status);
		}
		fn window(&self) -> usize {
			self.window
		}
	}

	fn test_uri() -> TftpUri {
		TftpUri::parse("tftp://127.0.0.1/boot.bin").unwrap()
	}

	fn open_plain(
	) -> Request<FakeTransport, FakeTransport, FakeTimer, FakeSink> {
		Request::open(
			FakeSink::default(),
			test_uri(),
			Mode::Tftp,
			FakeTransport::default(),
			None,
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap()
	}

	#[test]
	fn open_rejects_non_numeric_host() {
		let err = Request::open(
			FakeSink::default(),
			TftpUri::parse("tftp://boot-server.example/boot.bin").unwrap(),
			Mode::Tftp,
			FakeTransport::default(),
			None,
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap_err();
		assert_eq!(err, TftpError::InvalidArg("uri host must be a numeric IPv4/IPv6 address"));
	}

	#[test]
	fn open_sends_rrq_with_size_options() {
		let req = open_plain();
		let sent = &req.transport.0.borrow().sent;
		assert_eq!(sent.len(), 1);
		let s = String::from_utf8_lossy(&sent[0]);
		assert!(s.contains("blksize\0512\0"));
	}

	#[test]
	fn sink_window_overrides_default_proposed_blksize() {
		let sink = FakeSink {
			window: 1400,
			..Default::default()
		};
		let req = Request::open(
			sink,
			test_uri(),
			Mode::Tftp,
			FakeTransport::default(),
			None,
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap();
		assert_eq!(req.blksize, 1400);
		let sent = &req.transport.0.borrow().sent;
		let s = String::from_utf8_lossy(&sent[0]);
		assert!(s.contains("blksize\01400\0"));
	}

	#[test]
	fn sink_window_is_clamped_to_legal_blksize_range() {
		let sink = FakeSink {
			window: 4,
			..Default::default()
		};
		let req = Request::open(
			sink,
			test_uri(),
			Mode::Tftp,
			FakeTransport::default(),
			None,
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap();
		assert_eq!(req.blksize, MIN_BLOCK_SIZE);
	}

	/// spec.md §4.3 "16-bit Wraparound": once more than 65535 blocks
	/// have been received, the wire's 16-bit block field cycles back
	/// through 0; `reconstruct_block` must recover the true absolute
	/// block index from the low 16 bits plus where the bitmap's first
	/// gap currently sits.
	#[test]
	fn reconstruct_block_handles_16_bit_wraparound() {
		let mut bm = BlockBitmap::new();
		bm.resize(65537);
		for i in 0..65536 {
			bm.set(i);
		}
		let g = bm.first_gap();
		assert_eq!(g, 65536, "every block up to the wraparound must be marked received");
		assert_eq!(reconstruct_block(g, 1), 65536);
	}

	#[test]
	fn plain_transfer_completes_and_acks_each_block() {
		let mut req = open_plain();
		let server: SocketAddr = "10.0.0.1:12345".parse().unwrap();

		let mut data1 = vec![0, 3, 0, 1];
		data1.extend(vec![b'a'; 512]);
		req.on_packet(&data1, server, false);
		assert!(!req.is_done());

		let mut data2 = vec![0, 3, 0, 2];
		data2.extend(vec![b'b'; 200]);
		req.on_packet(&data2, server, false);

		assert!(req.is_done());
		assert_eq!(req.sink.closed, Some(Ok(())));
		assert_eq!(req.sink.writes[0].1.len(), 512);
		assert_eq!(req.sink.writes[1].1.len(), 200);
	}

	#[test]
	fn out_of_order_data_is_placed_correctly() {
		let mut req = open_plain();
		req.blksize = 10;
		let server: SocketAddr = "10.0.0.1:12345".parse().unwrap();

		let mk = |block: u16, payload: &[u8]| {
			let mut b = vec![0, 3];
			b.extend_from_slice(&block.to_be_bytes());
			b.extend_from_slice(payload);
			b
		};

		req.on_packet(&mk(1, &[1; 10]), server, false);
		req.on_packet(&mk(3, &[3; 10]), server, false);
		req.on_packet(&mk(2, &[2; 10]), server, false);
		req.on_packet(&mk(4, &[]), server, false);

		assert!(req.is_done());
		let offsets: Vec<u64> = req.sink.writes.iter().map(|(o, _)| *o).collect();
		assert_eq!(offsets, vec![0, 20, 10, 30]);
	}

	#[test]
	fn peer_filter_drops_foreign_packets() {
		let mut req = open_plain();
		let server: SocketAddr = "10.0.0.1:12345".parse().unwrap();
		let stranger: SocketAddr = "10.0.0.2:9".parse().unwrap();

		let mut data1 = vec![0, 3, 0, 1];
		data1.extend(vec![b'a'; 512]);
		req.on_packet(&data1, server, false);

		let mut fake = vec![0, 3, 0, 2];
		fake.extend(vec![b'z'; 200]);
		req.on_packet(&fake, stranger, false);

		assert!(!req.is_done());
		assert_eq!(req.sink.writes.len(), 1);
	}

	#[test]
	fn server_error_maps_to_not_found() {
		let mut req = open_plain();
		let server: SocketAddr = "10.0.0.1:12345".parse().unwrap();
		let mut err = vec![0, 5, 0, 1];
		err.extend_from_slice(b"no such file\0");
		req.on_packet(&err, server, false);

		assert!(req.is_done());
		assert_eq!(req.sink.closed, Some(Err(TftpError::NotFound)));
	}

	#[test]
	fn mtftp_falls_back_after_max_timeouts() {
		let mut req = Request::open(
			FakeSink::default(),
			TftpUri::parse("mtftp://192.0.2.1/file").unwrap(),
			Mode::Mtftp,
			FakeTransport::default(),
			Some(FakeTransport::default()),
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap();

		assert!(req.flags.contains(RequestFlags::MTFTP_RECOVERY));

		for _ in 0..MTFTP_MAX_TIMEOUTS {
			req.on_timer_expired(false);
			assert!(!req.is_done());
		}
		req.on_timer_expired(false);

		assert!(!req.is_done());
		assert_eq!(req.flags, RequestFlags::RRQ_SIZES);
		assert_eq!(req.port, TFTP_PORT);
		assert!(req.bitmap.none_set());
	}

	#[test]
	fn tftm_non_master_clears_send_ack() {
		let mc = FakeTransport::default();
		let mut req = Request::open(
			FakeSink::default(),
			TftpUri::parse("tftm://192.0.2.1/file").unwrap(),
			Mode::Tftm,
			FakeTransport::default(),
			Some(mc.clone()),
			FakeTimer::default(),
			EngineConfig::default(),
		)
		.unwrap();

		let server: SocketAddr = "10.0.0.1:12345".parse().unwrap();
		let mut oack = vec![0, 6];
		oack.extend_from_slice(b"multicast\0239.1.1.1,3001,0\0");
		req.on_packet(&oack, server, false);

		assert!(!req.flags.contains(RequestFlags::SEND_ACK));
		assert_eq!(mc.0.borrow().joined, vec![Ipv4Addr::new(239, 1, 1, 1)]);
	}

}
