//! Demo CLI: download a single file via `tftp://`/`tftm://`/`mtftp://`
//! and write it to disk.
//!
//! Thin glue over [`tftp_client_core::request::Request`] — wires a
//! real blocking-with-timeout `UdpSocket` transport, a wall-clock
//! backoff timer and a file sink into the engine and drives its
//! poll loop, in the spirit of `jonasjelonek-tftp/src/main.rs` +
//! `cli.rs` (clap parsing, `simple_logger` init, `ctrlc` SIGINT
//! handling via a `CancellationToken`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use tftp_client_core::config::EngineConfig;
use tftp_client_core::request::{Mode, Request};
use tftp_client_core::sink::FileSink;
use tftp_client_core::timer::BackoffTimer;
use tftp_client_core::transport::StdUdpTransport;
use tftp_client_core::uri::{Scheme, TftpUri};

/// Download a file over TFTP, TFTM or MTFTP.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Options {
	/// Source URI: tftp://host[:port]/path, tftm://..., or mtftp://...
	uri: String,

	/// Where to write the downloaded file. Defaults to the URI's
	/// basename in the current directory.
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Enable debug-level logging.
	#[arg(short, long)]
	debug: bool,
}

fn init_logger(debug: bool) {
	let level = if debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
	simple_logger::SimpleLogger::new()
		.with_level(level)
		.init()
		.unwrap_or(());
}

fn default_output_path(uri: &TftpUri) -> PathBuf {
	let name = uri.rrq_filename().rsplit('/').next().unwrap_or("download");
	let name = if name.is_empty() { "download" } else { name };
	PathBuf::from(shellexpand::tilde(name).into_owned())
}

#[tokio::main]
async fn main() {
	let options = Options::parse();
	init_logger(options.debug);

	let uri = match TftpUri::parse(&options.uri) {
		Some(u) => u,
		None => return error!("'{}' is not a valid tftp://, tftm:// or mtftp:// URI", options.uri),
	};

	let mode = match uri.scheme {
		Scheme::Tftp => Mode::Tftp,
		Scheme::Tftm => Mode::Tftm,
		Scheme::Mtftp => Mode::Mtftp,
	};

	let out_path = options.output.unwrap_or_else(|| default_output_path(&uri));
	let sink = match FileSink::create(&out_path) {
		Ok(s) => s,
		Err(e) => return error!("cannot open '{}' for writing: {}", out_path.display(), e),
	};

	let transport = match StdUdpTransport::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))) {
		Ok(t) => t,
		Err(e) => return error!("cannot open unicast socket: {}", e),
	};

	// TFTM needs the multicast slot too, even though the group/port is
	// only learned once the server's OACK arrives (spec §4.4): bind an
	// ephemeral socket now, and `Request` rebinds it in place on `reopen`.
	let mc_transport = match mode {
		Mode::Mtftp => {
			let cfg = EngineConfig::default();
			match StdUdpTransport::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, cfg.default_mc_group.1))) {
				Ok(t) => Some(t),
				Err(e) => return error!("cannot open multicast socket: {}", e),
			}
		}
		Mode::Tftm => match StdUdpTransport::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))) {
			Ok(t) => Some(t),
			Err(e) => return error!("cannot open multicast socket: {}", e),
		},
		Mode::Tftp => None,
	};

	let timer = BackoffTimer::new(
		Duration::from_secs(1),
		Duration::from_secs(8),
		tftp_client_core::consts::DEFAULT_RETRANSMIT_TRIES,
	);

	let mut request = match Request::open(sink, uri, mode, transport, mc_transport, timer, EngineConfig::default()) {
		Ok(r) => r,
		Err(e) => return error!("failed to open request: {}", e),
	};

	let cancel_token = CancellationToken::new();
	let sigint_token = cancel_token.clone();
	if let Err(e) = ctrlc::set_handler(move || {
		info!("received SIGINT, aborting download");
		sigint_token.cancel();
	}) {
		warn!("failed to install SIGINT handler: {}", e);
	}

	info!("downloading {} -> {}", options.uri, out_path.display());

	let mut buf = vec![0u8; 65535];
	while !request.is_done() {
		if cancel_token.is_cancelled() {
			request.close(Err(tftp_client_core::error::TftpError::InvalidArg("aborted by user")));
			break;
		}

		poll_once(&mut request, &mut buf);
		std::thread::sleep(Duration::from_millis(20));
	}

	if request.is_done() {
		info!("done");
	}
}

/// One iteration of the non-blocking poll loop: drain anything queued
/// on either socket, then check the retransmit timer. Matches the
/// "no suspension points within a component" scheduling model of
/// spec §5 — the engine itself never blocks, only this outer loop does.
fn poll_once(
	request: &mut Request<StdUdpTransport, StdUdpTransport, BackoffTimer, FileSink>,
	buf: &mut [u8],
) {
	request.poll_transports(buf);
	if let Some(fail) = request.timer_mut().poll_expired_fail() {
		request.on_timer_expired(fail);
	}
}
