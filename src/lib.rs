//! Client-side core of a TFTP-family protocol engine: plain TFTP
//! (RFC 1350 + RFC 2347/2348/2349 options), TFTM (RFC 2090), and MTFTP
//! (PXE multicast TFTP). A pure read-only downloader: option
//! negotiation, 16-bit block-number extension, out-of-order block
//! placement via a sparse bitmap, retransmission, and the MTFTP
//! fallback ladder live here; the UDP socket, retry clock, URI parsing
//! and downstream byte sink are external collaborators (see
//! [`transport`], [`timer`], [`sink`]).

pub mod bitmap;
pub mod config;
pub mod consts;
pub mod error;
pub mod options;
pub mod packet;
pub mod request;
pub mod sink;
pub mod timer;
pub mod transport;
pub mod uri;

pub use config::EngineConfig;
pub use error::TftpError;
pub use request::{Mode, Request};
pub use uri::TftpUri;
