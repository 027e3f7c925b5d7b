//! Collector discovery scan and clock-synchronization handshake.
//!
//! Discovery is a sequential TCP probe: every candidate host on the local
//! subnet is tried in order with a short per-candidate timeout, and the first
//! address that accepts the connection is the collector.  There is no
//! broadcast step; the collector is simply the one machine listening on the
//! stream port.
//!
//! Once connected, [`sync_clock`] runs a fixed number of round trips to
//! estimate the offset between the local clock and the collector's clock.
//! Only the round with the smallest observed RTT contributes: a short round
//! trip bounds the one-way latency tightly, so its midpoint estimate is the
//! most reliable sample.
//!
//! The socket is used synchronously throughout.  The handshake is the only
//! phase in which this side ever reads from the stream.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pose_core::{decode_message, encode_message, CodecError, PoseMessage};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Number of handshake round trips.
pub const SYNC_ROUNDS: usize = 3;

/// Size of the buffer used to receive a handshake reply.  A reply must fit
/// a single read; surplus buffered bytes are a protocol violation.
const RECEIVE_BUFFER_SIZE: usize = 16 * 1024;

/// Errors produced by the discovery scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The configured local address or mask could not be used.
    #[error(transparent)]
    Subnet(#[from] pose_core::SubnetError),

    /// Every candidate was probed and none accepted the connection.  This is
    /// a normal outcome; the caller may retry the whole scan later.
    #[error("no collector found on the subnet after probing {tried} host(s)")]
    NoPeerFound { tried: usize },

    /// Another scan is already running.  Scans are strictly one at a time.
    #[error("a discovery scan is already in progress")]
    ScanInProgress,
}

/// Errors that end a session (or prevent one from starting).
#[derive(Debug, Error)]
pub enum SessionError {
    /// An I/O error on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A wire-format violation.  Trailing bytes after a handshake reply are
    /// fatal: this protocol has no partial-message reassembly.
    #[error("protocol violation: {0}")]
    Protocol(#[from] CodecError),
}

/// An established collector connection plus the negotiated clock offset.
#[derive(Debug)]
pub struct Session {
    pub stream: TcpStream,
    /// The collector's resolved address.
    pub peer: SocketAddr,
    /// Our own endpoint string, stamped into every outgoing message.
    pub local_address: String,
    /// Signed microseconds added to local time to approximate the
    /// collector's clock.  Zero when all sync rounds failed.
    pub clock_offset_us: i64,
}

impl Session {
    /// Shuts the connection down at the transport level and closes it.
    pub fn shutdown(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("socket shutdown: {e}");
        }
    }
}

/// Probes `candidates` in order and returns the first live connection.
///
/// Each probe is a timed connect; failures are logged at debug level and the
/// scan moves on.  The returned stream has `TCP_NODELAY` set: messages are
/// small and latency-sensitive, so send coalescing is disabled.
///
/// # Errors
///
/// Returns [`ScanError::NoPeerFound`] when every candidate is exhausted.
pub fn scan_and_connect(
    candidates: &[Ipv4Addr],
    port: u16,
    connect_timeout: Duration,
) -> Result<(TcpStream, SocketAddr), ScanError> {
    for (i, candidate) in candidates.iter().enumerate() {
        let target = SocketAddr::from((*candidate, port));
        match TcpStream::connect_timeout(&target, connect_timeout) {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("failed to set TCP_NODELAY on {target}: {e}");
                }
                info!("collector found at {target} (candidate {i})");
                return Ok((stream, target));
            }
            Err(e) => {
                debug!("candidate {target} did not answer: {e}");
            }
        }
    }

    Err(ScanError::NoPeerFound {
        tried: candidates.len(),
    })
}

/// One completed handshake round trip.
#[derive(Debug, Clone, Copy)]
struct SyncRound {
    rtt: Duration,
    /// The collector's clock reading carried in the reply.
    peer_timestamp: i64,
    /// Our clock reading at the moment the reply was received.
    local_receipt: i64,
}

impl SyncRound {
    /// Midpoint estimate of the peer-minus-local clock offset for this round.
    fn offset_us(&self) -> i64 {
        self.peer_timestamp + self.rtt.as_micros() as i64 / 2 - self.local_receipt
    }
}

/// Folds completed rounds into the final offset: only the minimum-RTT round
/// contributes, regardless of round order.  Zero when no round completed.
fn best_offset(rounds: &[SyncRound]) -> i64 {
    let mut min_rtt: Option<Duration> = None;
    let mut offset = 0i64;
    for round in rounds {
        if min_rtt.map_or(true, |m| round.rtt < m) {
            min_rtt = Some(round.rtt);
            offset = round.offset_us();
        }
    }
    offset
}

/// Runs the clock-synchronization handshake on a freshly connected stream.
///
/// Performs [`SYNC_ROUNDS`] round trips: each sends a `TimeSync` message with
/// the raw local timestamp and blocks for exactly one reply, bounded by
/// `read_timeout`.  Rounds that fail with an I/O error, a timeout, or a
/// malformed reply are skipped; if every round fails the offset is zero and
/// the session proceeds with unsynchronized timestamps.
///
/// # Errors
///
/// Returns [`SessionError::Protocol`] if a reply leaves trailing bytes after
/// one decoded document (the fail-fast framing contract), and
/// [`SessionError::Io`] if the timeout cannot be configured.
pub fn sync_clock(
    stream: &mut TcpStream,
    local_address: &str,
    read_timeout: Duration,
) -> Result<i64, SessionError> {
    stream.set_read_timeout(Some(read_timeout))?;

    let mut rounds = Vec::with_capacity(SYNC_ROUNDS);
    let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];

    for round in 0..SYNC_ROUNDS {
        match run_sync_round(stream, local_address, &mut buf) {
            Ok(sample) => {
                debug!("sync round {round}: rtt {:?}", sample.rtt);
                rounds.push(sample);
            }
            Err(SessionError::Protocol(e @ CodecError::TrailingBytes { .. })) => {
                // More data than one reply document: the framing contract is
                // broken and nothing downstream can be trusted.
                return Err(SessionError::Protocol(e));
            }
            Err(e) => {
                warn!("sync round {round} failed: {e}");
            }
        }
    }

    // Streaming never reads, so leave the socket without a read timeout.
    stream.set_read_timeout(None)?;

    if rounds.is_empty() {
        warn!("all sync rounds failed; streaming with unsynchronized timestamps");
    }
    let offset = best_offset(&rounds);
    info!("clock offset: {offset} us (from {} round(s))", rounds.len());
    Ok(offset)
}

fn run_sync_round(
    stream: &mut TcpStream,
    local_address: &str,
    buf: &mut [u8],
) -> Result<SyncRound, SessionError> {
    let request = PoseMessage::time_sync(local_address, now_micros());
    let bytes = encode_message(&request)?;

    let started = Instant::now();
    stream.write_all(&bytes)?;

    let n = stream.read(buf)?;
    let rtt = started.elapsed();
    let local_receipt = now_micros();

    if n == 0 {
        return Err(SessionError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "collector closed the connection during handshake",
        )));
    }

    let reply = decode_message(&buf[..n])?;
    Ok(SyncRound {
        rtt,
        peer_timestamp: reply.timestamp(),
        local_receipt,
    })
}

/// Current local time as signed microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
