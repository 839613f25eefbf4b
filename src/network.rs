//! Low-level HTTP transport over non-blocking sockets.
//!
//! Connects are blocking with a timeout; once established the socket is
//! flipped to non-blocking and handed to the readiness loop. Requests are
//! HTTP/1.0 with `Connection: close`, so a response is simply everything the
//! peer sends before closing.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream as StdTcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use mio::net::TcpStream;
use thiserror::Error;

use crate::config::{Config, Tuning};
use crate::urls::PageUrl;

/// Errors that can occur while fetching one page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("host resolution failed for {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("no usable address for host {0}")]
    NoAddress(String),

    #[error("connect to {addr} failed: {source}")]
    Connect { addr: SocketAddr, source: io::Error },

    #[error("failed to set socket non-blocking: {0}")]
    Nonblocking(io::Error),

    #[error("request send failed: {0}")]
    Send(io::Error),

    #[error("request send stalled after {0} attempts")]
    SendStalled(u32),

    #[error("response read failed: {0}")]
    Read(io::Error),

    #[error("no response bytes before the read budget expired")]
    ReadStalled,

    #[error("peer closed the connection without sending any bytes")]
    EmptyResponse,

    #[error("response too large: {size} bytes (max: {max} bytes)")]
    ResponseTooLarge { size: usize, max: usize },
}

/// Resolve a host once; every connection in the run reuses the address.
pub fn resolve_host(host: &str, port: u16) -> Result<SocketAddr, FetchError> {
    let mut addrs = (host, port).to_socket_addrs().map_err(|source| FetchError::Resolve {
        host: host.to_string(),
        source,
    })?;
    addrs.next().ok_or_else(|| FetchError::NoAddress(host.to_string()))
}

/// Blocking connect with a bounded timeout. Retrying is the caller's call.
pub fn connect(addr: &SocketAddr, timeout: Duration) -> Result<StdTcpStream, FetchError> {
    StdTcpStream::connect_timeout(addr, timeout).map_err(|source| FetchError::Connect {
        addr: *addr,
        source,
    })
}

/// Flip an established socket to non-blocking and wrap it for registration.
pub fn into_nonblocking(stream: StdTcpStream) -> Result<TcpStream, FetchError> {
    stream.set_nonblocking(true).map_err(FetchError::Nonblocking)?;
    Ok(TcpStream::from_std(stream))
}

pub(crate) fn format_request(url: &PageUrl) -> String {
    format!(
        "GET {} HTTP/1.0\r\n\
         Host: {}\r\n\
         User-Agent: {}\r\n\
         Accept: text/html,application/xhtml+xml;q=0.9,*/*;q=0.8\r\n\
         Connection: close\r\n\
         \r\n",
        url.file(),
        url.authority(),
        Config::USER_AGENT,
    )
}

/// Write the GET request for `url`, tolerating a bounded number of
/// would-block stalls on the fresh socket.
pub fn send_request(stream: &mut TcpStream, url: &PageUrl, tuning: &Tuning) -> Result<(), FetchError> {
    let request = format_request(url);
    let bytes = request.as_bytes();
    let mut written = 0;
    let mut stalls = 0;
    while written < bytes.len() {
        match stream.write(&bytes[written..]) {
            Ok(0) => return Err(FetchError::Send(io::ErrorKind::WriteZero.into())),
            Ok(n) => {
                written += n;
                stalls = 0;
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                stalls += 1;
                if stalls > tuning.send_attempts {
                    return Err(FetchError::SendStalled(tuning.send_attempts));
                }
                thread::sleep(tuning.send_retry_delay);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(FetchError::Send(err)),
        }
    }
    Ok(())
}

/// A fully-read HTTP response. `total_bytes` counts headers and body as they
/// arrived on the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: Option<u16>,
    pub body: String,
    pub total_bytes: usize,
}

/// Drain the response until the peer closes.
///
/// Would-block stalls are retried up to the tuning budget. A stall budget
/// spent mid-stream yields whatever arrived; a budget spent (or a close)
/// before any byte arrives is a failed fetch.
pub fn read_response(stream: &mut TcpStream, tuning: &Tuning) -> Result<HttpResponse, FetchError> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut stalls = 0;
    loop {
        match stream.read(&mut chunk) {
            // HTTP/1.0 with Connection: close, so the peer's close ends the response.
            Ok(0) => break,
            Ok(n) => {
                raw.extend_from_slice(&chunk[..n]);
                if raw.len() > tuning.max_response_bytes {
                    return Err(FetchError::ResponseTooLarge {
                        size: raw.len(),
                        max: tuning.max_response_bytes,
                    });
                }
                stalls = 0;
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                stalls += 1;
                if stalls > tuning.read_attempts {
                    if raw.is_empty() {
                        return Err(FetchError::ReadStalled);
                    }
                    break;
                }
                thread::sleep(tuning.read_retry_delay);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(FetchError::Read(err)),
        }
    }
    if raw.is_empty() {
        return Err(FetchError::EmptyResponse);
    }
    Ok(split_response(&raw))
}

/// Split raw wire bytes into status line and body at the header terminator.
/// Bytes with no terminator are treated as a headerless body.
fn split_response(raw: &[u8]) -> HttpResponse {
    let total_bytes = raw.len();
    let (head, body) = match find_header_end(raw) {
        Some(pos) => (&raw[..pos], &raw[pos + 4..]),
        None => (&raw[..0], raw),
    };
    HttpResponse {
        status: parse_status(head),
        body: String::from_utf8_lossy(body).into_owned(),
        total_bytes,
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_status(head: &[u8]) -> Option<u16> {
    let line = head.split(|&b| b == b'\r').next()?;
    let text = std::str::from_utf8(line).ok()?;
    text.split_whitespace().nth(1)?.parse().ok()
}
