//! Thin wrapper over the OS readiness facility.
//!
//! The engine only needs five verbs: create, register, deregister,
//! reregister (the recovery path), and a bounded wait. Keeping them behind
//! one type keeps the platform-specific surface in a single file.

use std::io;
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

pub struct Poller {
    poll: Poll,
    events: Events,
}

impl Poller {
    /// `capacity` bounds how many ready sockets a single wait can report;
    /// the rest are reported by later waits.
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
        })
    }

    /// Watch a connection for read and write readiness. Notifications are
    /// edge-style: one report per readiness transition.
    pub fn register(&self, stream: &mut TcpStream, token: Token) -> io::Result<()> {
        self.poll
            .registry()
            .register(stream, token, Interest::READABLE | Interest::WRITABLE)
    }

    pub fn deregister(&self, stream: &mut TcpStream) -> io::Result<()> {
        self.poll.registry().deregister(stream)
    }

    /// Recovery path when deregistration fails: re-point the existing
    /// registration so the descriptor is left in a known state.
    pub fn reregister(&self, stream: &mut TcpStream, token: Token) -> io::Result<()> {
        self.poll
            .registry()
            .reregister(stream, token, Interest::READABLE)
    }

    /// Wait up to `timeout` for readiness and return the ready tokens.
    /// An interrupted wait reports zero events rather than an error.
    pub fn wait(&mut self, timeout: Duration) -> io::Result<Vec<Token>> {
        self.events.clear();
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
        Ok(self.events.iter().map(|event| event.token()).collect())
    }
}
