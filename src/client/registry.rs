//! Process-wide client registry.
//!
//! Hands out a distinct [`ClientSeq`] to every client and owns the
//! [`DefaultHeaders`] all of its clients share. Sequence numbers are
//! monotonic and never reused, even after a client is dropped.
//!
//! # Lifetime
//!
//! [`ClientRegistry::global`] is created on first use and lives for the rest
//! of the process. Teardown is per client: every [`ClientTicket`] unregisters
//! its client when dropped, which is what [`ClientRegistry::live_clients`]
//! counts.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ClientSeq;
use crate::net::DefaultHeaders;

// ============================================================================
// Statics
// ============================================================================

static GLOBAL: OnceLock<Arc<ClientRegistry>> = OnceLock::new();

// ============================================================================
// ClientRegistry
// ============================================================================

/// Sequence allocator and shared header set.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    issued: AtomicU32,
    live: AtomicU32,
    headers: DefaultHeaders,
}

impl ClientRegistry {
    /// Creates an isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Registers a client and returns its ticket.
    ///
    /// The first client gets sequence number 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] once every sequence number has been issued.
    pub fn register(self: &Arc<Self>) -> Result<ClientTicket> {
        let seq = self
            .issued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .map_err(|_| Error::config("Client sequence numbers exhausted"))?
            + 1;
        let live = self.live.fetch_add(1, Ordering::AcqRel) + 1;

        trace!(seq, live, "Client registered");

        Ok(ClientTicket {
            seq: ClientSeq::new(seq),
            registry: Arc::clone(self),
        })
    }

    /// Returns the number of clients currently alive.
    #[inline]
    #[must_use]
    pub fn live_clients(&self) -> u32 {
        self.live.load(Ordering::Acquire)
    }

    /// Returns the number of sequence numbers handed out so far.
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.issued.load(Ordering::Acquire)
    }

    /// Returns the shared default header set.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }
}

// ============================================================================
// ClientTicket
// ============================================================================

/// Registration of one client. Dropping it unregisters the client.
#[derive(Debug)]
pub struct ClientTicket {
    seq: ClientSeq,
    registry: Arc<ClientRegistry>,
}

impl ClientTicket {
    /// Returns the client's sequence number.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> ClientSeq {
        self.seq
    }

    /// Returns the registry this ticket belongs to.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}

impl Drop for ClientTicket {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::AcqRel);
        trace!(seq = %self.seq, "Client unregistered");
    }
}

// ============================================================================
// Tests
// ============================================================================
