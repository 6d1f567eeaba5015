//! Connection reuse.
//!
//! Connections are leased per destination. A clean exchange ends with
//! [`Lease::release`], which parks the connection for the next request;
//! dropping a lease instead closes the connection, which is the right fate
//! after an IO error mid-frame.

use crate::{Address, Error};
use lazy_static::lazy_static;
use std::{collections::HashMap, sync::Arc};
use tokio::{
    net::TcpStream,
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
};

/// Concurrent connections allowed per destination.
const LEASE_LIMIT: usize = 32;

/// Parked idle connections kept per destination; anything beyond this is
/// simply closed on release.
const IDLE_LIMIT: usize = 8;

lazy_static! {
    static ref DEPOTS: Mutex<HashMap<Address, Depot>> = Mutex::new(HashMap::new());
}

struct Depot {
    idle: Vec<TcpStream>,
    leases: Arc<Semaphore>,
}

impl Depot {
    fn new() -> Self {
        Self {
            idle: Vec::new(),
            leases: Arc::new(Semaphore::new(LEASE_LIMIT)),
        }
    }
}

/// One leased connection to one destination.
pub(crate) struct Lease {
    stream: TcpStream,
    addr: Address,
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    /// The connection itself.
    pub(crate) fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Park the connection for reuse by the next lease to the same
    /// destination.
    pub(crate) async fn release(self) {
        let mut depots = DEPOTS.lock().await;
        if let Some(depot) = depots.get_mut(&self.addr) {
            if depot.idle.len() < IDLE_LIMIT {
                log::trace!("Parking connection to {}.", self.addr);
                depot.idle.push(self.stream);
            }
        }
    }
}

/// Lease a connection to `addr`, reusing a parked one when possible.
///
/// Waits when `LEASE_LIMIT` connections to the destination are already out.
pub(crate) async fn lease(addr: Address) -> Result<Lease, Error> {
    let leases = {
        let mut depots = DEPOTS.lock().await;
        depots.entry(addr.clone()).or_insert_with(Depot::new).leases.clone()
    };
    let permit = leases.acquire_owned().await.expect("lease semaphore never closes");

    let parked = {
        let mut depots = DEPOTS.lock().await;
        depots.get_mut(&addr).and_then(|depot| depot.idle.pop())
    };
    let stream = match parked {
        Some(stream) => stream,
        None => TcpStream::connect((addr.host.to_string(), addr.port)).await?,
    };

    Ok(Lease {
        stream,
        addr,
        _permit: permit,
    })
}
