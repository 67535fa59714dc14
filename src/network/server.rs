//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::index::HashIndex;
use crate::protocol::{SessionContext, SessionSettings};

use super::activity::{ActivityTracker, IdleWatchdog};
use super::connection::{Connection, ConnectionOptions};

/// Pause after an accept error such as running out of descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How often the idle watchdog looks at the activity tracker
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Limit on the loopback connect that wakes a blocked accept
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Cloneable request to stop the accept loop
///
/// Handles taken from a `Server` also wake its blocked `accept` with a
/// throwaway loopback connection.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: Option<SocketAddr>,
}

impl ShutdownHandle {
    fn waking(addr: SocketAddr) -> Self {
        Self {
            flag: Arc::default(),
            wake_addr: Some(addr),
        }
    }

    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(addr) = self.wake_addr {
            if let Err(e) = TcpStream::connect_timeout(&addr, WAKE_TIMEOUT) {
                tracing::debug!("Couldn't wake acceptor on {}: {}", addr, e);
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Loopback equivalent of a wildcard bind address
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// TCP server for hashsetd
pub struct Server {
    config: Config,
    listener: TcpListener,

    /// Index, settings and load source handed to every session
    context: Arc<SessionContext>,

    options: ConnectionOptions,
    activity: Arc<ActivityTracker>,
    shutdown: ShutdownHandle,
    next_connection_id: AtomicU64,
}

impl Server {
    /// Bind the listener for an already loaded index
    pub fn bind(config: Config, index: Arc<HashIndex>) -> Result<Self> {
        let context = SessionContext::new(index, SessionSettings::from(&config));
        Self::with_context(config, Arc::new(context))
    }

    /// Bind the listener with an explicit session context
    pub fn with_context(config: Config, context: Arc<SessionContext>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            tracing::error!("Couldn't bind to {}: {}", config.listen_addr, e);
            e
        })?;
        let shutdown = ShutdownHandle::waking(wake_addr(listener.local_addr()?));

        Ok(Self {
            options: ConnectionOptions::from(&config),
            config,
            listener,
            context,
            activity: Arc::new(ActivityTracker::new()),
            shutdown,
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Live session bookkeeping shared with the workers
    pub fn activity(&self) -> Arc<ActivityTracker> {
        Arc::clone(&self.activity)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Start the server (blocking until shutdown is requested)
    ///
    /// Connection threads still running at that point finish on their own.
    pub fn run(&self) -> Result<()> {
        let watchdog = match self.config.idle_shutdown {
            Some(threshold) => Some(IdleWatchdog::spawn(
                Arc::clone(&self.activity),
                threshold,
                IDLE_CHECK_INTERVAL.min(threshold),
                self.shutdown.clone(),
            )?),
            None => None,
        };

        tracing::info!("Ready for clients on {}", self.local_addr()?);

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                // The wake-up connection from `ShutdownHandle` lands here too
                Ok(_) if self.shutdown.is_shutdown() => break,
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Dropped a connection: {}", e);
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }

        if let Some(watchdog) = watchdog {
            watchdog.stop();
        }

        tracing::info!("Stopped accepting clients");
        Ok(())
    }

    /// Hand an accepted socket to a fresh worker thread
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        tracing::info!("Accepted a client: {}", peer);

        let guard = self.activity.begin_session();
        let context = Arc::clone(&self.context);
        let options = self.options;
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                match Connection::new(stream, context, options) {
                    Ok(connection) => connection.handle(),
                    Err(e) => tracing::warn!("Couldn't set up connection from {}: {}", peer, e),
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Couldn't spawn worker for {}: {}", peer, e);
        }
    }
}
