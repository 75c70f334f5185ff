//! Live room session: connect, heartbeat, read loop, dispatch.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──connect──► Connected ──run──► Running
//!    ▲                     ▲  │              │
//!    │                     │  └── close ◄────┤ stop / count reached
//!    └──── close ──────────┴─────────────────┘
//! ```
//!
//! A [`Session`] is `Send + Sync`; every operation takes `&self`. The read
//! loop holds the read half for as long as [`Session::run`] is active, while
//! the heartbeat shares the write half with `connect` and `close` through an
//! async mutex so frames never interleave.
//!
//! # Example
//!
//! ```no_run
//! use blive::{EventType, Session, TokioScheduler};
//!
//! # async fn example() -> blive::Result<()> {
//! let session = Session::builder().room_id(25348832).build()?;
//!
//! session.set_handler(EventType::DanmuMsg, |_, event| {
//!     println!("{}", event.payload);
//! });
//!
//! session.connect(TokioScheduler::shared()).await?;
//! session.run_forever().await?;
//! session.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::inflate::Inflater;
use crate::protocol::message::{AuthReply, AuthRequest, HeartbeatRequest};
use crate::protocol::message::{parse_popularity, popularity_event};
use crate::protocol::{CommandBatch, Event, EventType, Frame, Operation, SubProtocol};
use crate::transport::connection::{FrameWriter, read_frame};
use crate::transport::resolver::{HostCandidate, HostResolver};
use crate::transport::scheduler::{ScheduleHandle, Scheduler, Task};

use super::builder::SessionBuilder;
use super::config::SessionConfig;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback.
///
/// Receives the session that dispatched the event, so handlers may call
/// [`Session::force_stop`] or swap handlers. State is captured by the closure.
pub type Handler = Arc<dyn Fn(&Session, &Event) + Send + Sync>;

/// One optional handler per event type.
type HandlerTable = [Option<Handler>; EventType::COUNT];

// ============================================================================
// Link
// ============================================================================

/// Write-side state shared with scheduled heartbeats.
struct Link {
    /// Write half plus the outbound sequence counter.
    writer: AsyncMutex<FrameWriter<OwnedWriteHalf>>,
    /// Connection generation, bumped on every close.
    epoch: watch::Sender<u64>,
    /// Pending heartbeat.
    heartbeat: Mutex<Option<ScheduleHandle>>,
}

impl Link {
    fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            writer: AsyncMutex::new(FrameWriter::new()),
            epoch,
            heartbeat: Mutex::new(None),
        }
    }

    #[inline]
    fn current_epoch(&self) -> u64 {
        *self.epoch.borrow()
    }

    /// Invalidates heartbeats and wakes a running read loop.
    fn bump_epoch(&self) {
        self.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    fn cancel_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.cancel();
        }
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Everything a scheduled heartbeat needs, detached from the session.
#[derive(Clone)]
struct Heartbeat {
    link: Arc<Link>,
    scheduler: Arc<dyn Scheduler>,
    epoch: u64,
    interval: Duration,
    body: Arc<[u8]>,
}

impl Heartbeat {
    /// Schedules the next beat and stores its handle.
    fn arm(&self) -> Result<()> {
        let handle = self
            .scheduler
            .schedule(self.interval, self.clone().task())
            .map_err(|e| match e {
                Error::Scheduler { .. } => e,
                other => Error::scheduler(other.to_string()),
            })?;

        *self.link.heartbeat.lock() = Some(handle);
        Ok(())
    }

    fn task(self) -> Task {
        Box::pin(async move {
            if self.link.current_epoch() != self.epoch {
                trace!(epoch = self.epoch, "Stale heartbeat skipped");
                return;
            }

            let sent = {
                let mut writer = self.link.writer.lock().await;
                if self.link.current_epoch() != self.epoch {
                    trace!(epoch = self.epoch, "Stale heartbeat skipped");
                    return;
                }
                writer.send(Operation::Heartbeat, &self.body).await
            };

            match sent {
                Ok(sequence) => debug!(sequence, "Heartbeat sent"),
                Err(e) => {
                    warn!(error = %e, "Heartbeat send failed");
                    self.scheduler.report_error(&e);
                    return;
                }
            }

            if let Err(e) = self.arm() {
                warn!(error = %e, "Heartbeat re-arm failed");
                self.scheduler.report_error(&e);
            }
        })
    }
}

// ============================================================================
// StopHandle
// ============================================================================

/// Cloneable handle that stops a running [`Session::run`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: Arc<Notify>,
}

impl StopHandle {
    /// Signals the read loop to return.
    ///
    /// A signal sent while no loop is waiting ends the next one at its
    /// first wait.
    #[inline]
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

// ============================================================================
// Session
// ============================================================================

/// Client session for one live room.
pub struct Session {
    config: SessionConfig,
    resolver: Arc<dyn HostResolver>,
    inflater: Inflater,
    heartbeat_body: Arc<[u8]>,
    link: Arc<Link>,
    reader: AsyncMutex<Option<OwnedReadHalf>>,
    peer: RwLock<Option<SocketAddr>>,
    token: RwLock<Option<String>>,
    hosts: RwLock<Vec<HostCandidate>>,
    popularity: AtomicU32,
    stop: Arc<Notify>,
    handlers: RwLock<HandlerTable>,
}

// ============================================================================
// Session - Display
// ============================================================================

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.config.user_id)
            .field("room_id", &self.config.room_id)
            .field("peer", &self.peer_addr())
            .field("popularity", &self.popularity())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Construction
// ============================================================================

impl Session {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Creates a session for `room_id` using the HTTP resolver.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::build`].
    pub fn new(user_id: u64, room_id: u64) -> Result<Self> {
        Self::builder().user_id(user_id).room_id(room_id).build()
    }

    /// Creates a session from validated settings.
    pub(crate) fn from_parts(config: SessionConfig, resolver: Arc<dyn HostResolver>) -> Result<Self> {
        let heartbeat_body = HeartbeatRequest::new(&config.client_name).to_body()?;

        Ok(Self {
            inflater: config.inflater(),
            heartbeat_body: heartbeat_body.into(),
            config,
            resolver,
            link: Arc::new(Link::new()),
            reader: AsyncMutex::new(None),
            peer: RwLock::new(None),
            token: RwLock::new(None),
            hosts: RwLock::new(Vec::new()),
            popularity: AtomicU32::new(0),
            stop: Arc::new(Notify::new()),
            handlers: RwLock::new(std::array::from_fn(|_| None)),
        })
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the session settings.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the user id sent in the auth request.
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> u64 {
        self.config.user_id
    }

    /// Returns the room id.
    #[inline]
    #[must_use]
    pub fn room_id(&self) -> u64 {
        self.config.room_id
    }

    /// Returns the last popularity value received.
    #[inline]
    #[must_use]
    pub fn popularity(&self) -> u32 {
        self.popularity.load(Ordering::Acquire)
    }

    /// Returns `true` while a live connection is held.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.peer.read().is_some()
    }

    /// Returns the address of the connected push server.
    #[inline]
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        *self.peer.read()
    }

    /// Returns the candidate hosts from the last resolve.
    #[must_use]
    pub fn hosts(&self) -> Vec<HostCandidate> {
        self.hosts.read().clone()
    }

    /// Returns `true` if an auth token is held.
    #[inline]
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Returns the sequence number the next outbound frame will carry.
    pub async fn sequence(&self) -> u32 {
        self.link.writer.lock().await.sequence()
    }

    /// Returns a handle that can stop [`run`](Self::run) from anywhere.
    #[inline]
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }
}

// ============================================================================
// Session - Handlers
// ============================================================================

impl Session {
    /// Registers `handler` for `event_type`, replacing any previous one.
    pub fn set_handler<F>(&self, event_type: EventType, handler: F)
    where
        F: Fn(&Session, &Event) + Send + Sync + 'static,
    {
        self.handlers.write()[event_type.index()] = Some(Arc::new(handler));
        debug!(%event_type, "Handler registered");
    }

    /// Registers `handler` for the event type at a raw table index.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `index` is out of range; the table is
    /// left untouched.
    pub fn set_handler_at<F>(&self, index: usize, handler: F) -> Result<()>
    where
        F: Fn(&Session, &Event) + Send + Sync + 'static,
    {
        let event_type = EventType::from_index(index)?;
        self.set_handler(event_type, handler);
        Ok(())
    }

    /// Removes the handler for `event_type`. Returns `true` if one was set.
    pub fn clear_handler(&self, event_type: EventType) -> bool {
        self.handlers.write()[event_type.index()].take().is_some()
    }

    /// Returns `true` if a handler is registered for `event_type`.
    #[inline]
    #[must_use]
    pub fn has_handler(&self, event_type: EventType) -> bool {
        self.handlers.read()[event_type.index()].is_some()
    }

    /// Invokes the handler for `event`, if any.
    fn dispatch(&self, event: &Event) {
        let handler = self.handlers.read()[event.event_type.index()].clone();
        match handler {
            Some(handler) => handler(self, event),
            None => trace!(event_type = %event.event_type, "No handler, event dropped"),
        }
    }
}

// ============================================================================
// Session - Connect / Close
// ============================================================================

impl Session {
    /// Resolves hosts, authenticates, and arms the heartbeat.
    ///
    /// Candidates are tried in order; the first that accepts the token
    /// becomes the live connection. The whole resolve-and-handshake round
    /// is repeated up to `max_reconnect` more times. A session that is
    /// already connected is closed first.
    ///
    /// # Errors
    ///
    /// - [`Error::ResolveFailed`] if no token or host is available
    /// - [`Error::AuthFailed`] if every candidate fails the handshake
    /// - [`Error::Scheduler`] if the heartbeat cannot be armed; the new
    ///   connection is closed again
    pub async fn connect(&self, scheduler: Arc<dyn Scheduler>) -> Result<()> {
        if self.is_connected() {
            debug!(room_id = self.room_id(), "Already connected, closing first");
            self.close().await;
        }

        let rounds = self.config.max_reconnect.saturating_add(1);
        let mut round = 1;
        loop {
            match self.establish().await {
                Ok(()) => break,
                Err(e) if round < rounds => {
                    warn!(room_id = self.room_id(), round, rounds, error = %e, "Connect round failed, retrying");
                    round += 1;
                }
                Err(e) => {
                    error!(room_id = self.room_id(), rounds, error = %e, "Connect failed");
                    return Err(e);
                }
            }
        }

        let heartbeat = Heartbeat {
            link: Arc::clone(&self.link),
            scheduler,
            epoch: self.link.current_epoch(),
            interval: self.config.heartbeat_interval,
            body: Arc::clone(&self.heartbeat_body),
        };

        if let Err(e) = heartbeat.arm() {
            error!(room_id = self.room_id(), error = %e, "Heartbeat could not be armed");
            self.close().await;
            return Err(e);
        }

        info!(
            room_id = self.room_id(),
            peer = ?self.peer_addr(),
            "Connected to push server"
        );
        Ok(())
    }

    /// Closes the connection and releases token and hosts.
    ///
    /// Cancels the heartbeat and ends a running read loop with
    /// [`Error::ConnectionClosed`]. Idempotent; the session may reconnect.
    pub async fn close(&self) {
        self.link.cancel_heartbeat();
        self.link.bump_epoch();

        // A running loop releases the reader as soon as it sees the new epoch.
        self.reader.lock().await.take();
        self.link.writer.lock().await.shutdown().await;

        self.token.write().take();
        self.hosts.write().clear();

        if let Some(peer) = self.peer.write().take() {
            info!(room_id = self.room_id(), %peer, "Session closed");
        }
    }

    /// One resolve-and-handshake round.
    async fn establish(&self) -> Result<()> {
        let credentials = self.resolver.resolve(self.room_id()).await?;
        debug!(
            room_id = self.room_id(),
            hosts = credentials.hosts.len(),
            "Credentials resolved"
        );

        let auth =
            AuthRequest::new(self.user_id(), self.room_id(), credentials.token.clone()).to_body()?;

        let mut writer = self.link.writer.lock().await;
        for host in &credentials.hosts {
            writer.shutdown().await;

            match self.handshake(&mut writer, host, &auth).await {
                Ok((reader, peer)) => {
                    *self.reader.lock().await = Some(reader);
                    *self.peer.write() = Some(peer);
                    *self.token.write() = Some(credentials.token);
                    *self.hosts.write() = credentials.hosts.clone();
                    return Ok(());
                }
                Err(e) => {
                    warn!(host = %host, error = %e, "Handshake failed, trying next host");
                }
            }
        }

        writer.shutdown().await;
        Err(Error::auth_failed(credentials.hosts.len()))
    }

    /// Opens a TCP connection to `host` and authenticates.
    async fn handshake(
        &self,
        writer: &mut FrameWriter<OwnedWriteHalf>,
        host: &HostCandidate,
        auth: &[u8],
    ) -> Result<(OwnedReadHalf, SocketAddr)> {
        let addr = host.socket_addr();
        let deadline = self.config.connect_timeout;

        let stream = timeout(deadline, TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;
        debug!(%addr, "TCP connected");

        let (mut reader, write_half) = stream.into_split();
        writer.attach(write_half);
        writer.send(Operation::Auth, auth).await?;

        let reply = timeout(deadline, read_frame(&mut reader))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "auth reply timed out"))??;

        if reply.header.op() != Some(Operation::AuthReply) {
            return Err(Error::protocol_violation(format!(
                "expected auth reply, got operation {}",
                reply.header.operation
            )));
        }

        let reply = AuthReply::parse(&reply.body)?;
        if !reply.is_success() {
            return Err(Error::protocol_violation(format!(
                "auth rejected with code {}",
                reply.code
            )));
        }

        Ok((reader, addr))
    }
}

// ============================================================================
// Session - Read Loop
// ============================================================================

impl Session {
    /// Reads and dispatches frames.
    ///
    /// `count` is the number of frames to handle; `-1` runs until stopped.
    /// A zero count returns at once, connected or not. Each iteration waits,
    /// without timeout, for the socket to become readable or for a stop
    /// signal.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `count < -1`
    /// - [`Error::NotConnected`] if there is no live connection
    /// - [`Error::ConnectionClosed`] if a receive fails or the session is
    ///   closed while running
    /// - [`Error::ProtocolViolation`] for a frame with an unexpected operation
    pub async fn run(&self, count: i32) -> Result<()> {
        if count < -1 {
            return Err(Error::invalid_argument(format!(
                "run count must be -1 or non-negative, got {count}"
            )));
        }
        if count == 0 {
            return Ok(());
        }

        let mut closed = self.link.epoch.subscribe();
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotConnected)?;

        let mut remaining = count;
        debug!(room_id = self.room_id(), count, "Read loop started");

        loop {
            tokio::select! {
                biased;

                () = self.stop.notified() => {
                    debug!(room_id = self.room_id(), "Read loop stopped");
                    return Ok(());
                }

                _ = closed.changed() => {
                    debug!(room_id = self.room_id(), "Connection closed during read loop");
                    return Err(Error::ConnectionClosed);
                }

                ready = reader.readable() => {
                    if let Err(e) = ready {
                        error!(room_id = self.room_id(), error = %e, "Socket wait failed");
                        return Err(Error::ConnectionClosed);
                    }
                }
            }

            let frame = tokio::select! {
                biased;

                _ = closed.changed() => {
                    debug!(room_id = self.room_id(), "Connection closed mid-frame");
                    return Err(Error::ConnectionClosed);
                }

                read = read_frame(&mut *reader) => match read {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(room_id = self.room_id(), error = %e, "Receive failed");
                        return Err(Error::ConnectionClosed);
                    }
                },
            };

            self.handle_frame(&frame)?;

            if remaining > 0 {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(());
                }
            }
        }
    }

    /// Runs until stopped, closed, or failed.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[inline]
    pub async fn run_forever(&self) -> Result<()> {
        self.run(-1).await
    }

    /// Ends a running or the next [`run`](Self::run).
    ///
    /// Safe to call from any task or thread, including handlers.
    #[inline]
    pub fn force_stop(&self) {
        self.stop.notify_one();
        debug!(room_id = self.room_id(), "Stop requested");
    }

    /// Handles one inbound frame.
    fn handle_frame(&self, frame: &Frame) -> Result<()> {
        match frame.header.op() {
            Some(Operation::HeartbeatReply) => {
                match parse_popularity(&frame.body) {
                    Ok(value) => {
                        self.popularity.store(value, Ordering::Release);
                        trace!(value, "Popularity updated");
                        let event = Event::new(EventType::PopValueUpdate, popularity_event(value));
                        self.dispatch(&event);
                    }
                    Err(e) => warn!(error = %e, "Heartbeat reply dropped"),
                }
                Ok(())
            }

            Some(Operation::Command) => {
                self.handle_command(frame);
                Ok(())
            }

            _ => Err(Error::protocol_violation(format!(
                "unexpected operation {} in read loop",
                frame.header.operation
            ))),
        }
    }

    /// Decodes a command frame and dispatches every recognized event.
    fn handle_command(&self, frame: &Frame) {
        let inflated;
        let batch = match frame.header.protocol() {
            Some(SubProtocol::Raw | SubProtocol::HeartbeatAuth) => CommandBatch::single(&frame.body),
            Some(SubProtocol::Brotli) => match self.inflater.inflate(&frame.body) {
                Ok(payload) => {
                    inflated = payload;
                    CommandBatch::framed(&inflated)
                }
                Err(e) => {
                    warn!(error = %e, "Command frame dropped");
                    return;
                }
            },
            Some(SubProtocol::Zlib) | None => {
                let e = Error::unsupported_compression(frame.header.sub_protocol);
                warn!(error = %e, "Command frame dropped");
                return;
            }
        };

        for result in batch {
            match result {
                Ok(event) => self.dispatch(&event),
                Err(e) => warn!(error = %e, "Rest of command batch dropped"),
            }
        }
    }
}

// ============================================================================
// Session - Drop
// ============================================================================

impl Drop for Session {
    fn drop(&mut self) {
        self.link.cancel_heartbeat();
        self.link.bump_epoch();
    }
}

// ============================================================================
// Tests
// ============================================================================
