//! Long-polling transport loop
//!
//! One poll is in flight at a time. Outbound envelopes queue in an outbox
//! shared with [`ClientHandle`]s and are flushed before and after each poll.
//! Anything queued while a poll is pending wakes the loop and is sent at once.
//! Poll failures are retried forever with exponential delay; sends are
//! retried a bounded number of times.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, StreamExt};
use remote_ui_protocol::{BrowserEvent, EncodeError, Envelope, Protocol, SessionEndpoints, WireValue};
use serde_json::Value as Json;

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("http: {0}")]
    Http(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("unreadable body: {0}")]
    Body(String),
}

impl Classify for ChannelError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::TransportTransient
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("handshake failed: {0}")]
    Handshake(#[source] ChannelError),
    #[error("send failed after {attempts} attempts: {source}")]
    SendExhausted {
        attempts: u32,
        #[source]
        source: ChannelError,
    },
    #[error("outbound envelope does not match its schema: {0}")]
    Encode(#[from] EncodeError),
}

impl Classify for TransportError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Handshake(_) => ErrorKind::HandshakeFailure,
            Self::SendExhausted { .. } => ErrorKind::TransportTransient,
            Self::Encode(_) => ErrorKind::SchemaMismatch,
        }
    }
}

/// Network plumbing under the [`TransportClient`]
#[async_trait(?Send)]
pub trait Channel {
    /// Perform the handshake and learn the poll and send endpoints
    async fn connect(&self) -> Result<SessionEndpoints, ChannelError>;

    /// Wait for the next batch of inbound envelopes, as a raw JSON array
    async fn poll(&self, endpoints: &SessionEndpoints) -> Result<Json, ChannelError>;

    /// Deliver a JSON array of outbound envelopes
    async fn send(&self, endpoints: &SessionEndpoints, body: &Json) -> Result<(), ChannelError>;

    /// Back off between retries
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Total tries for one outbound batch, at least 1
    pub send_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            send_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// No waiting at all; used by tests and the headless smoke runs
    pub const fn immediate(send_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            send_attempts,
        }
    }

    /// Delay before retry number `failures` (1-based), in whole milliseconds
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_millis() as f64 {
            self.max_delay
        } else {
            Duration::from_millis(scaled.round() as u64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Connected,
    Stopped,
}

/// Cooperative cancellation, checked between loop iterations
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub polls: u64,
    pub transient_failures: u64,
    pub dispatched: u64,
    pub dropped: u64,
    pub sent: u64,
}

#[derive(Default)]
struct Outbox {
    queue: VecDeque<Envelope>,
    next_id: i64,
    pending: HashMap<i64, oneshot::Sender<WireValue>>,
    wake: Option<mpsc::UnboundedSender<()>>,
}

impl Outbox {
    fn push(&mut self, envelope: Envelope) {
        self.queue.push_back(envelope);
        if let Some(wake) = &self.wake {
            // The loop is gone if this fails; the envelope stays queued.
            let _ = wake.unbounded_send(());
        }
    }
}

/// Queues outbound traffic from anywhere on the UI thread
#[derive(Clone, Default)]
pub struct ClientHandle(Rc<RefCell<Outbox>>);

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outbox = self.0.borrow();
        f.debug_struct("ClientHandle")
            .field("queued", &outbox.queue.len())
            .field("awaiting", &outbox.pending.len())
            .finish()
    }
}

impl ClientHandle {
    pub fn send_event(&self, event: &BrowserEvent) {
        self.send_envelope(event.to_envelope());
    }

    pub fn send_envelope(&self, envelope: Envelope) {
        self.0.borrow_mut().push(envelope);
    }

    /// Queue a request; the receiver resolves with the correlated response
    pub fn request(&self, name: &str, arguments: WireValue) -> oneshot::Receiver<WireValue> {
        let (tx, rx) = oneshot::channel();
        let mut outbox = self.0.borrow_mut();
        outbox.next_id += 1;
        let id = outbox.next_id;
        outbox.pending.insert(id, tx);
        outbox.push(Envelope::Request {
            id: Some(id),
            name: name.to_string(),
            arguments,
        });
        rx
    }

    /// Envelopes waiting to be sent
    pub fn queued(&self) -> usize {
        self.0.borrow().queue.len()
    }

    fn drain(&self) -> Vec<Envelope> {
        self.0.borrow_mut().queue.drain(..).collect()
    }

    fn requeue_front(&self, envelopes: Vec<Envelope>) {
        let mut outbox = self.0.borrow_mut();
        for envelope in envelopes.into_iter().rev() {
            outbox.queue.push_front(envelope);
        }
    }

    fn resolve(&self, id: i64, result: WireValue) -> bool {
        let sender = self.0.borrow_mut().pending.remove(&id);
        sender.is_some_and(|tx| tx.send(result).is_ok())
    }
}

/// Receives inbound requests and events
pub trait RequestHandler {
    type Error: fmt::Display;

    /// Handle one request; the returned value (or null) answers it when the
    /// host expects a response. On error nothing is sent back.
    fn handle_request(
        &mut self,
        name: &str,
        arguments: &WireValue,
    ) -> Result<Option<WireValue>, Self::Error>;

    fn handle_event(&mut self, name: &str, arguments: &WireValue) {
        tracing::debug!(name, ?arguments, "ignoring event");
    }
}

pub struct TransportClient<C> {
    channel: C,
    protocol: Rc<Protocol>,
    policy: RetryPolicy,
    outbox: ClientHandle,
    wakeups: mpsc::UnboundedReceiver<()>,
    endpoints: Option<SessionEndpoints>,
    state: TransportState,
    stop: StopHandle,
    stats: RunStats,
    failures: u32,
}

impl<C: Channel> TransportClient<C> {
    pub fn new(channel: C, protocol: Rc<Protocol>, policy: RetryPolicy) -> Self {
        let (wake, wakeups) = mpsc::unbounded();
        let outbox = ClientHandle::default();
        outbox.0.borrow_mut().wake = Some(wake);
        Self {
            channel,
            protocol,
            policy,
            outbox,
            wakeups,
            endpoints: None,
            state: TransportState::Idle,
            stop: StopHandle::default(),
            stats: RunStats::default(),
            failures: 0,
        }
    }

    pub fn handle(&self) -> ClientHandle {
        self.outbox.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub const fn state(&self) -> TransportState {
        self.state
    }

    pub const fn stats(&self) -> RunStats {
        self.stats
    }

    pub const fn channel(&self) -> &C {
        &self.channel
    }

    pub async fn connect(&mut self) -> Result<SessionEndpoints, TransportError> {
        self.state = TransportState::Connecting;
        match self.channel.connect().await {
            Ok(endpoints) => {
                tracing::info!(poll = %endpoints.request, send = %endpoints.response, "connected");
                self.endpoints = Some(endpoints.clone());
                self.state = TransportState::Connected;
                Ok(endpoints)
            }
            Err(e) => {
                self.state = TransportState::Idle;
                Err(TransportError::Handshake(e))
            }
        }
    }

    /// Connect if needed, then poll and dispatch until stopped
    pub async fn run<H: RequestHandler>(&mut self, handler: &mut H) -> Result<RunStats, TransportError> {
        if self.endpoints.is_none() {
            self.connect().await?;
        }
        while !self.stop.is_stopped() {
            self.step(handler).await?;
        }
        self.flush().await?;
        self.state = TransportState::Stopped;
        tracing::info!(stats = ?self.stats, "transport stopped");
        Ok(self.stats)
    }

    /// One iteration: flush, poll once, dispatch the batch, flush
    ///
    /// Envelopes queued while the poll is pending are sent without waiting
    /// for it; the poll itself is never restarted.
    pub async fn step<H: RequestHandler>(&mut self, handler: &mut H) -> Result<(), TransportError> {
        let Some(endpoints) = self.endpoints.clone() else {
            self.connect().await?;
            return Ok(());
        };
        self.flush().await?;

        self.stats.polls += 1;
        let polled = {
            let poll = self.channel.poll(&endpoints).fuse();
            futures::pin_mut!(poll);
            loop {
                futures::select! {
                    polled = poll => break polled,
                    _ = self.wakeups.next() => {
                        Self::send_queued(
                            &self.channel,
                            &self.protocol,
                            self.policy,
                            &self.outbox,
                            &mut self.stats,
                            &endpoints,
                        )
                        .await?;
                    }
                }
            }
        };
        let batch = match polled {
            Ok(json) => self.protocol.decode_batch(&json).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let envelopes = match batch {
            Ok(envelopes) => {
                self.failures = 0;
                envelopes
            }
            Err(reason) => {
                self.failures = self.failures.saturating_add(1);
                self.stats.transient_failures += 1;
                let delay = self.policy.delay_for(self.failures);
                tracing::debug!(%reason, failures = self.failures, ?delay, "poll failed, retrying");
                self.channel.sleep(delay).await;
                return Ok(());
            }
        };

        for envelope in envelopes {
            match envelope {
                Ok(envelope) => self.dispatch(envelope, handler),
                Err(e) => {
                    self.stats.dropped += 1;
                    tracing::warn!(error = %e, "dropping envelope");
                }
            }
        }
        self.flush().await
    }

    fn dispatch<H: RequestHandler>(&mut self, envelope: Envelope, handler: &mut H) {
        match envelope {
            Envelope::Request {
                id,
                name,
                arguments,
            } => {
                self.stats.dispatched += 1;
                match handler.handle_request(&name, &arguments) {
                    Ok(result) => {
                        if let Some(id) = id {
                            self.outbox.send_envelope(Envelope::Response {
                                id,
                                name,
                                result: result.unwrap_or(WireValue::Null),
                            });
                        }
                    }
                    Err(e) => tracing::error!(%name, ?id, error = %e, "request failed"),
                }
            }
            Envelope::Event { name, arguments } => {
                self.stats.dispatched += 1;
                handler.handle_event(&name, &arguments);
            }
            Envelope::Response { id, name, result } => {
                if self.outbox.resolve(id, result) {
                    self.stats.dispatched += 1;
                } else {
                    self.stats.dropped += 1;
                    tracing::warn!(id, %name, "response to unknown request");
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        let Some(endpoints) = self.endpoints.clone() else {
            return Ok(());
        };
        Self::send_queued(
            &self.channel,
            &self.protocol,
            self.policy,
            &self.outbox,
            &mut self.stats,
            &endpoints,
        )
        .await
    }

    /// Send everything in the outbox as one batch, retrying a bounded number
    /// of times; borrows fields separately so it can run beside a pending poll
    async fn send_queued(
        channel: &C,
        protocol: &Protocol,
        policy: RetryPolicy,
        outbox: &ClientHandle,
        stats: &mut RunStats,
        endpoints: &SessionEndpoints,
    ) -> Result<(), TransportError> {
        let envelopes = outbox.drain();
        if envelopes.is_empty() {
            return Ok(());
        }
        let body = protocol.encode_batch(&envelopes)?;

        let attempts = policy.send_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match channel.send(endpoints, &body).await {
                Ok(()) => {
                    stats.sent += envelopes.len() as u64;
                    return Ok(());
                }
                Err(source) if attempt >= attempts => {
                    tracing::error!(error = %source, attempts, "giving up on outbound batch");
                    outbox.requeue_front(envelopes);
                    return Err(TransportError::SendExhausted { attempts, source });
                }
                Err(e) => {
                    tracing::debug!(error = %e, attempt, "send failed, retrying");
                    channel.sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Scripted {
        polls: RefCell<VecDeque<Result<Json, ChannelError>>>,
        sent: RefCell<Vec<Json>>,
        send_failures: Cell<u32>,
        delays: RefCell<Vec<Duration>>,
        refuse_connect: bool,
        stop: StopHandle,
    }

    impl Scripted {
        fn with_polls(polls: Vec<Result<Json, ChannelError>>) -> Self {
            Self {
                polls: RefCell::new(polls.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait(?Send)]
    impl Channel for Scripted {
        async fn connect(&self) -> Result<SessionEndpoints, ChannelError> {
            if self.refuse_connect {
                return Err(ChannelError::Status(503));
            }
            Ok(SessionEndpoints {
                request: "/poll".to_string(),
                response: "/send".to_string(),
            })
        }

        async fn poll(&self, _: &SessionEndpoints) -> Result<Json, ChannelError> {
            let next = self.polls.borrow_mut().pop_front();
            next.unwrap_or_else(|| {
                self.stop.stop();
                Ok(json!([]))
            })
        }

        async fn send(&self, _: &SessionEndpoints, body: &Json) -> Result<(), ChannelError> {
            if self.send_failures.get() > 0 {
                self.send_failures.set(self.send_failures.get() - 1);
                return Err(ChannelError::Http("reset".to_string()));
            }
            self.sent.borrow_mut().push(body.clone());
            Ok(())
        }

        async fn sleep(&self, delay: Duration) {
            self.delays.borrow_mut().push(delay);
        }
    }

    #[derive(Default)]
    struct Recorder {
        requests: Vec<String>,
        events: Vec<String>,
    }

    impl RequestHandler for Recorder {
        type Error = String;

        fn handle_request(
            &mut self,
            name: &str,
            _arguments: &WireValue,
        ) -> Result<Option<WireValue>, String> {
            self.requests.push(name.to_string());
            match name {
                "IOIsKeyPressing" => Ok(Some(WireValue::Boolean(true))),
                "IOIsKeyToggled" => Err("no keyboard".to_string()),
                _ => Ok(None),
            }
        }

        fn handle_event(&mut self, name: &str, _arguments: &WireValue) {
            self.events.push(name.to_string());
        }
    }

    fn client(channel: Scripted, policy: RetryPolicy) -> TransportClient<Scripted> {
        let stop = channel.stop.clone();
        let mut client = TransportClient::new(channel, Rc::new(Protocol::standard()), policy);
        client.stop = stop;
        client
    }

    fn transient() -> Result<Json, ChannelError> {
        Err(ChannelError::Http("connection refused".to_string()))
    }

    #[tokio::test]
    async fn transient_failures_then_one_dispatch() {
        let channel = Scripted::with_polls(vec![
            transient(),
            Err(ChannelError::Status(502)),
            Ok(json!("not an array")),
            Ok(json!([["Request", {"name": "WindowNotifyActivate"}]])),
        ]);
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(25),
            multiplier: 2.0,
            send_attempts: 3,
        };
        let mut client = client(channel, policy);
        let mut handler = Recorder::default();

        let stats = client.run(&mut handler).await.unwrap();

        assert_eq!(handler.requests, vec!["WindowNotifyActivate"]);
        assert_eq!(stats.transient_failures, 3);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(
            *client.channel().delays.borrow(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(25)
            ]
        );
        assert_eq!(client.state(), TransportState::Stopped);
    }

    #[tokio::test]
    async fn requests_with_id_are_answered_in_order() {
        let channel = Scripted::with_polls(vec![Ok(json!([
            ["Request", {"id": 1, "name": "IOIsKeyPressing", "arguments": 65}],
            ["Request", {"name": "WindowNotifySetTitle", "arguments": "Hello"}],
            ["Request", {"id": 2, "name": "IOIsKeyToggled", "arguments": 20}],
            ["Request", {"id": 3, "name": "WindowNotifyActivate"}],
        ]))]);
        let mut client = client(channel, RetryPolicy::immediate(1));
        let mut handler = Recorder::default();
        client.run(&mut handler).await.unwrap();

        let sent = client.channel().sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            json!([
                ["Response", {"id": 1, "name": "IOIsKeyPressing", "arguments": true}],
                ["Response", {"id": 3, "name": "WindowNotifyActivate", "arguments": null}],
            ])
        );
    }

    #[tokio::test]
    async fn malformed_envelope_is_dropped_alone() {
        let channel = Scripted::with_polls(vec![Ok(json!([
            ["Request", {"name": "WindowNotifySetTitle", "arguments": 5}],
            ["Request", {"name": "NoSuchMessage"}],
            ["Event", {"name": "ControllerConnect"}],
            ["Request", {"name": "WindowNotifySetTitle", "arguments": "ok"}],
        ]))]);
        let mut client = client(channel, RetryPolicy::immediate(1));
        let mut handler = Recorder::default();
        let stats = client.run(&mut handler).await.unwrap();

        assert_eq!(stats.dropped, 2);
        assert_eq!(handler.requests, vec!["WindowNotifySetTitle"]);
        assert_eq!(handler.events, vec!["ControllerConnect"]);
    }

    #[tokio::test]
    async fn handshake_failure_is_surfaced() {
        let channel = Scripted {
            refuse_connect: true,
            ..Scripted::default()
        };
        let mut client = client(channel, RetryPolicy::immediate(1));
        let err = client.run(&mut Recorder::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandshakeFailure);
        assert_eq!(client.state(), TransportState::Idle);
    }

    #[tokio::test]
    async fn send_retries_are_bounded() {
        let channel = Scripted::with_polls(vec![Ok(json!([
            ["Request", {"id": 9, "name": "WindowNotifyActivate"}],
        ]))]);
        channel.send_failures.set(10);
        let mut client = client(channel, RetryPolicy::immediate(3));
        let err = client.run(&mut Recorder::default()).await.unwrap_err();

        assert!(matches!(err, TransportError::SendExhausted { attempts: 3, .. }));
        assert_eq!(client.handle().queued(), 1);
    }

    #[tokio::test]
    async fn queued_events_flush_before_polling() {
        let channel = Scripted::default();
        let mut client = client(channel, RetryPolicy::immediate(1));
        client.handle().send_event(&BrowserEvent::ControllerConnect);
        client.handle().send_event(&BrowserEvent::IOMouseEntered);
        client.run(&mut Recorder::default()).await.unwrap();

        let sent = client.channel().sent.borrow();
        assert_eq!(
            sent[0],
            json!([
                ["Event", {"name": "ControllerConnect", "arguments": null}],
                ["Event", {"name": "IOMouseEntered", "arguments": null}],
            ])
        );
    }

    /// Holds its only poll open like a host with nothing to say
    #[derive(Default)]
    struct SlowHost {
        log: RefCell<Vec<&'static str>>,
        stop: StopHandle,
    }

    #[async_trait(?Send)]
    impl Channel for SlowHost {
        async fn connect(&self) -> Result<SessionEndpoints, ChannelError> {
            Ok(SessionEndpoints {
                request: "/poll".to_string(),
                response: "/send".to_string(),
            })
        }

        async fn poll(&self, _: &SessionEndpoints) -> Result<Json, ChannelError> {
            self.log.borrow_mut().push("poll");
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.log.borrow_mut().push("polled");
            self.stop.stop();
            Ok(json!([]))
        }

        async fn send(&self, _: &SessionEndpoints, _: &Json) -> Result<(), ChannelError> {
            self.log.borrow_mut().push("send");
            Ok(())
        }

        async fn sleep(&self, _: Duration) {}
    }

    #[tokio::test]
    async fn input_is_sent_while_a_poll_is_pending() {
        let channel = SlowHost::default();
        let stop = channel.stop.clone();
        let mut client =
            TransportClient::new(channel, Rc::new(Protocol::standard()), RetryPolicy::immediate(1));
        client.stop = stop;
        let handle = client.handle();
        let typing = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.send_event(&BrowserEvent::IOMouseEntered);
        };

        let mut handler = Recorder::default();
        let (stats, ()) = tokio::join!(client.run(&mut handler), typing);

        assert_eq!(stats.unwrap().polls, 1);
        assert_eq!(*client.channel().log.borrow(), vec!["poll", "send", "polled"]);
        assert_eq!(client.handle().queued(), 0);
    }

    #[tokio::test]
    async fn client_request_resolves_on_response() {
        let channel = Scripted::with_polls(vec![Ok(json!([
            ["Response", {"id": 1, "name": "IOIsKeyPressing", "arguments": false}],
            ["Response", {"id": 7, "name": "IOIsKeyPressing", "arguments": true}],
        ]))]);
        let mut client = client(channel, RetryPolicy::immediate(1));
        let reply = client.handle().request("IOIsKeyPressing", WireValue::Integer(16));
        let stats = client.run(&mut Recorder::default()).await.unwrap();

        assert_eq!(reply.await, Ok(WireValue::Boolean(false)));
        assert_eq!(stats.dropped, 1);
    }

    #[tokio::test]
    async fn stop_is_checked_between_iterations() {
        let channel = Scripted::with_polls(vec![transient(), transient()]);
        let mut client = client(channel, RetryPolicy::immediate(1));
        client.stop_handle().stop();
        let stats = client.run(&mut Recorder::default()).await.unwrap();
        assert_eq!(stats.polls, 0);
        assert_eq!(client.channel().polls.borrow().len(), 2);
    }

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(60), Duration::from_secs(5));
    }
}
