//! MQTT actuator bus adapter.
//!
//! Implements [`CommandChannel`] and [`ReportSource`] on top of the
//! synchronous `rumqttc` client.  Each `connect` starts one session: a
//! background thread drives the client's event loop, subscribes to every
//! zone state topic on ConnAck, and fans decoded reports out to all
//! subscribers.
//!
//! ## Reconnection policy
//!
//! None.  When the session ends (broker gone, network error, explicit
//! disconnect) the adapter reports "disconnected" and waits for the
//! operator to call [`MqttChannel::connect`] again.  Subscriptions handed
//! out by [`ReportSource::subscribe`] stay open across sessions.
//!
//! `connect` and `disconnect` serialise on their own lock, independent of
//! the engine's intent lock.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};

use crate::app::ports::{CommandChannel, ReportSource, StateReport, ValveCommand};
use crate::codec::{self, ReportError};
use crate::config::MqttSettings;
use crate::error::ChannelError;

const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Depth of the client's outbound request queue.
const REQUEST_CAP: usize = 16;

/// Callback invoked with `true` on ConnAck and `false` when a session ends.
pub type ConnectionHook = Box<dyn Fn(bool) + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    settings: MqttSettings,
    /// Client of the live session.  Held while connecting/disconnecting.
    link: Mutex<Option<Client>>,
    connected: AtomicBool,
    /// Bumped on every connect and disconnect; a session thread only
    /// touches shared state while its id is current.
    session: AtomicU64,
    subscribers: Mutex<Vec<Sender<StateReport>>>,
    hooks: Mutex<Vec<ConnectionHook>>,
}

impl Shared {
    fn set_connected(&self, on: bool) {
        if self.connected.swap(on, Ordering::SeqCst) != on {
            for hook in lock(&self.hooks).iter() {
                hook(on);
            }
        }
    }

    fn is_current(&self, session: u64) -> bool {
        self.session.load(Ordering::SeqCst) == session
    }

    /// Mark `session` connected.  Refused once the session was superseded.
    fn session_up(&self, session: u64) -> bool {
        let _link = lock(&self.link);
        if !self.is_current(session) {
            return false;
        }
        self.set_connected(true);
        true
    }

    /// Tear down after `session`'s event loop ended on its own.
    fn session_down(&self, session: u64) {
        let mut link = lock(&self.link);
        if self.is_current(session) {
            *link = None;
            self.set_connected(false);
        }
    }

    fn dispatch(&self, topic: &str, payload: &[u8]) {
        match codec::decode_report(&self.settings.topic_prefix, topic, payload) {
            Ok(report) => {
                debug!("MQTT report: zone {} -> {}", report.zone, report.on);
                lock(&self.subscribers).retain(|tx| tx.send(report).is_ok());
            }
            Err(ReportError::NotAStateTopic) => {
                debug!("Ignoring MQTT message on {}", topic);
            }
            Err(e) => warn!("Dropping MQTT message on {}: {}", topic, e),
        }
    }
}

/// Cloneable handle to the MQTT adapter.  One clone lives inside the
/// engine (publishing), another with the front-end (connect/disconnect).
#[derive(Clone)]
pub struct MqttChannel {
    shared: Arc<Shared>,
}

impl MqttChannel {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                link: Mutex::new(None),
                connected: AtomicBool::new(false),
                session: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn settings(&self) -> &MqttSettings {
        &self.shared.settings
    }

    /// Register a connection-status observer.
    pub fn on_connection_change(&self, hook: impl Fn(bool) + Send + Sync + 'static) {
        lock(&self.shared.hooks).push(Box::new(hook));
    }

    /// Start a session.  Returns `Ok(false)` when one is already running.
    ///
    /// Success means the attempt started; the connected state flips when
    /// the broker acknowledges.
    pub fn connect(&self) -> Result<bool, ChannelError> {
        let mut link = lock(&self.shared.link);
        if link.is_some() {
            return Ok(false);
        }

        let options = self.options()?;
        let (client, connection) = Client::new(options, REQUEST_CAP);
        let session = self.shared.session.fetch_add(1, Ordering::SeqCst) + 1;

        let shared = Arc::clone(&self.shared);
        let subscriber = client.clone();
        thread::Builder::new()
            .name("mqtt-session".into())
            .spawn(move || run_session(&shared, session, &subscriber, connection))
            .map_err(|e| {
                error!("Failed to start MQTT session thread: {}", e);
                ChannelError::Setup("cannot spawn session thread")
            })?;

        *link = Some(client);
        info!(
            "Connecting to MQTT broker {}:{} as {}",
            self.shared.settings.broker, self.shared.settings.port, self.shared.settings.client_id
        );
        Ok(true)
    }

    /// End the current session, if any.
    pub fn disconnect(&self) {
        // The link lock is held until the flag is cleared, so a session
        // thread cannot mark this session connected in between.
        let mut link = lock(&self.shared.link);
        let Some(client) = link.take() else {
            return;
        };
        self.shared.session.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = client.try_disconnect() {
            error!("Error disconnecting from MQTT broker: {}", e);
        }
        self.shared.set_connected(false);
        drop(link);
        info!("Disconnected from MQTT broker");
    }

    /// Disconnect and close every subscription handed out so far.
    pub fn shutdown(&self) {
        self.disconnect();
        lock(&self.shared.subscribers).clear();
    }

    fn options(&self) -> Result<MqttOptions, ChannelError> {
        let s = &self.shared.settings;
        let mut options = MqttOptions::new(&s.client_id, &s.broker, s.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        if !s.username.is_empty() && !s.password.is_empty() {
            options.set_credentials(&s.username, &s.password);
        }

        if s.use_tls {
            let transport = if s.ca_cert_path.is_empty() {
                Transport::tls_with_default_config()
            } else {
                let ca = fs::read(&s.ca_cert_path).map_err(|e| {
                    error!("Cannot read CA certificate {}: {}", s.ca_cert_path, e);
                    ChannelError::Setup("cannot read CA certificate")
                })?;
                Transport::tls_with_config(TlsConfiguration::Simple {
                    ca,
                    alpn: None,
                    client_auth: None,
                })
            };
            options.set_transport(transport);
        }
        Ok(options)
    }
}

impl CommandChannel for MqttChannel {
    fn publish(&mut self, command: ValveCommand) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::Unavailable);
        }
        let link = lock(&self.shared.link);
        let Some(client) = link.as_ref() else {
            return Err(ChannelError::Unavailable);
        };

        let (topic, payload) = codec::encode_command(&self.shared.settings.topic_prefix, command);
        client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| {
                debug!("MQTT client rejected publish: {}", e);
                ChannelError::PublishFailed
            })
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl ReportSource for MqttChannel {
    fn subscribe(&self) -> Receiver<StateReport> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared.subscribers).push(tx);
        rx
    }
}

/// Drive one session's event loop until it ends.
fn run_session(shared: &Shared, session: u64, client: &Client, mut connection: Connection) {
    for event in connection.iter() {
        if !shared.is_current(session) {
            break;
        }
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    error!("MQTT broker refused connection: {:?}", ack.code);
                    break;
                }
                for topic in codec::state_topics(&shared.settings.topic_prefix) {
                    if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        warn!("Cannot subscribe to {}: {}", topic, e);
                    }
                }
                if !shared.session_up(session) {
                    break;
                }
                info!("Connected to MQTT broker");
            }
            Ok(Event::Incoming(Packet::Publish(msg))) => shared.dispatch(&msg.topic, &msg.payload),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("MQTT connection lost: {}", e);
                break;
            }
        }
    }
    shared.session_down(session);
}
