//! Connection manager — lifecycle of one peripheral link.
//!
//! ```text
//! DISCONNECTED ──connect()──▶ CONNECTING ──subscribed──▶ CONNECTED
//!      ▲                           │                        │
//!      └────────── failure ────────┘    idle / write error / stream end
//!      └────────────────────────────────────────────────────┘
//! ```
//!
//! Writes reconnect lazily. Every successful write or notification pushes
//! the idle deadline forward; once it passes, the owner calls
//! [`ConnectionManager::disconnect_if_idle`].
//!
//! Notifications are forwarded by a small task into the owner's bounded
//! [`LinkEvent`] queue, tagged with a generation so events from a previous
//! link are recognisable.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::StreamExt as _;

use duolight_domain::error::ConnectionError;
use duolight_domain::lamp::LampState;
use duolight_domain::protocol::{CONTROL_CHAR, NOTIFY_CHAR};

use crate::ports::{GattLink, NotificationStream};

/// Default idle period before the link is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened on the link, delivered to the owner's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Raw bytes received on the notify characteristic.
    Notification { generation: u64, bytes: Vec<u8> },
    /// The notification stream ended.
    Closed { generation: u64 },
}

impl LinkEvent {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            Self::Notification { generation, .. } | Self::Closed { generation } => *generation,
        }
    }
}

/// Owns the link to one peripheral and its connection state.
pub struct ConnectionManager<L> {
    link: Option<L>,
    state: ConnectionState,
    idle_timeout: Duration,
    idle_deadline: Option<Instant>,
    events: mpsc::Sender<LinkEvent>,
    forwarder: Option<JoinHandle<()>>,
    generation: u64,
}

impl<L: GattLink> ConnectionManager<L> {
    /// Create a manager with no peripheral attached.
    ///
    /// Notifications and stream closures are sent to `events`.
    #[must_use]
    pub fn new(idle_timeout: Duration, events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            link: None,
            state: ConnectionState::Disconnected,
            idle_timeout,
            idle_deadline: None,
            events,
            forwarder: None,
            generation: 0,
        }
    }

    /// Record the target peripheral. Does not connect.
    pub fn attach_peripheral(&mut self, link: L) {
        self.link = Some(link);
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle_deadline
    }

    /// Whether `event` belongs to the current link.
    #[must_use]
    pub fn is_current(&self, event: &LinkEvent) -> bool {
        event.generation() == self.generation
    }

    /// Push the idle deadline forward.
    pub fn touch(&mut self) {
        self.idle_deadline = Some(Instant::now() + self.idle_timeout);
    }

    /// Open the link, locate both characteristics, subscribe, then ask the
    /// fixture for the state of both channels.
    ///
    /// A no-op when already connected.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NoPeripheral`] without a peripheral,
    /// otherwise the step that failed. The state is back to disconnected on
    /// every error.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        let Some(link) = self.link.as_ref() else {
            return Err(ConnectionError::NoPeripheral);
        };

        self.state = ConnectionState::Connecting;
        tracing::debug!(address = %link.address(), "connecting to peripheral");

        let stream = match establish(link).await {
            Ok(stream) => stream,
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                if let Err(err) = link.disconnect().await {
                    tracing::debug!(%err, "failed to close half-open link");
                }
                return Err(err);
            }
        };

        self.generation = self.generation.wrapping_add(1);
        self.forwarder = Some(spawn_forwarder(
            stream,
            self.generation,
            self.events.clone(),
        ));
        self.state = ConnectionState::Connected;
        tracing::info!(address = %link.address(), "peripheral connected");
        self.touch();

        self.request_status().await;
        Ok(())
    }

    /// Ask the fixture to report both channels. Failures are logged only;
    /// the two requests are independent.
    pub async fn request_status(&mut self) {
        let Some(link) = self.link.as_ref() else {
            return;
        };

        let mut any_written = false;
        for command in LampState::status_requests() {
            match link.write(CONTROL_CHAR, &command.encode()).await {
                Ok(()) => any_written = true,
                Err(err) => tracing::warn!(%err, ?command, "status request failed"),
            }
        }
        if any_written {
            self.touch();
        }
    }

    /// Write a framed command, connecting first if needed.
    ///
    /// A failed write closes the link; the next write reconnects.
    ///
    /// # Errors
    ///
    /// Returns the connect error if the lazy reconnect fails, or
    /// [`ConnectionError::Write`] if the transport rejects the bytes.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Connected {
            self.connect().await?;
        }
        let Some(link) = self.link.as_ref() else {
            return Err(ConnectionError::NoPeripheral);
        };

        self.idle_deadline = Some(Instant::now() + self.idle_timeout);
        let result = link.write(CONTROL_CHAR, bytes).await;

        match result {
            Ok(()) => {
                tracing::debug!(bytes = ?bytes, "command written");
                Ok(())
            }
            Err(err) => {
                self.disconnect().await;
                Err(ConnectionError::Write(err))
            }
        }
    }

    /// Close the link if the idle deadline has passed.
    ///
    /// Returns whether the link was closed.
    pub async fn disconnect_if_idle(&mut self) -> bool {
        if self.state != ConnectionState::Connected {
            self.idle_deadline = None;
            return false;
        }
        let expired = self
            .idle_deadline
            .is_some_and(|deadline| deadline <= Instant::now());
        if !expired {
            return false;
        }

        self.disconnect().await;
        tracing::info!("peripheral disconnected after idle timeout");
        true
    }

    /// Close the link. Transport errors are logged only.
    pub async fn disconnect(&mut self) {
        self.reset();
        if let Some(link) = self.link.as_ref()
            && let Err(err) = link.disconnect().await
        {
            tracing::warn!(%err, address = %link.address(), "failed to disconnect peripheral");
        }
    }

    /// Handle the end of the notification stream.
    pub fn handle_closed(&mut self, event: &LinkEvent) {
        if !self.is_current(event) || self.state != ConnectionState::Connected {
            return;
        }
        tracing::info!("peripheral closed the link");
        self.forwarder = None;
        self.reset();
    }

    fn reset(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.state = ConnectionState::Disconnected;
        self.idle_deadline = None;
    }
}

impl<L> Drop for ConnectionManager<L> {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

async fn establish<L: GattLink>(link: &L) -> Result<NotificationStream, ConnectionError> {
    link.connect().await.map_err(ConnectionError::Connect)?;

    let characteristics = link.discover().await.map_err(ConnectionError::Discovery)?;
    let control = characteristics.contains(&CONTROL_CHAR);
    let notify = characteristics.contains(&NOTIFY_CHAR);
    if !(control && notify) {
        return Err(ConnectionError::MissingCharacteristics {
            control: !control,
            notify: !notify,
        });
    }

    link.subscribe(NOTIFY_CHAR)
        .await
        .map_err(ConnectionError::Subscribe)
}

fn spawn_forwarder(
    mut stream: NotificationStream,
    generation: u64,
    events: mpsc::Sender<LinkEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(bytes) = stream.next().await {
            if events
                .send(LinkEvent::Notification { generation, bytes })
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = events.send(LinkEvent::Closed { generation }).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::link::fake::{Call, FakeLink};

    const WHITE_STATUS: [u8; 13] = [254, 239, 10, 9, 171, 170, 4, 48, 1, 53, 85, 13, 10];
    const COLOR_STATUS: [u8; 13] = [254, 239, 10, 9, 171, 170, 4, 48, 2, 54, 85, 13, 10];
    const POWER_ON: [u8; 13] = [254, 239, 10, 9, 171, 170, 4, 55, 1, 50, 85, 13, 10];

    fn manager(link: &FakeLink) -> (ConnectionManager<FakeLink>, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let mut manager = ConnectionManager::new(DEFAULT_IDLE_TIMEOUT, tx);
        manager.attach_peripheral(link.clone());
        (manager, rx)
    }

    #[tokio::test]
    async fn should_fail_without_peripheral() {
        let (tx, _rx) = mpsc::channel(1);
        let mut manager = ConnectionManager::<FakeLink>::new(DEFAULT_IDLE_TIMEOUT, tx);

        assert!(matches!(
            manager.write(&POWER_ON).await,
            Err(ConnectionError::NoPeripheral)
        ));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_not_connect_on_attach() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (manager, _rx) = manager(&link);

        assert!(link.calls().is_empty());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_connect_once_then_write_when_disconnected() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);

        manager.write(&POWER_ON).await.unwrap();

        assert_eq!(
            link.calls(),
            [
                Call::Connect,
                Call::Discover,
                Call::Subscribe(NOTIFY_CHAR),
                Call::Write(WHITE_STATUS.to_vec()),
                Call::Write(COLOR_STATUS.to_vec()),
                Call::Write(POWER_ON.to_vec()),
            ]
        );
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn should_not_reconnect_when_connected() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);
        manager.connect().await.unwrap();
        link.clear();

        manager.write(&POWER_ON).await.unwrap();

        assert_eq!(link.calls(), [Call::Write(POWER_ON.to_vec())]);
    }

    #[tokio::test]
    async fn should_revert_to_disconnected_when_connect_fails() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        link.fail_connect(true);
        let (mut manager, _rx) = manager(&link);

        let result = manager.write(&POWER_ON).await;

        assert!(matches!(result, Err(ConnectionError::Connect(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(link.writes().is_empty());
    }

    #[tokio::test]
    async fn should_report_missing_notify_characteristic() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        link.hide_notify_characteristic();
        let (mut manager, _rx) = manager(&link);

        let result = manager.connect().await;

        assert!(matches!(
            result,
            Err(ConnectionError::MissingCharacteristics {
                control: false,
                notify: true,
            })
        ));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_drop_link_when_write_fails() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);
        manager.connect().await.unwrap();
        link.fail_write(true);

        let result = manager.write(&POWER_ON).await;

        assert!(matches!(result, Err(ConnectionError::Write(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        link.fail_write(false);
        link.clear();
        manager.write(&POWER_ON).await.unwrap();
        assert_eq!(link.count(&Call::Connect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_connecting_when_status_requests_fail() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        link.fail_write(true);
        let (mut manager, _rx) = manager(&link);

        manager.connect().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(link.writes().len(), 2);
        assert!(manager.idle_deadline().is_some());

        tokio::time::advance(Duration::from_millis(5001)).await;
        assert!(manager.disconnect_if_idle().await);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn should_disconnect_after_idle_timeout() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);
        manager.write(&POWER_ON).await.unwrap();

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert!(!manager.disconnect_if_idle().await);
        assert_eq!(manager.state(), ConnectionState::Connected);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(manager.disconnect_if_idle().await);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(link.count(&Call::Disconnect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_push_deadline_forward_on_write() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);
        manager.write(&POWER_ON).await.unwrap();

        tokio::time::advance(Duration::from_millis(4000)).await;
        manager.write(&POWER_ON).await.unwrap();
        tokio::time::advance(Duration::from_millis(4000)).await;

        assert!(!manager.disconnect_if_idle().await);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn should_forward_notifications_with_current_generation() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, mut rx) = manager(&link);
        manager.connect().await.unwrap();

        link.notify(vec![1, 2, 3]).await;
        let event = rx.recv().await.unwrap();

        assert!(manager.is_current(&event));
        assert!(matches!(event, LinkEvent::Notification { ref bytes, .. } if bytes == &[1, 2, 3]));
    }

    #[tokio::test]
    async fn should_disconnect_when_stream_ends() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, mut rx) = manager(&link);
        manager.connect().await.unwrap();

        link.drop_stream();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, LinkEvent::Closed { .. }));

        manager.handle_closed(&event);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.idle_deadline(), None);
    }

    #[tokio::test]
    async fn should_ignore_events_from_previous_link() {
        let link = FakeLink::new("AA:BB:CC:DD:EE:FF");
        let (mut manager, _rx) = manager(&link);
        manager.connect().await.unwrap();
        let stale = LinkEvent::Closed {
            generation: manager.generation,
        };

        manager.disconnect().await;
        manager.connect().await.unwrap();
        manager.handle_closed(&stale);

        assert_eq!(manager.state(), ConnectionState::Connected);
    }
}
