//! Virtual lamp — a simulated fixture behind the [`GattLink`] port.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use duolight_app::ports::{GattLink, NotificationStream};
use duolight_domain::error::TransportError;
use duolight_domain::protocol::{CONTROL_CHAR, Command, NOTIFY_CHAR};

use crate::error::VirtualLinkError;
use crate::firmware::Firmware;

/// Notifications buffered per subscription before new ones are dropped.
const NOTIFY_BUFFER: usize = 64;

#[derive(Default)]
struct Inner {
    firmware: Firmware,
    connected: bool,
    connections: usize,
    notifier: Option<mpsc::Sender<Vec<u8>>>,
    received: Vec<Command>,
    refuse_connect: bool,
    reject_write: bool,
    hide_notify: bool,
}

/// A simulated fixture. Clones share the same fixture.
#[derive(Clone)]
pub struct VirtualLamp {
    address: String,
    inner: Arc<Mutex<Inner>>,
}

impl VirtualLamp {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inner: Arc::default(),
        }
    }

    /// Current firmware state.
    #[must_use]
    pub fn firmware(&self) -> Firmware {
        self.lock().firmware
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Number of successful connections so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    /// Every command written to the control characteristic, in order.
    #[must_use]
    pub fn received(&self) -> Vec<Command> {
        self.lock().received.clone()
    }

    /// Make connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    /// Make writes fail.
    pub fn reject_writes(&self, reject: bool) {
        self.lock().reject_write = reject;
    }

    /// Leave the notify characteristic out of discovery.
    pub fn hide_notify_characteristic(&self, hide: bool) {
        self.lock().hide_notify = hide;
    }

    /// Drop the link from the fixture side, as going out of range would.
    pub fn drop_link(&self) {
        let mut inner = self.lock();
        inner.connected = false;
        inner.notifier = None;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connected(&self) -> Result<MutexGuard<'_, Inner>, VirtualLinkError> {
        let inner = self.lock();
        if inner.connected {
            Ok(inner)
        } else {
            Err(VirtualLinkError::NotConnected)
        }
    }
}

impl GattLink for VirtualLamp {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn connect(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.refuse_connect {
            return Err(VirtualLinkError::Refused.into());
        }
        inner.connected = true;
        inner.connections += 1;
        tracing::debug!(address = %self.address, "virtual fixture connected");
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<uuid::Uuid>, TransportError> {
        let inner = self.connected()?;
        if inner.hide_notify {
            return Ok(vec![CONTROL_CHAR]);
        }
        Ok(vec![CONTROL_CHAR, NOTIFY_CHAR])
    }

    async fn subscribe(
        &self,
        characteristic: uuid::Uuid,
    ) -> Result<NotificationStream, TransportError> {
        let mut inner = self.connected()?;
        if characteristic != NOTIFY_CHAR || inner.hide_notify {
            return Err(VirtualLinkError::UnknownCharacteristic(characteristic).into());
        }

        let (tx, rx) = mpsc::channel(NOTIFY_BUFFER);
        inner.notifier = Some(tx);
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn write(&self, characteristic: uuid::Uuid, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.connected()?;
        if characteristic != CONTROL_CHAR {
            return Err(VirtualLinkError::UnknownCharacteristic(characteristic).into());
        }
        if inner.reject_write {
            return Err(VirtualLinkError::Rejected.into());
        }

        let command = match Command::decode(bytes) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(address = %self.address, %err, "virtual fixture ignored frame");
                return Ok(());
            }
        };
        inner.received.push(command);

        let frames = inner.firmware.handle(command);
        if let Some(notifier) = &inner.notifier {
            for frame in frames {
                if notifier.try_send(frame.encode()).is_err() {
                    tracing::debug!(address = %self.address, "virtual notification dropped");
                }
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.connected = false;
        inner.notifier = None;
        tracing::debug!(address = %self.address, "virtual fixture disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt as _;

    use duolight_domain::protocol::{self, Channel, ChannelUpdate};

    use super::*;

    async fn connected_lamp() -> (VirtualLamp, NotificationStream) {
        let lamp = VirtualLamp::new("00:00:00:00:D0:01");
        lamp.connect().await.unwrap();
        let stream = lamp.subscribe(NOTIFY_CHAR).await.unwrap();
        (lamp, stream)
    }

    #[tokio::test]
    async fn should_answer_status_request_with_notification() {
        let (lamp, mut stream) = connected_lamp().await;

        lamp.write(
            CONTROL_CHAR,
            &Command::StatusRequest {
                channel: Channel::White,
            }
            .encode(),
        )
        .await
        .unwrap();

        let bytes = stream.next().await.unwrap();
        assert_eq!(
            protocol::decode(&bytes).unwrap(),
            ChannelUpdate::White {
                on: false,
                brightness: 50
            }
        );
    }

    #[tokio::test]
    async fn should_apply_written_commands() {
        let (lamp, _stream) = connected_lamp().await;

        lamp.write(
            CONTROL_CHAR,
            &Command::Brightness {
                channel: Channel::White,
                level: 80,
            }
            .encode(),
        )
        .await
        .unwrap();

        assert_eq!(lamp.firmware().white.brightness, 80);
        assert_eq!(lamp.received().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_write_when_not_connected() {
        let lamp = VirtualLamp::new("00:00:00:00:D0:02");

        let result = lamp
            .write(CONTROL_CHAR, &Command::EnableColor.encode())
            .await;

        assert!(result.is_err());
        assert!(lamp.received().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_malformed_frame() {
        let (lamp, _stream) = connected_lamp().await;

        lamp.write(CONTROL_CHAR, &[1, 2, 3]).await.unwrap();

        assert!(lamp.received().is_empty());
    }

    #[tokio::test]
    async fn should_refuse_connection_when_asked() {
        let lamp = VirtualLamp::new("00:00:00:00:D0:03");
        lamp.refuse_connections(true);

        assert!(lamp.connect().await.is_err());
        assert!(!lamp.is_connected());
        assert_eq!(lamp.connections(), 0);
    }

    #[tokio::test]
    async fn should_hide_notify_characteristic() {
        let lamp = VirtualLamp::new("00:00:00:00:D0:04");
        lamp.hide_notify_characteristic(true);
        lamp.connect().await.unwrap();

        assert_eq!(lamp.discover().await.unwrap(), [CONTROL_CHAR]);
        assert!(lamp.subscribe(NOTIFY_CHAR).await.is_err());
    }

    #[tokio::test]
    async fn should_end_notification_stream_on_disconnect() {
        let (lamp, mut stream) = connected_lamp().await;

        lamp.disconnect().await.unwrap();

        assert!(stream.next().await.is_none());
        assert!(!lamp.is_connected());
    }

    #[tokio::test]
    async fn should_end_notification_stream_when_link_drops() {
        let (lamp, mut stream) = connected_lamp().await;

        lamp.drop_link();

        assert!(stream.next().await.is_none());
        assert!(
            lamp.write(CONTROL_CHAR, &Command::EnableColor.encode())
                .await
                .is_err()
        );
    }
}
