//! GATT link port — the byte-oriented transport to one fixture.
//!
//! The connection manager is the only caller. Implementations wrap a BLE
//! peripheral handle (`duolight-adapter-ble`) or a simulated fixture
//! (`duolight-adapter-virtual`). Every operation may fail with an opaque
//! [`TransportError`]; the caller maps it onto the connection taxonomy.

use std::future::Future;
use std::pin::Pin;

use tokio_stream::Stream;

use duolight_domain::error::TransportError;

/// Stream of raw notification payloads from the notify characteristic.
///
/// Ends when the peripheral drops the link.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// A connection-capable handle on one peripheral.
pub trait GattLink: Send + Sync + 'static {
    /// Stable peripheral address (MAC on Linux/Windows, UUID on macOS).
    fn address(&self) -> String;

    /// Open the link.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Enumerate services and return every characteristic UUID found.
    fn discover(&self) -> impl Future<Output = Result<Vec<uuid::Uuid>, TransportError>> + Send;

    /// Subscribe to a notify characteristic.
    fn subscribe(
        &self,
        characteristic: uuid::Uuid,
    ) -> impl Future<Output = Result<NotificationStream, TransportError>> + Send;

    /// Write bytes to a characteristic.
    fn write(
        &self,
        characteristic: uuid::Uuid,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the link.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Recording in-memory link shared by the service tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    use duolight_domain::protocol::{CONTROL_CHAR, NOTIFY_CHAR};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Connect,
        Discover,
        Subscribe(uuid::Uuid),
        Write(Vec<u8>),
        Disconnect,
    }

    #[derive(Default)]
    struct State {
        calls: Vec<Call>,
        notifier: Option<mpsc::Sender<Vec<u8>>>,
    }

    #[derive(Clone)]
    pub(crate) struct FakeLink {
        address: String,
        state: Arc<Mutex<State>>,
        fail_connect: Arc<AtomicBool>,
        fail_write: Arc<AtomicBool>,
        hide_notify: Arc<AtomicBool>,
    }

    impl FakeLink {
        pub(crate) fn new(address: &str) -> Self {
            Self {
                address: address.to_string(),
                state: Arc::default(),
                fail_connect: Arc::default(),
                fail_write: Arc::default(),
                hide_notify: Arc::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        pub(crate) fn count(&self, call: &Call) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }

        pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Write(bytes) => Some(bytes),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn clear(&self) {
            self.state.lock().unwrap().calls.clear();
        }

        pub(crate) fn fail_connect(&self, fail: bool) {
            self.fail_connect.store(fail, Ordering::SeqCst);
        }

        pub(crate) fn fail_write(&self, fail: bool) {
            self.fail_write.store(fail, Ordering::SeqCst);
        }

        pub(crate) fn hide_notify_characteristic(&self) {
            self.hide_notify.store(true, Ordering::SeqCst);
        }

        /// Push a notification through the current subscription.
        pub(crate) async fn notify(&self, bytes: Vec<u8>) {
            let notifier = self.state.lock().unwrap().notifier.clone();
            notifier
                .expect("no active subscription")
                .send(bytes)
                .await
                .unwrap();
        }

        /// End the current notification stream, as a dropped link would.
        pub(crate) fn drop_stream(&self) {
            self.state.lock().unwrap().notifier = None;
        }

        fn record(&self, call: Call) {
            self.state.lock().unwrap().calls.push(call);
        }
    }

    impl GattLink for FakeLink {
        fn address(&self) -> String {
            self.address.clone()
        }

        async fn connect(&self) -> Result<(), TransportError> {
            self.record(Call::Connect);
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err("connection refused".into());
            }
            Ok(())
        }

        async fn discover(&self) -> Result<Vec<uuid::Uuid>, TransportError> {
            self.record(Call::Discover);
            if self.hide_notify.load(Ordering::SeqCst) {
                return Ok(vec![CONTROL_CHAR]);
            }
            Ok(vec![CONTROL_CHAR, NOTIFY_CHAR])
        }

        async fn subscribe(
            &self,
            characteristic: uuid::Uuid,
        ) -> Result<NotificationStream, TransportError> {
            self.record(Call::Subscribe(characteristic));
            let (tx, rx) = mpsc::channel(16);
            self.state.lock().unwrap().notifier = Some(tx);
            Ok(Box::pin(ReceiverStream::new(rx)))
        }

        async fn write(
            &self,
            _characteristic: uuid::Uuid,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            self.record(Call::Write(bytes.to_vec()));
            if self.fail_write.load(Ordering::SeqCst) {
                return Err("write rejected".into());
            }
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.record(Call::Disconnect);
            self.state.lock().unwrap().notifier = None;
            Ok(())
        }
    }
}
