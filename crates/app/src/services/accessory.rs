//! Accessory — one task per bridged fixture.
//!
//! The task owns the [`LampState`] and the [`ConnectionManager`] and is the
//! only code that touches either. Host requests, link events and the idle
//! timer are merged in one `select!` loop, so a notification can never race
//! the optimistic update of a set-request.
//!
//! The rest of the system talks to the task through a cloneable
//! [`AccessoryHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use duolight_domain::attribute::{Attribute, AttributeValue, AttributeWrite};
use duolight_domain::error::{ConnectionError, DuolightError};
use duolight_domain::event::Event;
use duolight_domain::id::AccessoryId;
use duolight_domain::lamp::{LampSnapshot, LampState};
use duolight_domain::protocol::{self, Channel};

use crate::ports::{EventPublisher, GattLink};
use crate::services::connection::{
    ConnectionManager, ConnectionState, DEFAULT_IDLE_TIMEOUT, LinkEvent,
};

/// Per-accessory tuning shared by every accessory of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorySettings {
    /// Idle period after which the link is closed.
    pub idle_timeout: Duration,
    /// Capacity of the request queue and of the link event queue.
    pub queue_capacity: usize,
}

impl Default for AccessorySettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            queue_capacity: 32,
        }
    }
}

/// Identity of a bridged fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub id: AccessoryId,
    pub name: String,
    pub address: String,
}

/// Full view of one accessory, for diagnostics and the host API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryStatus {
    pub info: AccessoryInfo,
    pub snapshot: LampSnapshot,
    pub white_on: bool,
    pub color_on: bool,
    pub active_channel: Channel,
    pub white_provisional: bool,
    pub color_provisional: bool,
    pub connection: ConnectionState,
}

enum Request {
    Get {
        attribute: Attribute,
        reply: oneshot::Sender<AttributeValue>,
    },
    Set {
        write: AttributeWrite,
        reply: oneshot::Sender<Result<LampSnapshot, ConnectionError>>,
    },
    Status {
        reply: oneshot::Sender<AccessoryStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle on a running accessory task.
#[derive(Clone)]
pub struct AccessoryHandle {
    info: Arc<AccessoryInfo>,
    requests: mpsc::Sender<Request>,
}

impl AccessoryHandle {
    #[must_use]
    pub fn id(&self) -> AccessoryId {
        self.info.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.info.address
    }

    /// Current value of one attribute.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::Unavailable`] if the task has stopped.
    pub async fn get(&self, attribute: Attribute) -> Result<AttributeValue, DuolightError> {
        self.request(|reply| Request::Get { attribute, reply })
            .await
    }

    /// Apply a set-request and wait until its commands are written.
    ///
    /// The model is updated before the first write; it keeps the requested
    /// values even if a write fails.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::Connection`] if connecting or writing fails,
    /// or [`DuolightError::Unavailable`] if the task has stopped.
    pub async fn set(&self, write: AttributeWrite) -> Result<LampSnapshot, DuolightError> {
        let result = self.request(|reply| Request::Set { write, reply }).await?;
        Ok(result?)
    }

    /// Snapshot of the lamp and its link.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::Unavailable`] if the task has stopped.
    pub async fn status(&self) -> Result<AccessoryStatus, DuolightError> {
        self.request(|reply| Request::Status { reply }).await
    }

    /// Disconnect and stop the task. Returns once the link is closed.
    pub async fn shutdown(&self) {
        if let Err(err) = self.request(|reply| Request::Shutdown { reply }).await {
            tracing::debug!(accessory = %self.info.id, %err, "accessory already stopped");
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, DuolightError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| self.unavailable())?;
        response.await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> DuolightError {
        DuolightError::Unavailable(self.info.id.to_string())
    }
}

/// Start the task for one fixture.
///
/// The task connects right away to prime the lamp state and keeps running
/// until [`AccessoryHandle::shutdown`] is called or every handle is dropped.
pub fn spawn<L, P>(
    info: AccessoryInfo,
    link: L,
    publisher: P,
    settings: &AccessorySettings,
) -> (AccessoryHandle, JoinHandle<()>)
where
    L: GattLink,
    P: EventPublisher + Send + Sync + 'static,
{
    let (requests_tx, requests_rx) = mpsc::channel(settings.queue_capacity);
    let (events_tx, events_rx) = mpsc::channel(settings.queue_capacity);

    let mut connection = ConnectionManager::new(settings.idle_timeout, events_tx);
    connection.attach_peripheral(link);

    let info = Arc::new(info);
    let actor = Accessory {
        info: Arc::clone(&info),
        lamp: LampState::default(),
        connection,
        publisher,
        requests: requests_rx,
        link_events: events_rx,
    };

    let task = tokio::spawn(actor.run());
    let handle = AccessoryHandle {
        info,
        requests: requests_tx,
    };
    (handle, task)
}

struct Accessory<L, P> {
    info: Arc<AccessoryInfo>,
    lamp: LampState,
    connection: ConnectionManager<L>,
    publisher: P,
    requests: mpsc::Receiver<Request>,
    link_events: mpsc::Receiver<LinkEvent>,
}

impl<L, P> Accessory<L, P>
where
    L: GattLink,
    P: EventPublisher + Send + Sync + 'static,
{
    async fn run(mut self) {
        if let Err(err) = self.connection.connect().await {
            tracing::warn!(
                accessory = %self.info.id,
                %err,
                "initial connection failed, retrying on next command"
            );
        }

        loop {
            let deadline = self.connection.idle_deadline();
            tokio::select! {
                biased;

                Some(event) = self.link_events.recv() => {
                    self.handle_link_event(event).await;
                }
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    // notifications queued behind the timer still count as activity
                    while let Ok(event) = self.link_events.try_recv() {
                        self.handle_link_event(event).await;
                    }
                    self.connection.disconnect_if_idle().await;
                }
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown { reply }) => {
                        self.connection.disconnect().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(request) => self.handle_request(request).await,
                    None => {
                        self.connection.disconnect().await;
                        break;
                    }
                },
            }
        }

        tracing::debug!(accessory = %self.info.id, "accessory task stopped");
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::Get { attribute, reply } => {
                let _ = reply.send(self.lamp.get(attribute));
            }
            Request::Set { write, reply } => {
                let result = self.set(write).await;
                let _ = reply.send(result);
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn set(&mut self, write: AttributeWrite) -> Result<LampSnapshot, ConnectionError> {
        let commands = self.transition(|lamp| lamp.write(write)).await;

        for command in commands {
            if let Err(err) = self.connection.write(&command.encode()).await {
                tracing::error!(accessory = %self.info.id, %err, ?command, "set-request failed");
                return Err(err);
            }
        }
        Ok(self.lamp.snapshot())
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        if !self.connection.is_current(&event) {
            tracing::trace!(accessory = %self.info.id, "ignoring event from previous link");
            return;
        }

        let bytes = match event {
            LinkEvent::Notification { bytes, .. } => bytes,
            closed @ LinkEvent::Closed { .. } => {
                self.connection.handle_closed(&closed);
                return;
            }
        };

        self.connection.touch();
        match protocol::decode(&bytes) {
            Ok(update) => {
                tracing::debug!(accessory = %self.info.id, ?update, "status applied");
                self.transition(|lamp| lamp.apply(update)).await;
            }
            Err(err) => {
                tracing::warn!(accessory = %self.info.id, %err, "discarding status frame");
            }
        }
    }

    /// Run a state change and push every exposed attribute it moved.
    async fn transition<T>(&mut self, change: impl FnOnce(&mut LampState) -> T) -> T {
        let before = self.lamp.snapshot();
        let output = change(&mut self.lamp);
        let after = self.lamp.snapshot();

        for (attribute, value) in before.changes(&after) {
            let event = Event::attribute_changed(self.info.id, attribute, value);
            if let Err(err) = self.publisher.publish(event).await {
                tracing::warn!(accessory = %self.info.id, %err, "failed to publish update");
            }
        }
        output
    }

    fn status(&self) -> AccessoryStatus {
        AccessoryStatus {
            info: AccessoryInfo::clone(&self.info),
            snapshot: self.lamp.snapshot(),
            white_on: self.lamp.white_on(),
            color_on: self.lamp.color_on(),
            active_channel: self.lamp.active_channel(),
            white_provisional: self.lamp.is_provisional(Channel::White),
            color_provisional: self.lamp.is_provisional(Channel::Color),
            connection: self.connection.state(),
        }
    }
}
