//! Bridge — the platform object that owns every bridged accessory.
//!
//! Integrations report peripherals through [`DiscoveryHandler`]; the bridge
//! turns each new address into a running accessory task and keeps the
//! registry the host surface reads from. Everything an accessory needs is
//! handed over through the [`BridgeContext`] given at construction.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use duolight_domain::error::{DuolightError, NotFoundError};
use duolight_domain::event::Event;
use duolight_domain::id::AccessoryId;

use crate::ports::{DiscoveryHandler, EventPublisher, GattLink};
use crate::services::accessory::{self, AccessoryHandle, AccessoryInfo, AccessorySettings};

/// Dependencies shared by the bridge and every accessory it spawns.
#[derive(Clone)]
pub struct BridgeContext<P> {
    pub publisher: P,
    pub settings: AccessorySettings,
    /// Display names keyed by uppercase peripheral address.
    pub names: HashMap<String, String>,
}

impl<P> BridgeContext<P> {
    #[must_use]
    pub fn new(publisher: P, settings: AccessorySettings) -> Self {
        Self {
            publisher,
            settings,
            names: HashMap::new(),
        }
    }

    /// Name the peripheral at `address`.
    #[must_use]
    pub fn with_name(mut self, address: &str, name: impl Into<String>) -> Self {
        self.names
            .insert(address.to_ascii_uppercase(), name.into());
        self
    }

    fn name_for(&self, address: &str) -> String {
        self.names
            .get(&address.to_ascii_uppercase())
            .cloned()
            .unwrap_or_else(|| format!("Lamp {address}"))
    }
}

struct Inner<P> {
    context: BridgeContext<P>,
    accessories: RwLock<HashMap<AccessoryId, AccessoryHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Registry of bridged accessories. Cheap to clone.
pub struct Bridge<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for Bridge<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Bridge<P>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(context: BridgeContext<P>) -> Self {
        Self {
            inner: Arc::new(Inner {
                context,
                accessories: RwLock::new(HashMap::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Every accessory, sorted by name.
    pub async fn list(&self) -> Vec<AccessoryHandle> {
        let mut handles: Vec<_> = self.inner.accessories.read().await.values().cloned().collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));
        handles
    }

    /// Look up an accessory by id.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::NotFound`] when no accessory has this id.
    pub async fn get(&self, id: AccessoryId) -> Result<AccessoryHandle, DuolightError> {
        self.inner
            .accessories
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Accessory",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// Disconnect every accessory and wait for their tasks to stop.
    pub async fn shutdown(&self) {
        let handles = self.list().await;
        for handle in &handles {
            handle.shutdown().await;
        }

        let tasks = std::mem::take(&mut *self.inner.tasks.lock().await);
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!(%err, "accessory task ended abnormally");
            }
        }
        tracing::info!(count = handles.len(), "bridge stopped");
    }
}

impl<P> DiscoveryHandler for Bridge<P>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    async fn peripheral_discovered<L: GattLink>(
        &self,
        link: L,
    ) -> Result<AccessoryId, DuolightError> {
        let address = link.address();
        let id = AccessoryId::from_address(&address);

        let info = {
            let mut accessories = self.inner.accessories.write().await;
            if accessories.contains_key(&id) {
                tracing::debug!(accessory = %id, %address, "peripheral already bridged");
                return Ok(id);
            }

            let info = AccessoryInfo {
                id,
                name: self.inner.context.name_for(&address),
                address,
            };
            let (handle, task) = accessory::spawn(
                info.clone(),
                link,
                self.inner.context.publisher.clone(),
                &self.inner.context.settings,
            );
            accessories.insert(id, handle);
            self.inner.tasks.lock().await.push(task);
            info
        };

        tracing::info!(
            accessory = %info.id,
            address = %info.address,
            name = %info.name,
            "accessory registered"
        );

        self.inner
            .context
            .publisher
            .publish(Event::accessory_added(info.id, info.name, info.address))
            .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::ports::link::fake::{Call, FakeLink};

    fn bridge() -> (Bridge<Arc<InProcessEventBus>>, Arc<InProcessEventBus>) {
        let bus = Arc::new(InProcessEventBus::new(32));
        let context = BridgeContext::new(Arc::clone(&bus), AccessorySettings::default())
            .with_name("aa:bb:cc:00:00:01", "Desk");
        (Bridge::new(context), bus)
    }

    #[tokio::test]
    async fn should_register_discovered_peripheral() {
        let (bridge, bus) = bridge();
        let mut rx = bus.subscribe();

        let id = bridge
            .peripheral_discovered(FakeLink::new("AA:BB:CC:00:00:01"))
            .await
            .unwrap();

        let handle = bridge.get(id).await.unwrap();
        assert_eq!(handle.name(), "Desk");
        assert_eq!(handle.address(), "AA:BB:CC:00:00:01");
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::AccessoryAdded { ref name, .. } if name == "Desk"
        ));
    }

    #[tokio::test]
    async fn should_default_name_from_address() {
        let (bridge, _bus) = bridge();

        let id = bridge
            .peripheral_discovered(FakeLink::new("AA:BB:CC:00:00:02"))
            .await
            .unwrap();

        assert_eq!(
            bridge.get(id).await.unwrap().name(),
            "Lamp AA:BB:CC:00:00:02"
        );
    }

    #[tokio::test]
    async fn should_keep_existing_accessory_on_rediscovery() {
        let (bridge, _bus) = bridge();
        let first = FakeLink::new("AA:BB:CC:00:00:03");
        let second = FakeLink::new("AA:BB:CC:00:00:03");

        let id = bridge.peripheral_discovered(first.clone()).await.unwrap();
        let again = bridge.peripheral_discovered(second.clone()).await.unwrap();

        assert_eq!(id, again);
        assert_eq!(bridge.list().await.len(), 1);
        bridge.get(id).await.unwrap().status().await.unwrap();
        assert!(second.calls().is_empty());
        assert_eq!(first.count(&Call::Connect), 1);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_id() {
        let (bridge, _bus) = bridge();

        let result = bridge.get(AccessoryId::new()).await;

        assert!(matches!(result, Err(DuolightError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_list_accessories_sorted_by_name() {
        let (bridge, _bus) = bridge();
        bridge
            .peripheral_discovered(FakeLink::new("AA:BB:CC:00:00:09"))
            .await
            .unwrap();
        bridge
            .peripheral_discovered(FakeLink::new("AA:BB:CC:00:00:01"))
            .await
            .unwrap();

        let names: Vec<_> = bridge
            .list()
            .await
            .iter()
            .map(|handle| handle.name().to_string())
            .collect();
        assert_eq!(names, ["Desk", "Lamp AA:BB:CC:00:00:09"]);
    }

    #[tokio::test]
    async fn should_disconnect_every_accessory_on_shutdown() {
        let (bridge, _bus) = bridge();
        let link = FakeLink::new("AA:BB:CC:00:00:04");
        let id = bridge.peripheral_discovered(link.clone()).await.unwrap();
        let handle = bridge.get(id).await.unwrap();

        bridge.shutdown().await;

        assert_eq!(link.count(&Call::Disconnect), 1);
        assert!(matches!(
            handle.status().await,
            Err(DuolightError::Unavailable(_))
        ));
    }
}
