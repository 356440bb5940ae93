//! Load / deliver / unload facade over a cargo container and its channel

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::channel::Channel;
use crate::container::CargoContainer;
use crate::error::TruckError;
use crate::grapple::{BincodeGrapple, Grapple};
use crate::key::TypeKey;
use crate::registry::TypeRegistry;

/// Outcome of waiting for a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A snapshot was read and merged; `items` is the number of payloads it held
    Received { items: usize },

    /// The time budget ran out before anything was published
    TimedOut,
}

impl Delivery {
    pub fn is_received(&self) -> bool {
        matches!(self, Delivery::Received { .. })
    }
}

struct TruckInner<G: Grapple> {
    channel: Channel,
    grapple: G,
    registry: TypeRegistry<G>,
    poll_interval: Duration,
    container: RwLock<CargoContainer>,
}

/// A cargo container bound to a channel
///
/// Cloning is cheap and yields a handle to the same container, which is how
/// [`Truck::await_delivery`] merges from a background task.
pub struct Truck<G: Grapple = BincodeGrapple> {
    inner: Arc<TruckInner<G>>,
}

impl<G: Grapple> Clone for Truck<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Truck<BincodeGrapple> {
    /// Truck with the default gateway, rooted at `base_dir`
    pub fn new(name: &str, base_dir: impl AsRef<Path>) -> Result<Self, TruckError> {
        TruckBuilder::new(name).base_dir(base_dir).build()
    }

    pub fn builder(name: &str) -> TruckBuilder<BincodeGrapple> {
        TruckBuilder::new(name)
    }
}

impl<G: Grapple> Truck<G> {
    pub fn name(&self) -> &str {
        self.inner.channel.name()
    }

    pub fn channel(&self) -> &Channel {
        &self.inner.channel
    }

    pub fn registry(&self) -> &TypeRegistry<G> {
        &self.inner.registry
    }

    /// Number of payloads currently held
    pub fn cargo_count(&self) -> usize {
        self.read_container().len()
    }

    /// Snapshot of the current container
    pub fn container(&self) -> CargoContainer {
        self.read_container().clone()
    }

    fn read_container(&self) -> RwLockReadGuard<'_, CargoContainer> {
        self.inner.container.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_container(&self) -> RwLockWriteGuard<'_, CargoContainer> {
        self.inner.container.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialize `item` and queue it; equal items are kept as separate entries
    pub fn load<T: Serialize + 'static>(&self, item: &T) -> Result<(), TruckError> {
        let (type_key, bytes) = self.inner.grapple.grab(item).inspect_err(|e| {
            error!(error = %e, "Error loading cargo");
        })?;
        debug!(%type_key, len = bytes.len(), "Cargo loaded");
        self.write_container().insert(type_key, bytes);
        Ok(())
    }

    /// Publish the whole container to `address`, replacing what was there
    pub fn deliver(&self, address: &str) -> Result<(), TruckError> {
        info!(truck = %self.name(), address, "Delivering cargo");

        let result = self.publish_snapshot(address);
        match &result {
            Ok(items) => info!(address, items, "Cargo delivered"),
            Err(e) => error!(address, error = %e, "Error during delivery"),
        }
        result.map(|_| ())
    }

    fn publish_snapshot(&self, address: &str) -> Result<usize, TruckError> {
        let (bytes, items) = {
            let container = self.read_container();
            let (_, bytes) = self.inner.grapple.grab(&*container)?;
            (bytes, container.len())
        };
        self.inner.channel.publish(address, &bytes)?;
        Ok(items)
    }

    /// All items assignable to `T`, decoded as `T`
    pub fn unload<T: DeserializeOwned + 'static>(&self) -> Result<Vec<T>, TruckError> {
        self.unload_iter().collect()
    }

    /// Lazily decoding variant of [`Truck::unload`]
    ///
    /// Matching payloads are copied out when called; decoding happens per item.
    /// Nothing is removed from the container.
    pub fn unload_iter<T: DeserializeOwned + 'static>(&self) -> impl Iterator<Item = Result<T, TruckError>> + '_ {
        let target = TypeKey::of::<T>();
        debug!(%target, "Unloading cargo");

        let payloads: Vec<Vec<u8>> = self
            .read_container()
            .lookup_assignable(&target, &self.inner.registry)
            .into_iter()
            .map(|(_, bytes)| bytes.to_vec())
            .collect();

        payloads
            .into_iter()
            .map(move |bytes| self.inner.grapple.release::<T>(&bytes).map_err(TruckError::from))
    }

    /// All items assignable to `target`, each decoded as its own stored type
    ///
    /// Every stored key must be registered in the truck's [`TypeRegistry`].
    pub fn unload_as(&self, target: &TypeKey) -> Result<Vec<Box<dyn Any + Send>>, TruckError> {
        debug!(%target, "Unloading cargo by key");

        let container = self.read_container();
        container
            .lookup_assignable(target, &self.inner.registry)
            .into_iter()
            .map(|(key, bytes)| {
                self.inner
                    .grapple
                    .release_as(bytes, key, &self.inner.registry)
                    .map_err(TruckError::from)
            })
            .collect()
    }

    /// Decode whatever is published at `address` without merging it
    pub fn peek(&self, address: &str) -> Result<Option<CargoContainer>, TruckError> {
        let buffer = self.inner.channel.poll(address)?;
        if buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.inner.grapple.release::<CargoContainer>(&buffer)?))
    }

    /// Poll `address` until a snapshot appears or `timeout` passes
    ///
    /// A received snapshot is merged after the local cargo. Blocks the calling
    /// thread; a zero timeout returns [`Delivery::TimedOut`] without polling.
    /// Transport and decode failures end the wait immediately. A timeout too
    /// large to represent as a deadline, such as `Duration::MAX`, waits until
    /// a snapshot arrives.
    pub fn wait_for_delivery(&self, address: &str, timeout: Duration) -> Result<Delivery, TruckError> {
        if timeout.is_zero() {
            debug!(address, "Zero timeout, not waiting");
            return Ok(Delivery::TimedOut);
        }

        // None: no representable deadline, poll until something arrives
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let buffer = self.inner.channel.poll(address).inspect_err(|e| {
                error!(address, error = %e, "Error waiting for truck");
            })?;

            if !buffer.is_empty() {
                let incoming: CargoContainer = self.inner.grapple.release(&buffer).inspect_err(|e| {
                    error!(address, error = %e, "Error unpacking delivered cargo");
                })?;
                let items = incoming.len();

                let mut container = self.write_container();
                *container = container.merge_left(&incoming);
                info!(address, items, total = container.len(), "Delivery merged");
                return Ok(Delivery::Received { items });
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        info!(address, ?timeout, "No delivery before timeout");
                        return Ok(Delivery::TimedOut);
                    }
                    self.inner.poll_interval.min(deadline - now)
                }
                None => self.inner.poll_interval,
            };
            thread::sleep(pause);
        }
    }

    /// Run [`Truck::wait_for_delivery`] on a blocking background task
    ///
    /// Must be called within a tokio runtime. The caller may wrap the handle
    /// in its own timeout; an in-progress file read is never interrupted.
    pub fn await_delivery(&self, address: &str, timeout: Duration) -> JoinHandle<Result<Delivery, TruckError>> {
        let truck = self.clone();
        let address = address.to_string();
        tokio::task::spawn_blocking(move || truck.wait_for_delivery(&address, timeout))
    }
}

/// Builder for a [`Truck`]
pub struct TruckBuilder<G: Grapple = BincodeGrapple> {
    name: String,
    base_dir: PathBuf,
    grapple: G,
    registry: TypeRegistry<G>,
    poll_interval: Duration,
}

impl TruckBuilder<BincodeGrapple> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_dir: crate::config::default_base_dir(),
            grapple: BincodeGrapple,
            registry: TypeRegistry::new(),
            poll_interval: crate::DEFAULT_POLL_INTERVAL,
        }
    }
}

impl<G: Grapple> TruckBuilder<G> {
    pub fn base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn registry(mut self, registry: TypeRegistry<G>) -> Self {
        self.registry = registry;
        self
    }

    /// Swap the gateway; resets the registry since decoders are codec bound
    pub fn grapple<H: Grapple>(self, grapple: H) -> TruckBuilder<H> {
        TruckBuilder {
            name: self.name,
            base_dir: self.base_dir,
            grapple,
            registry: TypeRegistry::new(),
            poll_interval: self.poll_interval,
        }
    }

    pub fn build(self) -> Result<Truck<G>, TruckError> {
        info!(truck = %self.name, base_dir = ?self.base_dir, "Setting up truck");
        let channel = Channel::open(&self.base_dir, &self.name)?;
        Ok(Truck {
            inner: Arc::new(TruckInner {
                channel,
                grapple: self.grapple,
                registry: self.registry,
                poll_interval: self.poll_interval,
                container: RwLock::new(CargoContainer::new()),
            }),
        })
    }
}
