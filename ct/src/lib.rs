//! CargoTruck - cross-process cargo exchange
//!
//! One process loads typed values into a truck and delivers the whole load
//! to an address; another process waits for that address, merges the load
//! into its own truck, and unloads values by type.
//!
//! # Architecture
//!
//! ```text
//! {base_dir}/
//! └── {channel}/
//!     ├── addr1          # one serialized CargoContainer, no header
//!     ├── addr2
//!     └── .addr1.staging # in-flight publish, renamed over addr1
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cargotruck::Truck;
//! use std::time::Duration;
//!
//! // producer
//! let truck = Truck::new("grapple", "/tmp/cargo")?;
//! truck.load(&42i64)?;
//! truck.load(&"hello".to_string())?;
//! truck.deliver("addr1")?;
//!
//! // consumer, in another process
//! let truck = Truck::new("grapple", "/tmp/cargo")?;
//! let delivery = truck.await_delivery("addr1", Duration::from_secs(5)).await??;
//! let numbers: Vec<i64> = truck.unload()?;
//! ```

use std::time::Duration;

pub mod channel;
pub mod cli;
pub mod config;
mod container;
mod error;
mod grapple;
mod key;
mod registry;
mod truck;

pub use channel::Channel;
pub use container::CargoContainer;
pub use error::{ChannelError, CodecError, GrappleError, TruckError};
pub use grapple::{BincodeGrapple, Grapple};
pub use key::TypeKey;
pub use registry::{ExactHierarchy, TypeHierarchy, TypeRegistry};
pub use truck::{Delivery, Truck, TruckBuilder};

/// Default channel name
pub const DEFAULT_CHANNEL: &str = "grapple";

/// Default wait budget for a delivery (5s)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default delay between polls (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
