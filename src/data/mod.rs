//! Dataset storage: decoded volumes, their metadata and the slot registry.
//!
//! This module provides:
//! - `Volume`/`Slice`: CPU-side representation of a multi-slice, multi-frame image
//! - `MetaData`: key-value metadata attached to a dataset
//! - `DataSlotRegistry`: the indexed set of datasets shown side by side

mod meta;
mod registry;
mod volume;

pub use meta::MetaData;
pub use registry::{DataSlot, DataSlotRegistry, SlotError};
pub use volume::{Insertion, Slice, Volume, VolumeError};
