//! Indexed storage of the datasets currently loaded.

use std::collections::BTreeMap;

use super::meta::MetaData;
use super::volume::{Insertion, Volume, VolumeError};
use crate::layers::LayerId;

/// Errors from slot operations. The orchestrator logs these; they never abort a load.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlotError {
    /// `update_current` was called before any slot was created.
    #[error("No current data slot to update")]
    NoCurrentSlot,

    /// No slot exists at the requested index.
    #[error("No data slot at index {0}")]
    UnknownSlot(usize),

    /// The appended image could not be merged into the slot's volume.
    #[error("Cannot extend data slot {index}: {source}")]
    Volume {
        index: usize,
        #[source]
        source: VolumeError,
    },
}

/// One loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSlot {
    pub index: usize,
    pub image: Volume,
    pub meta: MetaData,
}

/// Holds the datasets of the application, keyed by index.
///
/// Indices are handed out in increasing order and restart at zero after
/// [`reset`](Self::reset). The slot created last is the current one.
#[derive(Debug, Default)]
pub struct DataSlotRegistry {
    slots: BTreeMap<usize, DataSlot>,
    current: Option<usize>,
    /// Layers to notify when the image of a slot changes.
    image_listeners: BTreeMap<usize, Vec<LayerId>>,
}

impl DataSlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new dataset under the next free index and make it current.
    pub fn add_new(&mut self, image: Volume, meta: MetaData) -> usize {
        let index = self.slots.last_key_value().map_or(0, |(last, _)| last + 1);
        log::debug!(
            "DataSlotRegistry: new slot {} ({}x{}, {} slice(s))",
            index,
            image.columns(),
            image.rows(),
            image.number_of_slices()
        );
        self.slots.insert(index, DataSlot { index, image, meta });
        self.current = Some(index);
        index
    }

    /// Append the slices of `image` to the current slot.
    ///
    /// Returns the insertion index of the (first) new slice in the slot's slice
    /// order. On error the slot is left unchanged.
    pub fn update_current(&mut self, image: Volume, meta: MetaData) -> Result<Insertion, SlotError> {
        let index = self.current.ok_or(SlotError::NoCurrentSlot)?;
        let slot = self
            .slots
            .get_mut(&index)
            .ok_or(SlotError::UnknownSlot(index))?;
        let inserted = slot
            .image
            .append(image)
            .map_err(|source| SlotError::Volume { index, source })?;
        slot.meta.merge(meta);
        log::trace!(
            "DataSlotRegistry: slot {} {} slice(s) inserted from {} (now {})",
            index,
            inserted.count(),
            inserted.first(),
            slot.image.number_of_slices()
        );
        Ok(inserted)
    }

    pub fn get(&self, index: usize) -> Option<&DataSlot> {
        self.slots.get(&index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The current slot, if any.
    pub fn current(&self) -> Option<&DataSlot> {
        self.current.and_then(|index| self.slots.get(&index))
    }

    /// Replace the image of a slot, returning the previous one.
    pub fn set_image(&mut self, index: usize, image: Volume) -> Result<Volume, SlotError> {
        let slot = self
            .slots
            .get_mut(&index)
            .ok_or(SlotError::UnknownSlot(index))?;
        Ok(std::mem::replace(&mut slot.image, image))
    }

    pub fn image_mut(&mut self, index: usize) -> Option<&mut Volume> {
        self.slots.get_mut(&index).map(|slot| &mut slot.image)
    }

    /// Register a layer for image-change notifications of a slot.
    pub fn add_image_listener(&mut self, index: usize, layer: LayerId) {
        let listeners = self.image_listeners.entry(index).or_default();
        if !listeners.contains(&layer) {
            listeners.push(layer);
        }
    }

    /// Layers registered for a slot, in registration order.
    pub fn image_listeners(&self, index: usize) -> &[LayerId] {
        self.image_listeners
            .get(&index)
            .map_or(&[], Vec::as_slice)
    }

    /// Drop every slot and listener registration.
    pub fn reset(&mut self) {
        log::debug!("DataSlotRegistry: reset ({} slot(s))", self.slots.len());
        self.slots.clear();
        self.image_listeners.clear();
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataSlot> {
        self.slots.values()
    }
}
