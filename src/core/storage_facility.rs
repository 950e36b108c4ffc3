use std::collections::HashMap;

use crate::domain::model::{EventKind, ParcelId, Rejected, TransitEvent, Withdrawal};
use crate::domain::parcel::Parcel;
use crate::domain::ports::Location;

/// Intermediate or external storage. No slots and no size limits.
#[derive(Debug)]
pub struct StorageFacility {
    name: String,
    parcels: HashMap<ParcelId, Parcel>,
}

impl StorageFacility {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parcels: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn parcels(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values()
    }

    /// Stores under the parcel's id. Whatever was stored under that id before
    /// is handed back.
    pub fn store(&mut self, mut parcel: Parcel) -> Option<Parcel> {
        parcel.add_event(TransitEvent::now(self.name.as_str(), EventKind::Stored));
        tracing::info!("Parcel {} stored in {}", parcel.id(), self.name);
        self.parcels.insert(parcel.id(), parcel)
    }

    pub fn retrieve(&mut self, key: &str) -> Option<Parcel> {
        let Some(id) = self.find(key).map(|p| p.id()) else {
            tracing::debug!("Parcel {} not found in {}", key, self.name);
            return None;
        };
        let mut parcel = self.parcels.remove(&id)?;
        parcel.add_event(TransitEvent::now(self.name.as_str(), EventKind::Retrieved));
        tracing::info!("Parcel {} retrieved from {}", id, self.name);
        Some(parcel)
    }

    pub fn find(&self, key: &str) -> Option<&Parcel> {
        self.parcels.values().find(|p| p.matches(key))
    }

    pub(crate) fn parcel_mut(&mut self, key: &str) -> Option<&mut Parcel> {
        self.parcels.values_mut().find(|p| p.matches(key))
    }
}

impl Location for StorageFacility {
    fn label(&self) -> &str {
        &self.name
    }

    fn find(&self, key: &str) -> Option<&Parcel> {
        StorageFacility::find(self, key)
    }

    fn withdraw(&mut self, key: &str) -> Option<Withdrawal> {
        self.retrieve(key)
            .map(|parcel| Withdrawal { parcel, slot: None })
    }

    fn deposit(&mut self, parcel: Parcel) -> Result<(), Rejected> {
        if let Some(displaced) = self.store(parcel) {
            // ids are generated and parcels are never cloned, so this is the
            // same parcel landing twice
            tracing::warn!(
                "{}: parcel {} was already stored and has been replaced",
                self.name,
                displaced.id()
            );
        }
        Ok(())
    }
}
