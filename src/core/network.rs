use serde::Serialize;

use crate::core::locker::Locker;
use crate::core::storage_facility::StorageFacility;
use crate::domain::model::LocationId;
use crate::domain::parcel::Parcel;
use crate::domain::ports::{Location, LocationRegistry};
use crate::utils::error::{LockerError, Result};

#[derive(Debug)]
pub enum NetworkNode {
    Locker(Locker),
    Group(LockerNetwork),
}

/// Where a parcel currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Placement {
    Slot { locker: String, slot: usize },
    Expected { locker: String },
    Facility { name: String },
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Slot { locker, slot } => write!(f, "locker {} slot {}", locker, slot),
            Placement::Expected { locker } => write!(f, "expected at locker {}", locker),
            Placement::Facility { name } => write!(f, "{}", name),
        }
    }
}

#[derive(Debug)]
pub struct ParcelLookup<'a> {
    pub parcel: &'a Parcel,
    pub placement: Placement,
}

/// Lockers (possibly grouped into sub-networks) and storage facilities.
///
/// Identifiers are unique across the whole tree, so every query works the
/// same no matter how deep a locker sits.
#[derive(Debug)]
pub struct LockerNetwork {
    name: String,
    nodes: Vec<NetworkNode>,
    facilities: Vec<StorageFacility>,
}

impl LockerNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            facilities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn add_locker(&mut self, locker: Locker) -> Result<()> {
        if self.locker(locker.identifier()).is_some() {
            return Err(LockerError::DuplicateLocker {
                id: locker.identifier().to_string(),
            });
        }
        tracing::debug!("{}: registered locker {}", self.name, locker.identifier());
        self.nodes.push(NetworkNode::Locker(locker));
        Ok(())
    }

    pub fn add_group(&mut self, group: LockerNetwork) -> Result<()> {
        if let Some(clash) = group
            .lockers()
            .into_iter()
            .find(|l| self.locker(l.identifier()).is_some())
        {
            return Err(LockerError::DuplicateLocker {
                id: clash.identifier().to_string(),
            });
        }
        if let Some(clash) = group
            .facilities()
            .into_iter()
            .find(|f| self.facility(f.name()).is_some())
        {
            return Err(LockerError::DuplicateFacility {
                name: clash.name().to_string(),
            });
        }
        tracing::debug!("{}: registered group {}", self.name, group.name);
        self.nodes.push(NetworkNode::Group(group));
        Ok(())
    }

    pub fn add_facility(&mut self, facility: StorageFacility) -> Result<()> {
        if self.facility(facility.name()).is_some() {
            return Err(LockerError::DuplicateFacility {
                name: facility.name().to_string(),
            });
        }
        tracing::debug!("{}: registered facility {}", self.name, facility.name());
        self.facilities.push(facility);
        Ok(())
    }

    /// Takes a locker out of the network, parcels and all.
    pub fn remove_locker(&mut self, id: &str) -> Option<Locker> {
        let position = self
            .nodes
            .iter()
            .position(|node| matches!(node, NetworkNode::Locker(l) if l.identifier() == id));
        if let Some(index) = position {
            return match self.nodes.remove(index) {
                NetworkNode::Locker(locker) => Some(locker),
                NetworkNode::Group(_) => None,
            };
        }
        self.nodes.iter_mut().find_map(|node| match node {
            NetworkNode::Group(group) => group.remove_locker(id),
            NetworkNode::Locker(_) => None,
        })
    }

    /// Every locker in the tree, depth first in registration order.
    pub fn lockers(&self) -> Vec<&Locker> {
        let mut out = Vec::new();
        for node in &self.nodes {
            match node {
                NetworkNode::Locker(locker) => out.push(locker),
                NetworkNode::Group(group) => out.extend(group.lockers()),
            }
        }
        out
    }

    pub fn facilities(&self) -> Vec<&StorageFacility> {
        let mut out: Vec<&StorageFacility> = self.facilities.iter().collect();
        for node in &self.nodes {
            if let NetworkNode::Group(group) = node {
                out.extend(group.facilities());
            }
        }
        out
    }

    pub fn locker(&self, id: &str) -> Option<&Locker> {
        self.lockers().into_iter().find(|l| l.identifier() == id)
    }

    pub fn locker_mut(&mut self, id: &str) -> Option<&mut Locker> {
        for node in &mut self.nodes {
            match node {
                NetworkNode::Locker(locker) if locker.identifier() == id => return Some(locker),
                NetworkNode::Group(group) => {
                    if let Some(locker) = group.locker_mut(id) {
                        return Some(locker);
                    }
                }
                NetworkNode::Locker(_) => {}
            }
        }
        None
    }

    pub fn facility(&self, name: &str) -> Option<&StorageFacility> {
        self.facilities().into_iter().find(|f| f.name() == name)
    }

    pub fn facility_mut(&mut self, name: &str) -> Option<&mut StorageFacility> {
        if let Some(index) = self.facilities.iter().position(|f| f.name() == name) {
            return self.facilities.get_mut(index);
        }
        self.nodes.iter_mut().find_map(|node| match node {
            NetworkNode::Group(group) => group.facility_mut(name),
            NetworkNode::Locker(_) => None,
        })
    }

    /// Renames a locker, keeping identifiers unique across the network.
    pub fn rename_locker(&mut self, id: &str, new_id: &str, new_address: &str) -> Result<()> {
        if new_id != id && self.locker(new_id).is_some() {
            return Err(LockerError::DuplicateLocker {
                id: new_id.to_string(),
            });
        }
        let locker = self
            .locker_mut(id)
            .ok_or_else(|| LockerError::UnknownLocker { id: id.to_string() })?;
        locker.update_details(new_id, new_address)
    }

    /// Read-only search: slots first, then storage facilities, then parcels
    /// that are only expected somewhere.
    pub fn find_parcel(&self, key: &str) -> Option<ParcelLookup<'_>> {
        let lockers = self.lockers();

        for locker in &lockers {
            for (index, slot) in locker.slots().iter().enumerate() {
                if let Some(parcel) = slot.current_parcel().filter(|p| p.matches(key)) {
                    return Some(ParcelLookup {
                        parcel,
                        placement: Placement::Slot {
                            locker: locker.identifier().to_string(),
                            slot: index,
                        },
                    });
                }
            }
        }

        for facility in self.facilities() {
            if let Some(parcel) = facility.find(key) {
                return Some(ParcelLookup {
                    parcel,
                    placement: Placement::Facility {
                        name: facility.name().to_string(),
                    },
                });
            }
        }

        lockers.into_iter().find_map(|locker| {
            locker.find_expected(key).map(|parcel| ParcelLookup {
                parcel,
                placement: Placement::Expected {
                    locker: locker.identifier().to_string(),
                },
            })
        })
    }

    /// Mutable access to a parcel wherever it is, without moving it.
    pub fn parcel_mut(&mut self, key: &str) -> Option<&mut Parcel> {
        let placement = self.find_parcel(key)?.placement;
        match placement {
            Placement::Slot { locker, .. } | Placement::Expected { locker } => {
                self.locker_mut(&locker)?.parcel_mut(key)
            }
            Placement::Facility { name } => self.facility_mut(&name)?.parcel_mut(key),
        }
    }

    /// Parcels in slots, in facilities and expected at lockers.
    pub fn parcel_count(&self) -> usize {
        let lockers = self.lockers();
        let in_lockers: usize = lockers
            .iter()
            .map(|l| l.occupied_count() + l.expected_parcels().len())
            .sum();
        let in_storage: usize = self.facilities().iter().map(|f| f.len()).sum();
        in_lockers + in_storage
    }
}

impl LocationRegistry for LockerNetwork {
    fn location_mut(&mut self, id: &LocationId) -> Option<&mut dyn Location> {
        match id {
            LocationId::Locker(locker) => self
                .locker_mut(locker)
                .map(|locker| locker as &mut dyn Location),
            LocationId::Facility(name) => self
                .facility_mut(name)
                .map(|facility| facility as &mut dyn Location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Contact, ParcelSize};

    fn paid(size: ParcelSize) -> Parcel {
        let mut p = Parcel::create(
            Contact::new("Alice", "555-0100"),
            Contact::new("Bob", "555-0199"),
            size,
            [],
        );
        p.mark_paid().unwrap();
        p
    }

    fn network() -> LockerNetwork {
        let mut north = LockerNetwork::new("North");
        north
            .add_locker(Locker::new("456", "456 Road, City B").with_slots([ParcelSize::M]))
            .unwrap();
        north
            .add_facility(StorageFacility::new("External Storage"))
            .unwrap();

        let mut root = LockerNetwork::new("City");
        root.add_locker(Locker::new("123", "123 Street, City A").with_slots([ParcelSize::S]))
            .unwrap();
        root.add_group(north).unwrap();
        root.add_facility(StorageFacility::new("Intermediate Store"))
            .unwrap();
        root
    }

    #[test]
    fn test_lists_lockers_across_groups() {
        let net = network();
        let ids: Vec<&str> = net.lockers().iter().map(|l| l.identifier()).collect();
        assert_eq!(ids, vec!["123", "456"]);
        assert!(net.locker("456").is_some());
        assert!(net.locker("999").is_none());
        assert_eq!(net.facilities().len(), 2);
        assert!(net.facility("External Storage").is_some());
    }

    #[test]
    fn test_rejects_duplicate_identifiers() {
        let mut net = network();
        let err = net
            .add_locker(Locker::new("456", "Elsewhere"))
            .unwrap_err();
        assert!(matches!(err, LockerError::DuplicateLocker { .. }));

        let mut group = LockerNetwork::new("South");
        group.add_locker(Locker::new("123", "Copy")).unwrap();
        assert!(net.add_group(group).is_err());

        assert!(net
            .add_facility(StorageFacility::new("External Storage"))
            .is_err());
    }

    #[test]
    fn test_find_is_read_only() {
        let mut net = network();
        let p = paid(ParcelSize::M);
        let id = p.id().to_string();
        net.locker_mut("456").unwrap().receive(p).unwrap();

        let lookup = net.find_parcel(&id).unwrap();
        assert_eq!(
            lookup.placement,
            Placement::Slot {
                locker: "456".to_string(),
                slot: 0
            }
        );
        // still there after looking
        assert!(net.find_parcel(&id).is_some());
        assert_eq!(net.locker("456").unwrap().occupied_count(), 1);
    }

    #[test]
    fn test_find_in_facility_and_expected() {
        let mut net = network();
        let stored = paid(ParcelSize::L);
        let stored_id = stored.id().to_string();
        net.facility_mut("External Storage").unwrap().store(stored);

        let expected = paid(ParcelSize::S);
        let code = expected.temp_code().unwrap().to_string();
        net.locker_mut("123").unwrap().add_expected_parcel(expected);

        assert_eq!(
            net.find_parcel(&stored_id).unwrap().placement,
            Placement::Facility {
                name: "External Storage".to_string()
            }
        );
        assert_eq!(
            net.find_parcel(&code).unwrap().placement,
            Placement::Expected {
                locker: "123".to_string()
            }
        );
        assert_eq!(net.parcel_count(), 2);
    }

    #[test]
    fn test_parcel_mut_does_not_move() {
        let mut net = network();
        let p = paid(ParcelSize::S);
        let id = p.id().to_string();
        net.locker_mut("123").unwrap().receive(p).unwrap();

        let old_code = net.parcel_mut(&id).unwrap().temp_code().unwrap().to_string();
        let new_code = net
            .parcel_mut(&id)
            .unwrap()
            .reissue_temp_code()
            .unwrap()
            .to_string();

        assert_ne!(old_code, new_code);
        assert!(net.find_parcel(&old_code).is_none());
        assert!(net.locker("123").unwrap().find(&new_code).is_some());
        assert_eq!(net.locker("123").unwrap().occupied_count(), 1);
    }

    #[test]
    fn test_rename_locker() {
        let mut net = network();
        net.rename_locker("456", "789", "789 Avenue").unwrap();
        assert!(net.locker("789").is_some());
        assert!(net.locker("456").is_none());

        assert!(matches!(
            net.rename_locker("789", "123", "Clash"),
            Err(LockerError::DuplicateLocker { .. })
        ));
        assert!(matches!(
            net.rename_locker("000", "001", "Nowhere"),
            Err(LockerError::UnknownLocker { .. })
        ));
    }

    #[test]
    fn test_rename_busy_locker_keeps_its_id() {
        let mut net = network();
        net.locker_mut("123").unwrap().receive(paid(ParcelSize::S)).unwrap();

        assert!(matches!(
            net.rename_locker("123", "999", "Elsewhere"),
            Err(LockerError::LockerBusy { .. })
        ));
        assert!(net.locker("123").is_some());
        assert!(net.locker("999").is_none());
    }

    #[test]
    fn test_remove_nested_locker() {
        let mut net = network();
        let removed = net.remove_locker("456").unwrap();
        assert_eq!(removed.identifier(), "456");
        assert!(net.locker("456").is_none());
        assert!(net.remove_locker("456").is_none());
    }

    #[test]
    fn test_location_registry_resolves_both_kinds() {
        let mut net = network();
        let locker = net
            .location_mut(&LocationId::Locker("123".to_string()))
            .unwrap();
        assert_eq!(locker.label(), "123");

        let facility = net
            .location_mut(&LocationId::Facility("External Storage".to_string()))
            .unwrap();
        assert_eq!(facility.label(), "External Storage");

        assert!(net
            .location_mut(&LocationId::Facility("Nope".to_string()))
            .is_none());
    }
}
