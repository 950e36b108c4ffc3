use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::slot::{Slot, VacateReason};
use crate::domain::model::{
    EventKind, ParcelId, ParcelSize, RejectReason, Rejected, TransitEvent, Withdrawal,
};
use crate::domain::parcel::Parcel;
use crate::domain::ports::Location;
use crate::utils::error::{LockerError, Result};

/// How much of its activity log a locker keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryRetention {
    #[default]
    Unbounded,
    /// Rolling window of the most recent entries.
    Last(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockerAction {
    Deposited,
    Dispatched,
    TransferredOut,
    Restored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockerLogEntry {
    pub parcel_id: ParcelId,
    pub timestamp: DateTime<Utc>,
    pub action: LockerAction,
}

/// Point-in-time slot forecast. The date is informational only; expected
/// parcels are subtracted whatever day is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub date: NaiveDate,
    pub total: usize,
    pub occupied: usize,
    pub expected: usize,
    pub available: usize,
}

impl Availability {
    /// Signed `total - occupied - expected`; negative when overbooked.
    pub fn balance(&self) -> i64 {
        self.total as i64 - self.occupied as i64 - self.expected as i64
    }
}

#[derive(Debug)]
pub struct Locker {
    identifier: String,
    address: String,
    slots: Vec<Slot>,
    expected_parcels: Vec<Parcel>,
    history: VecDeque<LockerLogEntry>,
    retention: HistoryRetention,
}

impl Locker {
    pub fn new(identifier: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            address: address.into(),
            slots: Vec::new(),
            expected_parcels: Vec::new(),
            history: VecDeque::new(),
            retention: HistoryRetention::Unbounded,
        }
    }

    pub fn with_slots(mut self, sizes: impl IntoIterator<Item = ParcelSize>) -> Self {
        for size in sizes {
            self.add_slot(size);
        }
        self
    }

    pub fn with_retention(mut self, retention: HistoryRetention) -> Self {
        self.retention = retention;
        self.trim_history();
        self
    }

    pub fn add_slot(&mut self, size: ParcelSize) {
        self.slots.push(Slot::new(size));
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn expected_parcels(&self) -> &[Parcel] {
        &self.expected_parcels
    }

    pub fn history(&self) -> impl Iterator<Item = &LockerLogEntry> {
        self.history.iter()
    }

    pub fn retention(&self) -> HistoryRetention {
        self.retention
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Free slots, optionally only those of one size.
    pub fn free_slots(&self, size: Option<ParcelSize>) -> usize {
        self.slots
            .iter()
            .filter(|s| !s.is_occupied() && size.map_or(true, |wanted| s.size() == wanted))
            .count()
    }

    /// Deposits a paid parcel into the first free slot of its size.
    pub fn receive(&mut self, parcel: Parcel) -> std::result::Result<usize, Rejected> {
        if !parcel.is_paid() {
            tracing::warn!(
                "Locker {}: cannot deposit parcel {} without payment",
                self.identifier,
                parcel.id()
            );
            return Err(Rejected::new(parcel, RejectReason::NotPaid));
        }

        let Some(index) = self.slots.iter().position(|slot| slot.accepts(&parcel)) else {
            tracing::warn!(
                "Locker {}: no free {} slot for parcel {}",
                self.identifier,
                parcel.size(),
                parcel.id()
            );
            return Err(Rejected::new(parcel, RejectReason::NoMatchingSlot));
        };

        let parcel_id = parcel.id();
        self.slots[index].occupy(parcel)?;
        if let Some(parcel) = self.slots[index].current_parcel_mut() {
            parcel.add_event(TransitEvent::now(self.address.as_str(), EventKind::Deposited));
            parcel.ensure_delivery_window();
            parcel.record_delivery(&self.address);
        }
        self.log(parcel_id, LockerAction::Deposited);

        tracing::info!(
            "Locker {}: parcel {} deposited in slot {}",
            self.identifier,
            parcel_id,
            index
        );
        Ok(index)
    }

    /// Hands a parcel out to its recipient, by identifier or temp code.
    pub fn dispatch(&mut self, key: &str) -> Option<Parcel> {
        let (_, mut parcel) = self.vacate_matching(key, VacateReason::Collection)?;
        parcel.add_event(TransitEvent::now(self.address.as_str(), EventKind::Dispatched));
        self.log(parcel.id(), LockerAction::Dispatched);
        tracing::info!("Locker {}: parcel {} dispatched", self.identifier, parcel.id());
        Some(parcel)
    }

    fn vacate_matching(&mut self, key: &str, reason: VacateReason) -> Option<(usize, Parcel)> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.current_parcel().is_some_and(|p| p.matches(key)))?;
        let parcel = self.slots[index].vacate(reason)?;
        Some((index, parcel))
    }

    /// Read-only lookup among the parcels physically in this locker.
    pub fn find(&self, key: &str) -> Option<&Parcel> {
        self.slots
            .iter()
            .filter_map(|slot| slot.current_parcel())
            .find(|p| p.matches(key))
    }

    pub fn find_expected(&self, key: &str) -> Option<&Parcel> {
        self.expected_parcels.iter().find(|p| p.matches(key))
    }

    /// Mutable access for status changes that do not move the parcel.
    pub(crate) fn parcel_mut(&mut self, key: &str) -> Option<&mut Parcel> {
        if let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.current_parcel().is_some_and(|p| p.matches(key)))
        {
            return self.slots[index].current_parcel_mut();
        }
        self.expected_parcels.iter_mut().find(|p| p.matches(key))
    }

    pub fn add_expected_parcel(&mut self, parcel: Parcel) {
        tracing::debug!(
            "Locker {}: expecting parcel {}",
            self.identifier,
            parcel.id()
        );
        self.expected_parcels.push(parcel);
    }

    pub fn remove_expected_parcel(&mut self, parcel_id: ParcelId) -> Option<Parcel> {
        let index = self
            .expected_parcels
            .iter()
            .position(|p| p.id() == parcel_id)?;
        Some(self.expected_parcels.remove(index))
    }

    pub fn check_availability(&self, date: NaiveDate) -> Availability {
        let total = self.slots.len();
        let occupied = self.occupied_count();
        let expected = self.expected_parcels.len();
        let availability = Availability {
            date,
            total,
            occupied,
            expected,
            available: total.saturating_sub(occupied + expected),
        };
        tracing::debug!(
            "Locker {}: on {} available slots: {}",
            self.identifier,
            date.format("%Y-%m-%d"),
            availability.available
        );
        availability
    }

    pub fn can_update_details(&self) -> bool {
        self.occupied_count() == 0 && self.expected_parcels.is_empty()
    }

    pub(crate) fn update_details(
        &mut self,
        new_identifier: impl Into<String>,
        new_address: impl Into<String>,
    ) -> Result<()> {
        if !self.can_update_details() {
            return Err(LockerError::LockerBusy {
                id: self.identifier.clone(),
            });
        }
        self.identifier = new_identifier.into();
        self.address = new_address.into();
        tracing::info!(
            "Locker details updated to ID {}, Address {}",
            self.identifier,
            self.address
        );
        Ok(())
    }

    fn log(&mut self, parcel_id: ParcelId, action: LockerAction) {
        self.history.push_back(LockerLogEntry {
            parcel_id,
            timestamp: Utc::now(),
            action,
        });
        self.trim_history();
    }

    fn trim_history(&mut self) {
        if let HistoryRetention::Last(limit) = self.retention {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }
}

impl Location for Locker {
    fn label(&self) -> &str {
        &self.identifier
    }

    fn find(&self, key: &str) -> Option<&Parcel> {
        Locker::find(self, key)
    }

    fn withdraw(&mut self, key: &str) -> Option<Withdrawal> {
        let (index, parcel) = self.vacate_matching(key, VacateReason::TransferOut)?;
        self.log(parcel.id(), LockerAction::TransferredOut);
        tracing::debug!(
            "Locker {}: parcel {} withdrawn from slot {}",
            self.identifier,
            parcel.id(),
            index
        );
        Some(Withdrawal {
            parcel,
            slot: Some(index),
        })
    }

    fn deposit(&mut self, parcel: Parcel) -> std::result::Result<(), Rejected> {
        self.receive(parcel).map(|_| ())
    }

    /// Prefers the slot the parcel left from; falls back to any matching slot.
    fn restore(&mut self, withdrawal: Withdrawal) -> std::result::Result<(), Rejected> {
        let Withdrawal { parcel, slot } = withdrawal;
        if !parcel.is_paid() {
            return Err(Rejected::new(parcel, RejectReason::NotPaid));
        }

        let index = match slot {
            Some(i) if self.slots.get(i).is_some_and(|s| s.accepts(&parcel)) => i,
            _ => match self.slots.iter().position(|s| s.accepts(&parcel)) {
                Some(i) => i,
                None => return Err(Rejected::new(parcel, RejectReason::NoMatchingSlot)),
            },
        };

        let parcel_id = parcel.id();
        self.slots[index].occupy(parcel)?;
        if let Some(parcel) = self.slots[index].current_parcel_mut() {
            parcel.add_event(TransitEvent::now(
                self.address.as_str(),
                EventKind::TransferRolledBack,
            ));
        }
        self.log(parcel_id, LockerAction::Restored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Contact, PaymentStatus};

    fn parcel(size: ParcelSize) -> Parcel {
        Parcel::create(
            Contact::new("Alice", "555-0100"),
            Contact::new("Bob", "555-0199"),
            size,
            [],
        )
    }

    fn paid(size: ParcelSize) -> Parcel {
        let mut p = parcel(size);
        p.mark_paid().unwrap();
        p
    }

    fn locker() -> Locker {
        Locker::new("123", "123 Street, City A").with_slots([
            ParcelSize::L,
            ParcelSize::S,
            ParcelSize::M,
            ParcelSize::M,
        ])
    }

    #[test]
    fn test_receive_rejects_unpaid_parcel() {
        let mut locker = locker();
        let rejected = locker.receive(parcel(ParcelSize::M)).unwrap_err();

        assert_eq!(rejected.reason, RejectReason::NotPaid);
        assert_eq!(rejected.parcel.payment_status(), PaymentStatus::Pending);
        assert!(rejected.parcel.transit_history().is_empty());
        assert_eq!(locker.occupied_count(), 0);
        assert_eq!(locker.history().count(), 0);
    }

    #[test]
    fn test_receive_uses_first_matching_slot() {
        let mut locker = locker();
        assert_eq!(locker.receive(paid(ParcelSize::M)).unwrap(), 2);
        assert_eq!(locker.receive(paid(ParcelSize::M)).unwrap(), 3);

        let rejected = locker.receive(paid(ParcelSize::M)).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::NoMatchingSlot);
        assert!(rejected.parcel.transit_history().is_empty());
        assert!(rejected.parcel.delivered_at().is_none());
    }

    #[test]
    fn test_receive_never_uses_mismatched_slot() {
        let mut locker = Locker::new("1", "Somewhere").with_slots([ParcelSize::L]);
        let rejected = locker.receive(paid(ParcelSize::S)).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::NoMatchingSlot);
        assert!(!locker.slots()[0].is_occupied());
    }

    #[test]
    fn test_receive_records_events_and_delivery() {
        let mut locker = locker();
        let p = paid(ParcelSize::S);
        let id = p.id().to_string();
        locker.receive(p).unwrap();

        let held = locker.find(&id).unwrap();
        let kinds: Vec<EventKind> = held.transit_history().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Occupied, EventKind::Deposited, EventKind::Delivered]
        );
        assert!(held.delivered_at().is_some());
        assert!(held.estimated_delivery().is_some());
        assert!(held.guaranteed_delivery().is_some());

        let entry = locker.history().next().unwrap();
        assert_eq!(entry.action, LockerAction::Deposited);
    }

    #[test]
    fn test_dispatch_by_id_and_temp_code() {
        let mut locker = locker();
        let a = paid(ParcelSize::M);
        let a_id = a.id();
        let b = paid(ParcelSize::L);
        let b_code = b.temp_code().unwrap().to_string();
        let b_id = b.id();
        locker.receive(a).unwrap();
        locker.receive(b).unwrap();

        let out = locker.dispatch(&a_id.to_string()).unwrap();
        assert_eq!(out.id(), a_id);
        assert!(!locker.slots()[2].is_occupied());
        assert!(locker.slots()[2].current_parcel().is_none());

        let out = locker.dispatch(&b_code).unwrap();
        assert_eq!(out.id(), b_id);
        assert!(out.temp_code().is_some());
        assert!(out.picked_up_at().is_some());
        assert_eq!(locker.occupied_count(), 0);
    }

    #[test]
    fn test_dispatch_unknown_key_changes_nothing() {
        let mut locker = locker();
        locker.receive(paid(ParcelSize::M)).unwrap();
        assert!(locker.dispatch("NOPE42").is_none());
        assert_eq!(locker.occupied_count(), 1);
        assert_eq!(locker.history().count(), 1);
    }

    #[test]
    fn test_withdraw_and_restore_returns_to_same_slot() {
        let mut locker = locker();
        let p = paid(ParcelSize::M);
        let id = p.id().to_string();
        locker.receive(paid(ParcelSize::M)).unwrap();
        locker.receive(p).unwrap();

        let withdrawal = Location::withdraw(&mut locker, &id).unwrap();
        assert_eq!(withdrawal.slot, Some(3));
        assert!(withdrawal.parcel.picked_up_at().is_none());

        locker.restore(withdrawal).unwrap();
        assert!(locker.slots()[3].is_occupied());
        let restored = locker.find(&id).unwrap();
        assert_eq!(
            restored.transit_history().last().unwrap().kind,
            EventKind::TransferRolledBack
        );
    }

    #[test]
    fn test_expected_parcels_reduce_availability() {
        let mut locker = locker();
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        assert_eq!(locker.check_availability(date).available, 4);

        locker.receive(paid(ParcelSize::L)).unwrap();
        let expected = parcel(ParcelSize::S);
        let expected_id = expected.id();
        locker.add_expected_parcel(expected);

        let availability = locker.check_availability(date);
        assert_eq!(availability.occupied, 1);
        assert_eq!(availability.expected, 1);
        assert_eq!(availability.available, 2);
        assert_eq!(availability.balance(), 2);

        let removed = locker.remove_expected_parcel(expected_id).unwrap();
        assert_eq!(removed.id(), expected_id);
        assert!(locker.remove_expected_parcel(expected_id).is_none());
        assert_eq!(locker.check_availability(date).available, 3);
    }

    #[test]
    fn test_overbooked_availability_saturates() {
        let mut locker = Locker::new("1", "Somewhere").with_slots([ParcelSize::S]);
        locker.add_expected_parcel(parcel(ParcelSize::S));
        locker.add_expected_parcel(parcel(ParcelSize::S));

        let availability = locker.check_availability(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(availability.available, 0);
        assert_eq!(availability.balance(), -1);
    }

    #[test]
    fn test_update_details_only_when_idle() {
        let mut locker = locker();
        locker.update_details("789", "789 Avenue").unwrap();
        assert_eq!(locker.identifier(), "789");
        assert_eq!(locker.address(), "789 Avenue");

        locker.add_expected_parcel(parcel(ParcelSize::M));
        let err = locker.update_details("000", "Nowhere").unwrap_err();
        assert!(matches!(err, LockerError::LockerBusy { .. }));
        assert_eq!(locker.identifier(), "789");
    }

    #[test]
    fn test_update_details_rejected_when_occupied() {
        let mut locker = locker();
        locker.receive(paid(ParcelSize::S)).unwrap();
        assert!(locker.update_details("000", "Nowhere").is_err());
        assert_eq!(locker.address(), "123 Street, City A");
    }

    #[test]
    fn test_bounded_history_keeps_latest_entries() {
        let mut locker = Locker::new("1", "Somewhere")
            .with_slots([ParcelSize::S])
            .with_retention(HistoryRetention::Last(3));

        for _ in 0..3 {
            let p = paid(ParcelSize::S);
            let id = p.id().to_string();
            locker.receive(p).unwrap();
            locker.dispatch(&id).unwrap();
        }

        let actions: Vec<LockerAction> = locker.history().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                LockerAction::Dispatched,
                LockerAction::Deposited,
                LockerAction::Dispatched
            ]
        );
    }

    #[test]
    fn test_free_slots_by_size() {
        let mut locker = locker();
        locker.receive(paid(ParcelSize::M)).unwrap();
        assert_eq!(locker.free_slots(None), 3);
        assert_eq!(locker.free_slots(Some(ParcelSize::M)), 1);
        assert_eq!(locker.free_slots(Some(ParcelSize::S)), 1);
    }
}
