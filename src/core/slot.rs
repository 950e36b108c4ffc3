use crate::domain::model::{EventKind, ParcelSize, RejectReason, Rejected, TransitEvent};
use crate::domain::parcel::Parcel;

/// Why a slot is being emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacateReason {
    /// The recipient is taking the parcel home.
    Collection,
    /// A courier is moving the parcel somewhere else.
    TransferOut,
}

#[derive(Debug)]
pub struct Slot {
    size: ParcelSize,
    current_parcel: Option<Parcel>,
}

impl Slot {
    pub fn new(size: ParcelSize) -> Self {
        Self {
            size,
            current_parcel: None,
        }
    }

    pub fn size(&self) -> ParcelSize {
        self.size
    }

    pub fn is_occupied(&self) -> bool {
        self.current_parcel.is_some()
    }

    pub fn current_parcel(&self) -> Option<&Parcel> {
        self.current_parcel.as_ref()
    }

    pub(crate) fn current_parcel_mut(&mut self) -> Option<&mut Parcel> {
        self.current_parcel.as_mut()
    }

    pub fn label(&self) -> String {
        format!("Slot sized {}", self.size)
    }

    pub fn accepts(&self, parcel: &Parcel) -> bool {
        !self.is_occupied() && self.size == parcel.size()
    }

    pub fn occupy(&mut self, mut parcel: Parcel) -> Result<(), Rejected> {
        if self.is_occupied() {
            return Err(Rejected::new(parcel, RejectReason::SlotOccupied));
        }
        if self.size != parcel.size() {
            let reason = RejectReason::SizeMismatch {
                slot: self.size,
                parcel: parcel.size(),
            };
            return Err(Rejected::new(parcel, reason));
        }

        parcel.add_event(TransitEvent::now(self.label(), EventKind::Occupied));
        self.current_parcel = Some(parcel);
        Ok(())
    }

    pub fn vacate(&mut self, reason: VacateReason) -> Option<Parcel> {
        let mut parcel = self.current_parcel.take()?;
        let label = self.label();
        match reason {
            VacateReason::Collection => parcel.record_pickup(&label),
            VacateReason::TransferOut => {
                parcel.add_event(TransitEvent::now(label, EventKind::TransferredOut))
            }
        }
        Some(parcel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Contact;

    fn parcel(size: ParcelSize) -> Parcel {
        Parcel::create(
            Contact::new("Alice", "555-0100"),
            Contact::new("Bob", "555-0199"),
            size,
            [],
        )
    }

    #[test]
    fn test_occupy_matching_size() {
        let mut slot = Slot::new(ParcelSize::M);
        slot.occupy(parcel(ParcelSize::M)).unwrap();

        assert!(slot.is_occupied());
        let held = slot.current_parcel().unwrap();
        assert_eq!(held.transit_history()[0].kind, EventKind::Occupied);
        assert_eq!(held.transit_history()[0].location, "Slot sized M");
    }

    #[test]
    fn test_occupy_rejects_size_mismatch() {
        let mut slot = Slot::new(ParcelSize::S);
        let p = parcel(ParcelSize::L);
        let id = p.id();

        let rejected = slot.occupy(p).unwrap_err();
        assert_eq!(
            rejected.reason,
            RejectReason::SizeMismatch {
                slot: ParcelSize::S,
                parcel: ParcelSize::L
            }
        );
        assert_eq!(rejected.parcel.id(), id);
        assert!(rejected.parcel.transit_history().is_empty());
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_occupy_rejects_second_parcel() {
        let mut slot = Slot::new(ParcelSize::S);
        let first = parcel(ParcelSize::S);
        let first_id = first.id();
        slot.occupy(first).unwrap();

        let rejected = slot.occupy(parcel(ParcelSize::S)).unwrap_err();
        assert_eq!(rejected.reason, RejectReason::SlotOccupied);
        assert_eq!(slot.current_parcel().unwrap().id(), first_id);
    }

    #[test]
    fn test_vacate_empty_slot() {
        let mut slot = Slot::new(ParcelSize::S);
        assert!(slot.vacate(VacateReason::Collection).is_none());
    }

    #[test]
    fn test_vacate_for_collection_records_pickup() {
        let mut slot = Slot::new(ParcelSize::M);
        slot.occupy(parcel(ParcelSize::M)).unwrap();

        let p = slot.vacate(VacateReason::Collection).unwrap();
        assert!(!slot.is_occupied());
        assert!(slot.current_parcel().is_none());
        assert!(p.picked_up_at().is_some());
        assert_eq!(p.transit_history().last().unwrap().kind, EventKind::PickedUp);
    }

    #[test]
    fn test_vacate_for_transfer_does_not_record_pickup() {
        let mut slot = Slot::new(ParcelSize::M);
        slot.occupy(parcel(ParcelSize::M)).unwrap();

        let p = slot.vacate(VacateReason::TransferOut).unwrap();
        assert!(p.picked_up_at().is_none());
        assert_eq!(
            p.transit_history().last().unwrap().kind,
            EventKind::TransferredOut
        );
    }
}
