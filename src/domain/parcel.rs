use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::model::{
    Contact, EventKind, ParcelId, ParcelSize, PaymentStatus, Service, TempCode, TransitEvent,
};
use crate::utils::error::{LockerError, Result};

/// Days added on top of the estimated delivery to get the guaranteed one.
pub const GUARANTEE_BUFFER_DAYS: i64 = 2;
/// Delivery days used when no tariff has set the window yet.
pub const STANDARD_DELIVERY_DAYS: i64 = 5;
pub const PRIORITY_DELIVERY_DAYS: i64 = 3;

pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A parcel and everything that happened to it.
///
/// Parcels are not `Clone`: a parcel lives in exactly one place
/// (a slot, a storage facility, a locker's expected list or a courier's hold)
/// and is moved between them.
#[derive(Debug, Serialize)]
pub struct Parcel {
    id: ParcelId,
    temp_code: Option<TempCode>,
    sender: Contact,
    recipient: Contact,
    size: ParcelSize,
    services: BTreeSet<Service>,
    payment_status: PaymentStatus,
    collected: bool,
    sender_locker: Option<String>,
    delivery_locker: Option<String>,
    transit_history: Vec<TransitEvent>,
    registered_at: DateTime<Utc>,
    estimated_delivery: Option<DateTime<Utc>>,
    guaranteed_delivery: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
}

impl Parcel {
    pub fn create(
        sender: Contact,
        recipient: Contact,
        size: ParcelSize,
        services: impl IntoIterator<Item = Service>,
    ) -> Self {
        Self {
            id: ParcelId::generate(),
            temp_code: None,
            sender,
            recipient,
            size,
            services: services.into_iter().collect(),
            payment_status: PaymentStatus::Pending,
            collected: false,
            sender_locker: None,
            delivery_locker: None,
            transit_history: Vec::new(),
            registered_at: Utc::now(),
            estimated_delivery: None,
            guaranteed_delivery: None,
            delivered_at: None,
            picked_up_at: None,
        }
    }

    pub fn with_route(
        mut self,
        sender_locker: impl Into<String>,
        delivery_locker: impl Into<String>,
    ) -> Self {
        self.sender_locker = Some(sender_locker.into());
        self.delivery_locker = Some(delivery_locker.into());
        self
    }

    pub fn id(&self) -> ParcelId {
        self.id
    }

    pub fn temp_code(&self) -> Option<&TempCode> {
        self.temp_code.as_ref()
    }

    pub fn sender(&self) -> &Contact {
        &self.sender
    }

    pub fn recipient(&self) -> &Contact {
        &self.recipient
    }

    pub fn size(&self) -> ParcelSize {
        self.size
    }

    pub fn services(&self) -> &BTreeSet<Service> {
        &self.services
    }

    pub fn has_service(&self, service: Service) -> bool {
        self.services.contains(&service)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn sender_locker(&self) -> Option<&str> {
        self.sender_locker.as_deref()
    }

    pub fn delivery_locker(&self) -> Option<&str> {
        self.delivery_locker.as_deref()
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery
    }

    pub fn guaranteed_delivery(&self) -> Option<DateTime<Utc>> {
        self.guaranteed_delivery
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn picked_up_at(&self) -> Option<DateTime<Utc>> {
        self.picked_up_at
    }

    pub fn transit_history(&self) -> &[TransitEvent] {
        &self.transit_history
    }

    /// True if `key` is this parcel's identifier or its current temp code.
    pub fn matches(&self, key: &str) -> bool {
        self.id.to_string() == key || self.temp_code.as_ref().is_some_and(|c| c.as_str() == key)
    }

    /// Pending -> Paid. Issues the temp code; a second call is rejected and the
    /// code already handed out stays valid.
    pub fn mark_paid(&mut self) -> Result<&TempCode> {
        if self.is_paid() {
            return Err(LockerError::AlreadyPaid {
                parcel_id: self.id.to_string(),
            });
        }
        if self.collected {
            return Err(LockerError::NotCollectable {
                parcel_id: self.id.to_string(),
            });
        }
        self.payment_status = PaymentStatus::Paid;
        Ok(&*self.temp_code.insert(TempCode::generate()))
    }

    /// Replaces the temp code. The previous code stops matching immediately.
    pub fn reissue_temp_code(&mut self) -> Result<&TempCode> {
        if !self.is_paid() {
            return Err(LockerError::PaymentRequired {
                parcel_id: self.id.to_string(),
            });
        }
        if self.collected {
            return Err(LockerError::NotCollectable {
                parcel_id: self.id.to_string(),
            });
        }
        Ok(&*self.temp_code.insert(TempCode::generate()))
    }

    /// Called once the recipient has the parcel in hand. Unpaid parcels
    /// cannot have been collected, so nothing changes for them.
    pub fn clear_temp_code(&mut self) {
        if !self.is_paid() {
            return;
        }
        self.temp_code = None;
        self.collected = true;
    }

    pub fn add_event(&mut self, event: TransitEvent) {
        self.transit_history.push(event);
    }

    pub fn record_delivery(&mut self, location: &str) {
        let event = TransitEvent::now(location, EventKind::Delivered);
        self.delivered_at = Some(event.timestamp);
        self.add_event(event);
    }

    pub fn record_pickup(&mut self, location: &str) {
        let event = TransitEvent::now(location, EventKind::PickedUp);
        self.picked_up_at = Some(event.timestamp);
        self.add_event(event);
    }

    pub fn compute_delivery_window(&mut self, base_days: i64) {
        let estimated = Utc::now() + Duration::days(base_days);
        self.estimated_delivery = Some(estimated);
        self.guaranteed_delivery = Some(estimated + Duration::days(GUARANTEE_BUFFER_DAYS));
    }

    /// Sets the window from the default days unless one is already set.
    pub fn ensure_delivery_window(&mut self) {
        if self.estimated_delivery.is_some() {
            return;
        }
        let days = if self.has_service(Service::Priority) {
            PRIORITY_DELIVERY_DAYS
        } else {
            STANDARD_DELIVERY_DAYS
        };
        self.compute_delivery_window(days);
    }

    /// Flattened view for display, in a stable order.
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let services = self
            .services
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            ("Parcel ID", self.id.to_string()),
            (
                "Temporary Code",
                self.temp_code
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "None".to_string()),
            ),
            ("Sender Name", self.sender.name.clone()),
            ("Sender Phone", self.sender.phone.clone()),
            ("Recipient Name", self.recipient.name.clone()),
            ("Recipient Phone", self.recipient.phone.clone()),
            (
                "Sender Locker",
                self.sender_locker.clone().unwrap_or_else(|| "None".to_string()),
            ),
            (
                "Delivery Locker",
                self.delivery_locker.clone().unwrap_or_else(|| "None".to_string()),
            ),
            ("Size", self.size.to_string()),
            ("Services", services),
            ("Payment Status", self.payment_status.to_string()),
            (
                "Estimated Delivery Time",
                format_time(self.estimated_delivery, "Not Set"),
            ),
            (
                "Actual Delivery Time",
                format_time(self.delivered_at, "Not Delivered"),
            ),
            (
                "Guaranteed Delivery Time",
                format_time(self.guaranteed_delivery, "Not Set"),
            ),
            (
                "Actual Pick Up Time",
                format_time(self.picked_up_at, "Not Picked Up"),
            ),
        ]
    }
}

pub fn format_time(time: Option<DateTime<Utc>>, missing: &str) -> String {
    time.map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
        .unwrap_or_else(|| missing.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parcel(size: ParcelSize) -> Parcel {
        Parcel::create(
            Contact::new("Alice", "555-0100"),
            Contact::new("Bob", "555-0199"),
            size,
            [Service::Insurance],
        )
    }

    #[test]
    fn test_new_parcel_is_pending_without_code() {
        let p = parcel(ParcelSize::M);
        assert_eq!(p.payment_status(), PaymentStatus::Pending);
        assert!(p.temp_code().is_none());
        assert!(p.transit_history().is_empty());
        assert!(p.estimated_delivery().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = parcel(ParcelSize::S);
        let b = parcel(ParcelSize::S);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_mark_paid_issues_code_once() {
        let mut p = parcel(ParcelSize::M);
        let code = p.mark_paid().unwrap().clone();
        assert!(p.is_paid());
        assert_eq!(p.temp_code(), Some(&code));
        assert!(p.matches(code.as_str()));

        assert!(matches!(
            p.mark_paid(),
            Err(LockerError::AlreadyPaid { .. })
        ));
        assert_eq!(p.temp_code(), Some(&code));
    }

    #[test]
    fn test_reissue_requires_payment_and_invalidates_old_code() {
        let mut p = parcel(ParcelSize::L);
        assert!(p.reissue_temp_code().is_err());

        let old = p.mark_paid().unwrap().clone();
        let mut fresh = p.reissue_temp_code().unwrap().clone();
        // codes are random; retry until they differ
        while fresh == old {
            fresh = p.reissue_temp_code().unwrap().clone();
        }
        assert!(!p.matches(old.as_str()));
        assert!(p.matches(fresh.as_str()));

        p.clear_temp_code();
        assert!(p.reissue_temp_code().is_err());
    }

    #[test]
    fn test_clear_temp_code_marks_collected() {
        let mut p = parcel(ParcelSize::S);
        p.mark_paid().unwrap();
        p.clear_temp_code();
        assert!(p.temp_code().is_none());
        assert!(p.is_collected());
        assert!(p.is_paid());
    }

    #[test]
    fn test_clear_temp_code_ignores_unpaid_parcel() {
        let mut p = parcel(ParcelSize::S);
        p.clear_temp_code();
        assert!(!p.is_collected());

        let code = p.mark_paid().unwrap().clone();
        assert_eq!(p.temp_code(), Some(&code));
        assert!(!p.is_collected());
    }

    #[test]
    fn test_mark_paid_rejects_collected_parcel() {
        let mut p = parcel(ParcelSize::S);
        p.mark_paid().unwrap();
        p.clear_temp_code();
        assert!(matches!(p.mark_paid(), Err(LockerError::AlreadyPaid { .. })));
        assert!(p.temp_code().is_none());
    }

    #[test]
    fn test_matches_by_id() {
        let p = parcel(ParcelSize::S);
        assert!(p.matches(&p.id().to_string()));
        assert!(!p.matches("ABC123"));
    }

    #[test]
    fn test_delivery_window_has_two_day_buffer() {
        let mut p = parcel(ParcelSize::M);
        p.compute_delivery_window(5);
        let estimated = p.estimated_delivery().unwrap();
        let guaranteed = p.guaranteed_delivery().unwrap();
        assert_eq!(guaranteed - estimated, Duration::days(2));
        assert!(estimated > p.registered_at() + Duration::days(4));
    }

    #[test]
    fn test_ensure_delivery_window_keeps_existing_one() {
        let mut p = parcel(ParcelSize::M);
        p.compute_delivery_window(1);
        let set = p.estimated_delivery();
        p.ensure_delivery_window();
        assert_eq!(p.estimated_delivery(), set);

        let mut priority = Parcel::create(
            Contact::new("Alice", "555-0100"),
            Contact::new("Bob", "555-0199"),
            ParcelSize::S,
            [Service::Priority],
        );
        priority.ensure_delivery_window();
        let estimated = priority.estimated_delivery().unwrap();
        assert!(estimated < priority.registered_at() + Duration::days(STANDARD_DELIVERY_DAYS));
        assert!(estimated >= priority.registered_at() + Duration::days(PRIORITY_DELIVERY_DAYS));
    }

    #[test]
    fn test_delivery_and_pickup_are_recorded_in_order() {
        let mut p = parcel(ParcelSize::M);
        p.record_delivery("123 Street");
        p.record_pickup("123 Street");

        let kinds: Vec<EventKind> = p.transit_history().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Delivered, EventKind::PickedUp]);
        assert!(p.delivered_at().unwrap() <= p.picked_up_at().unwrap());
    }

    #[test]
    fn test_details_view() {
        let mut p = parcel(ParcelSize::M).with_route("123", "456");
        p.mark_paid().unwrap();
        let details = p.details();

        let get = |key: &str| {
            details
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("Size"), "M");
        assert_eq!(get("Services"), "insurance");
        assert_eq!(get("Payment Status"), "Paid");
        assert_eq!(get("Sender Locker"), "123");
        assert_eq!(get("Actual Pick Up Time"), "Not Picked Up");
        assert_eq!(get("Temporary Code").len(), 6);
        assert_eq!(details[0].0, "Parcel ID");
    }
}
