use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::parcel::Parcel;

pub const TEMP_CODE_LENGTH: usize = 6;
const TEMP_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParcelSize {
    S,
    M,
    L,
}

impl fmt::Display for ParcelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParcelSize::S => "S",
            ParcelSize::M => "M",
            ParcelSize::L => "L",
        };
        f.write_str(label)
    }
}

impl FromStr for ParcelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(ParcelSize::S),
            "M" => Ok(ParcelSize::M),
            "L" => Ok(ParcelSize::L),
            other => Err(format!("Unknown parcel size '{}'. Valid sizes: S, M, L", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Insurance,
    Priority,
    ExtendedStorage,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Service::Insurance => "insurance",
            Service::Priority => "priority",
            Service::ExtendedStorage => "extended_storage",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("Pending"),
            PaymentStatus::Paid => f.write_str("Paid"),
        }
    }
}

/// Sender or recipient of a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(Uuid);

impl ParcelId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Short human-friendly code handed to the recipient once a parcel is paid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempCode(String);

impl TempCode {
    pub fn generate() -> Self {
        let code = (0..TEMP_CODE_LENGTH)
            .map(|_| TEMP_CODE_ALPHABET[rand::random_range(0..TEMP_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Registered,
    PaymentReceived,
    Occupied,
    Deposited,
    Delivered,
    Dispatched,
    PickedUp,
    TransferredOut,
    TransferRejected,
    TransferRolledBack,
    Stored,
    Retrieved,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Registered => "Parcel Registered",
            EventKind::PaymentReceived => "Payment Received",
            EventKind::Occupied => "Occupied",
            EventKind::Deposited => "Parcel Deposited",
            EventKind::Delivered => "Parcel Delivered",
            EventKind::Dispatched => "Parcel Dispatched",
            EventKind::PickedUp => "Parcel Picked Up",
            EventKind::TransferredOut => "Transferred Out",
            EventKind::TransferRejected => "Transfer Rejected",
            EventKind::TransferRolledBack => "Transfer Rolled Back",
            EventKind::Stored => "Stored",
            EventKind::Retrieved => "Retrieved",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitEvent {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub kind: EventKind,
}

impl TransitEvent {
    pub fn now(location: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            location: location.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    NotPaid,
    SizeMismatch { slot: ParcelSize, parcel: ParcelSize },
    SlotOccupied,
    NoMatchingSlot,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotPaid => f.write_str("parcel has not been paid for"),
            RejectReason::SizeMismatch { slot, parcel } => {
                write!(f, "slot size {} does not fit parcel size {}", slot, parcel)
            }
            RejectReason::SlotOccupied => f.write_str("slot is already occupied"),
            RejectReason::NoMatchingSlot => f.write_str("no free slot of matching size"),
        }
    }
}

/// A deposit that did not happen. The parcel comes back unchanged.
#[derive(Debug)]
pub struct Rejected {
    pub parcel: Parcel,
    pub reason: RejectReason,
}

impl Rejected {
    pub fn new(parcel: Parcel, reason: RejectReason) -> Self {
        Self { parcel, reason }
    }
}

/// A parcel taken out of a location, with the slot it came from if any.
#[derive(Debug)]
pub struct Withdrawal {
    pub parcel: Parcel,
    pub slot: Option<usize>,
}

/// Address of a place that can hold parcels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationId {
    Locker(String),
    Facility(String),
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationId::Locker(id) => write!(f, "locker {}", id),
            LocationId::Facility(name) => write!(f, "facility {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub parcel_id: ParcelId,
    pub recipient: Contact,
    pub message: String,
}
