pub mod desk;
pub mod locker;
pub mod network;
pub mod report;
pub mod slot;
pub mod storage_facility;
pub mod transfer;

pub use crate::domain::model::{LocationId, ParcelSize, RejectReason, Rejected};
pub use crate::domain::parcel::Parcel;
pub use crate::domain::ports::{Location, LocationRegistry, Notifier, Storage, Tariff};
pub use crate::utils::error::Result;
