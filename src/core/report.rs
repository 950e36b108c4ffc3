use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

use crate::core::network::{LockerNetwork, Placement};
use crate::domain::model::ParcelSize;
use crate::domain::parcel::{format_time, Parcel};
use crate::domain::ports::Storage;
use crate::utils::error::{LockerError, Result};

pub const BUNDLE_FILE_NAME: &str = "network_report.zip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRow {
    pub locker: String,
    pub address: String,
    pub slot: usize,
    pub size: ParcelSize,
    pub occupied: bool,
    pub parcel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRow {
    pub locker: String,
    pub date: NaiveDate,
    pub total: usize,
    pub occupied: usize,
    pub expected: usize,
    pub available: usize,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageRow {
    pub facility: String,
    pub parcel_id: String,
    pub size: ParcelSize,
    pub recipient: String,
}

/// Table shape of a persisted parcel. Lossy: no temp code, services or history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelRow {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub registered_time: String,
    pub delivery_time: String,
    pub pick_up_time: String,
    pub size: ParcelSize,
}

/// Everything known about a parcel plus where it currently is.
#[derive(Debug, Clone, Serialize)]
pub struct ParcelRecord {
    pub location: Placement,
    #[serde(flatten)]
    pub parcel: serde_json::Value,
}

/// Snapshot of a network's lockers, storage and parcels.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub network: String,
    pub generated_at: DateTime<Utc>,
    pub slots: Vec<SlotRow>,
    pub availability: Vec<AvailabilityRow>,
    pub storage: Vec<StorageRow>,
    pub parcels: Vec<ParcelRow>,
    pub records: Vec<ParcelRecord>,
}

impl NetworkReport {
    pub fn capture(network: &LockerNetwork, date: NaiveDate) -> Result<Self> {
        let mut report = Self {
            network: network.name().to_string(),
            generated_at: Utc::now(),
            slots: Vec::new(),
            availability: Vec::new(),
            storage: Vec::new(),
            parcels: Vec::new(),
            records: Vec::new(),
        };

        for locker in network.lockers() {
            let id = locker.identifier().to_string();
            for (index, slot) in locker.slots().iter().enumerate() {
                report.slots.push(SlotRow {
                    locker: id.clone(),
                    address: locker.address().to_string(),
                    slot: index,
                    size: slot.size(),
                    occupied: slot.is_occupied(),
                    parcel_id: slot.current_parcel().map(|p| p.id().to_string()),
                });
                if let Some(parcel) = slot.current_parcel() {
                    let placement = Placement::Slot {
                        locker: id.clone(),
                        slot: index,
                    };
                    report.add_parcel(parcel, placement)?;
                }
            }
            for parcel in locker.expected_parcels() {
                let placement = Placement::Expected { locker: id.clone() };
                report.add_parcel(parcel, placement)?;
            }

            let availability = locker.check_availability(date);
            report.availability.push(AvailabilityRow {
                locker: id,
                date,
                total: availability.total,
                occupied: availability.occupied,
                expected: availability.expected,
                available: availability.available,
                balance: availability.balance(),
            });
        }

        for facility in network.facilities() {
            let mut held: Vec<&Parcel> = facility.parcels().collect();
            held.sort_by_key(|p| p.registered_at());
            for parcel in held {
                report.storage.push(StorageRow {
                    facility: facility.name().to_string(),
                    parcel_id: parcel.id().to_string(),
                    size: parcel.size(),
                    recipient: parcel.recipient().name.clone(),
                });
                let placement = Placement::Facility {
                    name: facility.name().to_string(),
                };
                report.add_parcel(parcel, placement)?;
            }
        }

        tracing::debug!(
            "Captured report for {}: {} slots, {} parcels",
            report.network,
            report.slots.len(),
            report.parcels.len()
        );
        Ok(report)
    }

    fn add_parcel(&mut self, parcel: &Parcel, location: Placement) -> Result<()> {
        self.parcels.push(ParcelRow {
            id: parcel.id().to_string(),
            sender: parcel.sender().name.clone(),
            recipient: parcel.recipient().name.clone(),
            registered_time: format_time(Some(parcel.registered_at()), ""),
            delivery_time: format_time(parcel.delivered_at(), ""),
            pick_up_time: format_time(parcel.picked_up_at(), ""),
            size: parcel.size(),
        });
        self.records.push(ParcelRecord {
            location,
            parcel: serde_json::to_value(parcel)?,
        });
        Ok(())
    }

    /// Zips the report into `network_report.zip` and hands it to `storage`.
    pub fn write_bundle<S: Storage + ?Sized>(&self, storage: &S) -> Result<String> {
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("lockers.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&self.slots)?)?;

            zip.start_file::<_, ()>("availability.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&self.availability)?)?;

            zip.start_file::<_, ()>("storage.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&self.storage)?)?;

            zip.start_file::<_, ()>("parcels.csv", FileOptions::default())?;
            zip.write_all(&to_csv(&self.parcels)?)?;

            zip.start_file::<_, ()>("parcels.json", FileOptions::default())?;
            let json_data = serde_json::to_string_pretty(&self.records)?;
            zip.write_all(json_data.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing report bundle ({} bytes)", zip_data.len());
        storage.write_file(BUNDLE_FILE_NAME, &zip_data)?;
        tracing::info!("Report for {} written to {}", self.network, BUNDLE_FILE_NAME);
        Ok(BUNDLE_FILE_NAME.to_string())
    }
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| LockerError::IoError(e.into_error()))
}
