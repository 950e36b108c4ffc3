use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::model::{
    EventKind, LocationId, Notification, ParcelId, RejectReason, Rejected, TransitEvent,
    Withdrawal,
};
use crate::domain::parcel::Parcel;
use crate::domain::ports::{LocationRegistry, Notifier};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Unknown location: {location}")]
    UnknownLocation { location: String },

    #[error("Source and destination are both {location}")]
    SameLocation { location: String },

    #[error("Parcel '{key}' not found at {location}")]
    ParcelNotFound { key: String, location: String },

    /// The destination refused the parcel; it is back where it started.
    #[error("Parcel {parcel_id} rejected by destination: {reason}")]
    Rejected {
        parcel_id: String,
        reason: RejectReason,
    },

    /// The destination refused the parcel and so did the source. The parcel is
    /// in the courier's in-transit hold.
    #[error("Parcel {parcel_id} could not be returned to its source: {reason}")]
    RollbackFailed {
        parcel_id: String,
        reason: RejectReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub parcel_id: ParcelId,
    pub from: LocationId,
    pub to: LocationId,
    pub courier: String,
    pub completed_at: DateTime<Utc>,
}

/// Moves parcels between lockers and storage facilities.
///
/// A transfer either lands the parcel at its destination or puts it back at
/// its source. When neither works the parcel stays in the coordinator's
/// in-transit hold until someone releases it.
pub struct TransferCoordinator<N: Notifier> {
    courier: String,
    notifier: N,
    in_transit: BTreeMap<ParcelId, Parcel>,
}

impl<N: Notifier> TransferCoordinator<N> {
    pub fn new(courier: impl Into<String>, notifier: N) -> Self {
        Self {
            courier: courier.into(),
            notifier,
            in_transit: BTreeMap::new(),
        }
    }

    pub fn courier(&self) -> &str {
        &self.courier
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn transfer<R: LocationRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        from: &LocationId,
        to: &LocationId,
        key: &str,
    ) -> Result<TransferReceipt, TransferError> {
        if from == to {
            return Err(TransferError::SameLocation {
                location: from.to_string(),
            });
        }
        let destination_label = registry
            .location_mut(to)
            .map(|location| location.label().to_string())
            .ok_or_else(|| TransferError::UnknownLocation {
                location: to.to_string(),
            })?;
        let source = registry
            .location_mut(from)
            .ok_or_else(|| TransferError::UnknownLocation {
                location: from.to_string(),
            })?;

        let Withdrawal { parcel, slot } =
            source
                .withdraw(key)
                .ok_or_else(|| TransferError::ParcelNotFound {
                    key: key.to_string(),
                    location: from.to_string(),
                })?;

        let parcel_id = parcel.id();
        let recipient = parcel.recipient().clone();
        tracing::debug!(
            "{}: picked up parcel {} from {}",
            self.courier,
            parcel_id,
            from
        );

        let deposited = match registry.location_mut(to) {
            Some(destination) => destination.deposit(parcel),
            None => Err(Rejected::new(parcel, RejectReason::NoMatchingSlot)),
        };

        match deposited {
            Ok(()) => {
                tracing::info!(
                    "{}: parcel {} transferred from {} to {}",
                    self.courier,
                    parcel_id,
                    from,
                    to
                );
                self.notifier.notify(&Notification {
                    parcel_id,
                    recipient,
                    message: format!(
                        "Your parcel {} has arrived at {}",
                        parcel_id, destination_label
                    ),
                });
                Ok(TransferReceipt {
                    parcel_id,
                    from: from.clone(),
                    to: to.clone(),
                    courier: self.courier.clone(),
                    completed_at: Utc::now(),
                })
            }
            Err(Rejected { mut parcel, reason }) => {
                parcel.add_event(TransitEvent::now(
                    destination_label.as_str(),
                    EventKind::TransferRejected,
                ));
                Err(self.roll_back(registry, from, Withdrawal { parcel, slot }, reason))
            }
        }
    }

    /// Runs a multi-leg route, one transfer per consecutive pair of stops.
    /// Stops at the first failing leg; legs already done stay done.
    pub fn route<R: LocationRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        stops: &[LocationId],
        key: &str,
    ) -> Result<Vec<TransferReceipt>, TransferError> {
        let mut receipts = Vec::with_capacity(stops.len().saturating_sub(1));
        for leg in stops.windows(2) {
            receipts.push(self.transfer(registry, &leg[0], &leg[1], key)?);
        }
        Ok(receipts)
    }

    fn roll_back<R: LocationRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        from: &LocationId,
        withdrawal: Withdrawal,
        reason: RejectReason,
    ) -> TransferError {
        let parcel_id = withdrawal.parcel.id();
        let restored = match registry.location_mut(from) {
            Some(source) => source.restore(withdrawal),
            None => Err(Rejected::new(withdrawal.parcel, reason)),
        };

        match restored {
            Ok(()) => {
                tracing::warn!(
                    "{}: parcel {} rejected ({}), returned to {}",
                    self.courier,
                    parcel_id,
                    reason,
                    from
                );
                TransferError::Rejected {
                    parcel_id: parcel_id.to_string(),
                    reason,
                }
            }
            Err(Rejected {
                parcel,
                reason: restore_reason,
            }) => {
                tracing::error!(
                    "{}: parcel {} could not be returned to {} ({}); holding it in transit",
                    self.courier,
                    parcel_id,
                    from,
                    restore_reason
                );
                self.in_transit.insert(parcel_id, parcel);
                TransferError::RollbackFailed {
                    parcel_id: parcel_id.to_string(),
                    reason: restore_reason,
                }
            }
        }
    }

    /// Parcels the courier is holding after a failed rollback.
    pub fn stranded(&self) -> impl Iterator<Item = &Parcel> {
        self.in_transit.values()
    }

    pub fn release_stranded(&mut self, parcel_id: ParcelId) -> Option<Parcel> {
        let parcel = self.in_transit.remove(&parcel_id)?;
        tracing::info!("{}: released parcel {} from transit", self.courier, parcel_id);
        Some(parcel)
    }
}
