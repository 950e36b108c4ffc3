use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::network::{LockerNetwork, Placement};
use crate::domain::model::{
    Contact, EventKind, Notification, ParcelId, ParcelSize, Rejected, Service, TempCode,
    TransitEvent,
};
use crate::domain::parcel::Parcel;
use crate::domain::ports::{Notifier, Tariff};
use crate::utils::error::{LockerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub sender: Contact,
    pub recipient: Contact,
    pub size: ParcelSize,
    #[serde(default)]
    pub services: Vec<Service>,
    pub sender_locker: String,
    pub delivery_locker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub parcel_id: ParcelId,
    pub fee: u32,
    pub temp_code: TempCode,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub guaranteed_delivery: Option<DateTime<Utc>>,
}

/// Customer-facing flows: register, pay, drop off, collect, track.
pub struct ParcelDesk<N: Notifier, T: Tariff> {
    notifier: N,
    tariff: T,
}

impl<N: Notifier, T: Tariff> ParcelDesk<N, T> {
    pub fn new(notifier: N, tariff: T) -> Self {
        Self { notifier, tariff }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Creates the parcel and puts it on the sender locker's expected list.
    pub fn register(
        &self,
        network: &mut LockerNetwork,
        request: RegistrationRequest,
    ) -> Result<ParcelId> {
        for id in [&request.sender_locker, &request.delivery_locker] {
            if network.locker(id).is_none() {
                return Err(LockerError::UnknownLocker { id: id.clone() });
            }
        }

        let mut parcel = Parcel::create(
            request.sender,
            request.recipient,
            request.size,
            request.services,
        )
        .with_route(request.sender_locker.as_str(), request.delivery_locker.as_str());
        parcel.add_event(TransitEvent::now(
            request.sender_locker.as_str(),
            EventKind::Registered,
        ));

        let parcel_id = parcel.id();
        let notification = Notification {
            parcel_id,
            recipient: parcel.recipient().clone(),
            message: format!(
                "Parcel {} from {} is on its way to locker {}",
                parcel_id,
                parcel.sender().name,
                request.delivery_locker
            ),
        };

        network
            .locker_mut(&request.sender_locker)
            .ok_or_else(|| LockerError::UnknownLocker {
                id: request.sender_locker.clone(),
            })?
            .add_expected_parcel(parcel);

        tracing::info!(
            "Registered parcel {} at locker {}",
            parcel_id,
            request.sender_locker
        );
        self.notifier.notify(&notification);
        Ok(parcel_id)
    }

    /// Marks the parcel paid, issues its temp code and sets its delivery window.
    pub fn pay(&self, network: &mut LockerNetwork, key: &str) -> Result<PaymentReceipt> {
        let parcel = network
            .parcel_mut(key)
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })?;

        let fee = self.tariff.fee(parcel);
        let days = self.tariff.delivery_days(parcel);
        let temp_code = parcel.mark_paid()?.clone();
        parcel.compute_delivery_window(days);

        let location = parcel.sender_locker().unwrap_or("desk").to_string();
        parcel.add_event(TransitEvent::now(location, EventKind::PaymentReceived));

        tracing::info!("Parcel {} paid, fee {}", parcel.id(), fee);
        Ok(PaymentReceipt {
            parcel_id: parcel.id(),
            fee,
            temp_code,
            estimated_delivery: parcel.estimated_delivery(),
            guaranteed_delivery: parcel.guaranteed_delivery(),
        })
    }

    /// Sender drops a registered parcel into the locker that expects it.
    /// Returns the slot it landed in.
    pub fn deposit(
        &self,
        network: &mut LockerNetwork,
        key: &str,
        sender_phone: &str,
    ) -> Result<usize> {
        let lookup = network
            .find_parcel(key)
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })?;
        let parcel = lookup.parcel;
        let parcel_id = parcel.id();

        if parcel.sender().phone != sender_phone {
            return Err(LockerError::ContactMismatch {
                parcel_id: parcel_id.to_string(),
                role: "sender".to_string(),
            });
        }
        if !parcel.is_paid() {
            return Err(LockerError::PaymentRequired {
                parcel_id: parcel_id.to_string(),
            });
        }
        let Placement::Expected { locker: locker_id } = lookup.placement else {
            return Err(LockerError::NotAwaitingDeposit {
                parcel_id: parcel_id.to_string(),
            });
        };

        let locker = network
            .locker_mut(&locker_id)
            .ok_or_else(|| LockerError::UnknownLocker {
                id: locker_id.clone(),
            })?;
        let parcel = locker
            .remove_expected_parcel(parcel_id)
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })?;

        match locker.receive(parcel) {
            Ok(slot) => Ok(slot),
            Err(Rejected { parcel, reason }) => {
                locker.add_expected_parcel(parcel);
                Err(LockerError::DepositRejected {
                    parcel_id: parcel_id.to_string(),
                    reason,
                })
            }
        }
    }

    /// Recipient takes the parcel out of the locker. The parcel leaves the
    /// network and is handed back to the caller.
    pub fn collect(
        &self,
        network: &mut LockerNetwork,
        key: &str,
        recipient_phone: &str,
    ) -> Result<Parcel> {
        let lookup = network
            .find_parcel(key)
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })?;
        let parcel_id = lookup.parcel.id();

        if lookup.parcel.recipient().phone != recipient_phone {
            return Err(LockerError::ContactMismatch {
                parcel_id: parcel_id.to_string(),
                role: "recipient".to_string(),
            });
        }
        let Placement::Slot {
            locker: locker_id, ..
        } = lookup.placement
        else {
            return Err(LockerError::NotCollectable {
                parcel_id: parcel_id.to_string(),
            });
        };

        let mut parcel = network
            .locker_mut(&locker_id)
            .and_then(|locker| locker.dispatch(key))
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })?;
        parcel.clear_temp_code();

        tracing::info!("Parcel {} collected from locker {}", parcel_id, locker_id);
        self.notifier.notify(&Notification {
            parcel_id,
            recipient: parcel.recipient().clone(),
            message: format!("Your parcel {} has been collected", parcel_id),
        });
        Ok(parcel)
    }

    pub fn track<'a>(&self, network: &'a LockerNetwork, key: &str) -> Result<&'a [TransitEvent]> {
        network
            .find_parcel(key)
            .map(|lookup| lookup.parcel.transit_history())
            .ok_or_else(|| LockerError::ParcelNotFound {
                key: key.to_string(),
            })
    }
}
