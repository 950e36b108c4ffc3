use crate::config::toml_config::{DeliveryConfig, TariffConfig};
use crate::domain::model::{ParcelSize, Service};
use crate::domain::parcel::Parcel;
use crate::domain::ports::Tariff;

/// Flat price list: a base price per size plus a surcharge per service.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTariff {
    prices: TariffConfig,
    delivery: DeliveryConfig,
}

impl ConfiguredTariff {
    pub fn new(prices: TariffConfig, delivery: DeliveryConfig) -> Self {
        Self { prices, delivery }
    }

    fn base_price(&self, size: ParcelSize) -> u32 {
        match size {
            ParcelSize::S => self.prices.small,
            ParcelSize::M => self.prices.medium,
            ParcelSize::L => self.prices.large,
        }
    }

    fn surcharge(&self, service: Service) -> u32 {
        match service {
            Service::Insurance => self.prices.insurance,
            Service::Priority => self.prices.priority,
            Service::ExtendedStorage => self.prices.extended_storage,
        }
    }
}

impl Tariff for ConfiguredTariff {
    fn fee(&self, parcel: &Parcel) -> u32 {
        parcel
            .services()
            .iter()
            .fold(self.base_price(parcel.size()), |total, service| {
                total.saturating_add(self.surcharge(*service))
            })
    }

    fn delivery_days(&self, parcel: &Parcel) -> i64 {
        if parcel.has_service(Service::Priority) {
            self.delivery.priority_days
        } else {
            self.delivery.standard_days
        }
    }
}
