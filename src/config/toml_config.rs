use crate::adapters::ConfiguredTariff;
use crate::core::desk::ParcelDesk;
use crate::core::locker::{HistoryRetention, Locker};
use crate::core::network::LockerNetwork;
use crate::core::storage_facility::StorageFacility;
use crate::core::transfer::TransferCoordinator;
use crate::domain::parcel::{PRIORITY_DELIVERY_DAYS, STANDARD_DELIVERY_DAYS};
use crate::domain::ports::Notifier;
use crate::utils::error::{LockerError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_DELIVERY_DAYS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Option<NetworkSection>,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub tariff: TariffConfig,
    #[serde(default)]
    pub courier: CourierConfig,
    #[serde(default)]
    pub lockers: Vec<LockerConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    pub name: String,
    /// Rolling window of locker history entries. Absent keeps everything.
    pub history_retention: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub standard_days: i64,
    pub priority_days: i64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            standard_days: STANDARD_DELIVERY_DAYS,
            priority_days: PRIORITY_DELIVERY_DAYS,
        }
    }
}

/// Prices in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    pub small: u32,
    pub medium: u32,
    pub large: u32,
    pub insurance: u32,
    pub priority: u32,
    pub extended_storage: u32,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            small: 500,
            medium: 800,
            large: 1000,
            insurance: 200,
            priority: 500,
            extended_storage: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub name: String,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            name: "Courier".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockerConfig {
    pub id: String,
    pub address: String,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub lockers: Vec<LockerConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub name: String,
}

impl NetworkConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LockerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LockerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            LockerError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn section(&self) -> Result<&NetworkSection> {
        validation::validate_required_field("network", &self.network)
    }

    pub fn retention(&self) -> Result<HistoryRetention> {
        Ok(match self.section()?.history_retention {
            Some(limit) => HistoryRetention::Last(limit),
            None => HistoryRetention::Unbounded,
        })
    }

    /// Lockers at every level of the tree, top level first.
    pub fn all_lockers(&self) -> Vec<&LockerConfig> {
        let mut out: Vec<&LockerConfig> = self.lockers.iter().collect();
        for group in &self.groups {
            group.collect_lockers(&mut out);
        }
        out
    }

    pub fn all_facilities(&self) -> Vec<&FacilityConfig> {
        let mut out: Vec<&FacilityConfig> = self.facilities.iter().collect();
        for group in &self.groups {
            group.collect_facilities(&mut out);
        }
        out
    }

    pub fn validate_config(&self) -> Result<()> {
        let section = self.section()?;
        validation::validate_non_empty_string("network.name", &section.name)?;
        if let Some(limit) = section.history_retention {
            validation::validate_positive_number("network.history_retention", limit, 1)?;
        }

        validation::validate_range(
            "delivery.standard_days",
            self.delivery.standard_days,
            1,
            MAX_DELIVERY_DAYS,
        )?;
        validation::validate_range(
            "delivery.priority_days",
            self.delivery.priority_days,
            1,
            self.delivery.standard_days,
        )?;

        validation::validate_non_empty_string("courier.name", &self.courier.name)?;

        let lockers = self.all_lockers();
        for locker in &lockers {
            validation::validate_non_empty_string("lockers.id", &locker.id)?;
            validation::validate_non_empty_string(
                &format!("lockers.{}.address", locker.id),
                &locker.address,
            )?;
            validation::validate_slot_sizes(&format!("lockers.{}.slots", locker.id), &locker.slots)?;
        }
        validation::validate_unique("lockers.id", lockers.iter().map(|l| l.id.as_str()))?;

        let facilities = self.all_facilities();
        for facility in &facilities {
            validation::validate_non_empty_string("facilities.name", &facility.name)?;
        }
        validation::validate_unique(
            "facilities.name",
            facilities.iter().map(|f| f.name.as_str()),
        )?;

        for group in &self.groups {
            group.validate_names()?;
        }

        Ok(())
    }

    /// Builds the whole locker tree. Validates first.
    pub fn build_network(&self) -> Result<LockerNetwork> {
        self.validate_config()?;
        let section = self.section()?;
        let retention = self.retention()?;

        let mut network = LockerNetwork::new(section.name.as_str());
        populate(
            &mut network,
            &self.lockers,
            &self.groups,
            &self.facilities,
            retention,
        )?;

        tracing::info!(
            "Built network {} with {} lockers and {} storage facilities",
            network.name(),
            network.lockers().len(),
            network.facilities().len()
        );
        Ok(network)
    }

    pub fn build_tariff(&self) -> ConfiguredTariff {
        ConfiguredTariff::new(self.tariff.clone(), self.delivery.clone())
    }

    pub fn build_coordinator<N: Notifier>(&self, notifier: N) -> TransferCoordinator<N> {
        TransferCoordinator::new(self.courier.name.as_str(), notifier)
    }

    pub fn build_desk<N: Notifier>(&self, notifier: N) -> ParcelDesk<N, ConfiguredTariff> {
        ParcelDesk::new(notifier, self.build_tariff())
    }
}

impl GroupConfig {
    fn collect_lockers<'a>(&'a self, out: &mut Vec<&'a LockerConfig>) {
        out.extend(self.lockers.iter());
        for group in &self.groups {
            group.collect_lockers(out);
        }
    }

    fn collect_facilities<'a>(&'a self, out: &mut Vec<&'a FacilityConfig>) {
        out.extend(self.facilities.iter());
        for group in &self.groups {
            group.collect_facilities(out);
        }
    }

    fn validate_names(&self) -> Result<()> {
        validation::validate_non_empty_string("groups.name", &self.name)?;
        for group in &self.groups {
            group.validate_names()?;
        }
        Ok(())
    }
}

fn populate(
    network: &mut LockerNetwork,
    lockers: &[LockerConfig],
    groups: &[GroupConfig],
    facilities: &[FacilityConfig],
    retention: HistoryRetention,
) -> Result<()> {
    for config in lockers {
        let sizes =
            validation::validate_slot_sizes(&format!("lockers.{}.slots", config.id), &config.slots)?;
        network.add_locker(
            Locker::new(config.id.as_str(), config.address.as_str())
                .with_slots(sizes)
                .with_retention(retention),
        )?;
    }

    for group in groups {
        let mut sub = LockerNetwork::new(group.name.as_str());
        populate(
            &mut sub,
            &group.lockers,
            &group.groups,
            &group.facilities,
            retention,
        )?;
        network.add_group(sub)?;
    }

    for facility in facilities {
        network.add_facility(StorageFacility::new(facility.name.as_str()))?;
    }
    Ok(())
}

impl Validate for NetworkConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
