pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{cli::LocalStorage, CliConfig};

pub use crate::adapters::{ConfiguredTariff, TracingNotifier};
pub use crate::config::toml_config::NetworkConfig;
pub use crate::core::{
    desk::{ParcelDesk, RegistrationRequest},
    locker::Locker,
    network::LockerNetwork,
    report::NetworkReport,
    storage_facility::StorageFacility,
    transfer::{TransferCoordinator, TransferError},
};
pub use crate::utils::error::{LockerError, Result};
