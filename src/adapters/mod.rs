// Adapters: concrete implementations of the domain ports.

pub mod notifier;
pub mod tariff;

pub use notifier::TracingNotifier;
pub use tariff::ConfiguredTariff;
