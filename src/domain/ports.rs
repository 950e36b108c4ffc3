use crate::domain::model::{LocationId, Notification, Rejected, Withdrawal};
use crate::domain::parcel::Parcel;
use crate::utils::error::Result;

/// Anything a courier can take a parcel from or put a parcel into.
pub trait Location {
    fn label(&self) -> &str;

    /// Read-only lookup by identifier or temp code.
    fn find(&self, key: &str) -> Option<&Parcel>;

    /// Takes the parcel out for onward transport.
    fn withdraw(&mut self, key: &str) -> Option<Withdrawal>;

    fn deposit(&mut self, parcel: Parcel) -> std::result::Result<(), Rejected>;

    /// Puts a withdrawn parcel back where it came from.
    fn restore(&mut self, withdrawal: Withdrawal) -> std::result::Result<(), Rejected> {
        self.deposit(withdrawal.parcel)
    }
}

pub trait LocationRegistry {
    fn location_mut(&mut self, id: &LocationId) -> Option<&mut dyn Location>;
}

pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// Pricing and delivery promises. The numbers live with whoever implements it.
pub trait Tariff {
    fn fee(&self, parcel: &Parcel) -> u32;
    fn delivery_days(&self, parcel: &Parcel) -> i64;
}

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}
