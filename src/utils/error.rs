use crate::core::transfer::TransferError;
use crate::domain::model::RejectReason;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockerError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Locker '{id}' not found")]
    UnknownLocker { id: String },

    #[error("Locker '{id}' is already registered")]
    DuplicateLocker { id: String },

    #[error("Storage facility '{name}' is already registered")]
    DuplicateFacility { name: String },

    #[error("Parcel '{key}' not found")]
    ParcelNotFound { key: String },

    #[error("Parcel {parcel_id} has not been paid for")]
    PaymentRequired { parcel_id: String },

    #[error("Parcel {parcel_id} has already been paid")]
    AlreadyPaid { parcel_id: String },

    #[error("Parcel {parcel_id} is not awaiting collection")]
    NotCollectable { parcel_id: String },

    #[error("Parcel {parcel_id} is not waiting to be dropped off")]
    NotAwaitingDeposit { parcel_id: String },

    #[error("Phone number does not match the {role} of parcel {parcel_id}")]
    ContactMismatch { parcel_id: String, role: String },

    #[error("Locker '{id}' is not empty or has incoming parcels")]
    LockerBusy { id: String },

    #[error("Deposit of parcel {parcel_id} rejected: {reason}")]
    DepositRejected {
        parcel_id: String,
        reason: RejectReason,
    },

    #[error("Transfer failed: {0}")]
    TransferError(#[from] TransferError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Operation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LockerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LockerError::ConfigValidationError { .. }
            | LockerError::InvalidConfigValueError { .. }
            | LockerError::MissingConfigError { .. }
            | LockerError::DuplicateLocker { .. }
            | LockerError::DuplicateFacility { .. } => ErrorCategory::Configuration,
            LockerError::UnknownLocker { .. }
            | LockerError::ParcelNotFound { .. }
            | LockerError::AlreadyPaid { .. }
            | LockerError::PaymentRequired { .. }
            | LockerError::NotCollectable { .. }
            | LockerError::NotAwaitingDeposit { .. }
            | LockerError::ContactMismatch { .. } => ErrorCategory::Input,
            LockerError::LockerBusy { .. }
            | LockerError::DepositRejected { .. }
            | LockerError::TransferError(_) => ErrorCategory::Operation,
            LockerError::ZipError(_)
            | LockerError::CsvError(_)
            | LockerError::IoError(_)
            | LockerError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LockerError::AlreadyPaid { .. } => ErrorSeverity::Low,
            LockerError::TransferError(TransferError::RollbackFailed { .. }) => {
                ErrorSeverity::Critical
            }
            e if e.category() == ErrorCategory::Input => ErrorSeverity::Medium,
            e if e.category() == ErrorCategory::Operation => ErrorSeverity::Medium,
            e if e.category() == ErrorCategory::Configuration => ErrorSeverity::High,
            _ => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LockerError::ConfigValidationError { field, .. }
            | LockerError::InvalidConfigValueError { field, .. }
            | LockerError::MissingConfigError { field } => {
                format!("Check the '{}' entry of the network configuration file", field)
            }
            LockerError::DuplicateLocker { id } => {
                format!("Give locker '{}' a unique identifier", id)
            }
            LockerError::DuplicateFacility { name } => {
                format!("Give storage facility '{}' a unique name", name)
            }
            LockerError::UnknownLocker { .. } => {
                "List the lockers of the network and retry with a known identifier".to_string()
            }
            LockerError::ParcelNotFound { .. } => {
                "Check the parcel identifier or temporary code".to_string()
            }
            LockerError::AlreadyPaid { .. } => "No action needed".to_string(),
            LockerError::PaymentRequired { .. } => {
                "Complete the payment for this parcel first".to_string()
            }
            LockerError::NotCollectable { .. } => {
                "Track the parcel to see where it currently is".to_string()
            }
            LockerError::NotAwaitingDeposit { .. } => {
                "The parcel has already been dropped off".to_string()
            }
            LockerError::ContactMismatch { .. } => {
                "Retry with the phone number given at registration".to_string()
            }
            LockerError::LockerBusy { .. } => {
                "Empty the locker and clear its expected parcels first".to_string()
            }
            LockerError::DepositRejected { reason, .. } => match reason {
                RejectReason::NotPaid => "Pay for the parcel before depositing it".to_string(),
                _ => "Try another locker or wait for a slot to free up".to_string(),
            },
            LockerError::TransferError(TransferError::RollbackFailed { parcel_id, .. }) => {
                format!(
                    "Parcel {} is held in transit; release it and place it manually",
                    parcel_id
                )
            }
            LockerError::TransferError(_) => {
                "Check both locations and the parcel identifier, then retry".to_string()
            }
            LockerError::IoError(_) | LockerError::ZipError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            LockerError::CsvError(_) | LockerError::SerializationError(_) => {
                "Report this as a bug; the report data could not be encoded".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Request could not be completed: {}", self),
            ErrorCategory::Operation => format!("Operation rejected: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LockerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_high_severity() {
        let err = LockerError::MissingConfigError {
            field: "network.name".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("network.name"));
    }

    #[test]
    fn test_stranded_transfer_is_critical() {
        let err = LockerError::from(TransferError::RollbackFailed {
            parcel_id: "p-1".to_string(),
            reason: RejectReason::NoMatchingSlot,
        });
        assert_eq!(err.category(), ErrorCategory::Operation);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = LockerError::UnknownLocker {
            id: "999".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("999"));
    }
}
