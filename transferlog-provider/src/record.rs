use crate::amount::wei_to_ether;
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display format for transfer timestamps, e.g. `1/1/2022, 12:00:00 AM`.
pub const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// A row as reported by the contract's `getAllTransactions()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransfer {
    pub sender: Address,
    pub receiver: Address,
    pub amount: U256,
    pub message: String,
    /// Block timestamp, in seconds since the Unix epoch.
    pub timestamp: U256,
    pub keyword: String,
}

/// A transfer ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub address_to: String,
    pub address_from: String,
    pub timestamp: String,
    pub message: String,
    pub keyword: String,
    /// Amount in ether.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("timestamp {0} does not fit in 64 bits")]
    TimestampOverflow(U256),
    #[error("timestamp {0} is outside the representable date range")]
    TimestampOutOfRange(u64),
}

impl TryFrom<RawTransfer> for TransactionRecord {
    type Error = RecordError;

    fn try_from(raw: RawTransfer) -> Result<Self, Self::Error> {
        let secs =
            u64::try_from(raw.timestamp).map_err(|_| RecordError::TimestampOverflow(raw.timestamp))?;

        Ok(Self {
            address_to: raw.receiver.to_string(),
            address_from: raw.sender.to_string(),
            timestamp: format_timestamp(secs)?,
            message: raw.message,
            keyword: raw.keyword,
            amount: wei_to_ether(raw.amount),
        })
    }
}

/// Render Unix seconds as a UTC date-time string.
pub fn format_timestamp(secs: u64) -> Result<String, RecordError> {
    let datetime = i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .ok_or(RecordError::TimestampOutOfRange(secs))?;
    Ok(datetime.format(TIMESTAMP_FORMAT).to_string())
}
