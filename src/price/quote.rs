//! Normalized price quotes
//!
//! `getFeedById` answers `(uint256 value, int8 decimals, uint64 timestamp)`.
//! The quoted price is `value / 10^decimals`; negative decimals scale up.

use super::feed_id::FeedId;
use crate::client::CallValue;
use crate::error::{SdkError, SdkResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Largest scale `Decimal` can hold
const MAX_SCALE: u32 = 28;

/// A single normalized oracle price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Feed name, e.g. `BTC/USD`
    pub symbol: String,
    pub feed_id: FeedId,
    /// Price in quote currency units
    pub value: Decimal,
    /// Raw integer answer from the oracle
    pub raw_value: u128,
    pub decimals: i8,
    /// When the oracle last updated the feed
    pub timestamp: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote from the decoded `getFeedById` result
    pub fn from_call_value(feed: &FeedId, value: &CallValue) -> SdkResult<Self> {
        let unusable = |reason: &str| {
            SdkError::value_unavailable(format!("unusable answer for {}: {}", feed, reason))
        };

        let fields = match value.as_tuple() {
            Some([raw, decimals, timestamp]) => (raw, decimals, timestamp),
            _ => return Err(unusable("expected (value, decimals, timestamp)")),
        };

        let raw_value = fields
            .0
            .as_uint()
            .ok_or_else(|| unusable("value is not an unsigned integer"))?;
        let decimals = fields
            .1
            .as_int()
            .and_then(|d| i8::try_from(d).ok())
            .ok_or_else(|| unusable("decimals out of range"))?;
        let timestamp_secs = fields
            .2
            .as_uint()
            .and_then(|t| i64::try_from(t).ok())
            .ok_or_else(|| unusable("timestamp out of range"))?;

        if timestamp_secs == 0 {
            return Err(unusable("feed has never been updated"));
        }
        let timestamp = DateTime::<Utc>::from_timestamp(timestamp_secs, 0)
            .ok_or_else(|| unusable("timestamp out of range"))?;

        let value = scale(raw_value, decimals).ok_or_else(|| unusable("value overflows"))?;

        Ok(Self {
            symbol: feed.name().to_string(),
            feed_id: feed.clone(),
            value,
            raw_value,
            decimals,
            timestamp,
        })
    }

    /// Age of the oracle value relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.timestamp)
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} @ {}", self.symbol, self.value, self.timestamp.to_rfc3339())
    }
}

fn scale(raw: u128, decimals: i8) -> Option<Decimal> {
    let raw = i128::try_from(raw).ok()?;
    if decimals >= 0 {
        let scale = u32::from(decimals.unsigned_abs());
        if scale > MAX_SCALE {
            return None;
        }
        Decimal::try_from_i128_with_scale(raw, scale).ok()
    } else {
        let mut value = Decimal::try_from_i128_with_scale(raw, 0).ok()?;
        for _ in 0..decimals.unsigned_abs() {
            value = value.checked_mul(Decimal::TEN)?;
        }
        Some(value)
    }
}
