// Gauge value encoding
//
// Values are stored as decimal text with six fractional digits. Upstream
// reports the active-request gauge as a double even though it is integral in
// practice, so the text form must survive fractional values too.

use super::error::StoreError;

/// Number of fractional digits written for every gauge.
pub const VALUE_PRECISION: usize = 6;

/// Encode a gauge value for storage.
pub fn encode_value(value: f64) -> String {
    format!("{:.*}", VALUE_PRECISION, value)
}

/// Decode a stored gauge value.
///
/// `key` is only used to build the error message.
pub fn decode_value(key: &str, raw: &str) -> Result<f64, StoreError> {
    raw.trim().parse::<f64>().map_err(|_| StoreError::Corrupt {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
