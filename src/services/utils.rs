//! # src/services/utils.rs
//!
//! Kleine, überall benötigte Hilfsfunktionen: Zeitstempel im einheitlichen
//! Format und die kanonische JSON-Serialisierung (RFC 8785), auf der alle
//! Hash- und Signaturoperationen aufbauen.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::ContractCoreError;

/// Das einheitliche Zeitstempel-Format der Bibliothek (UTC, Mikrosekunden).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Gibt den aktuellen UTC-Zeitstempel als formatierten String zurück.
pub fn get_current_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Gibt einen Zeitstempel zurück, der `days` Tage in der Zukunft liegt.
///
/// Wird für Ablaufdaten von Verträgen und Zertifikaten verwendet.
pub fn get_timestamp_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parst einen Zeitstempel-String der Bibliothek zurück in ein `DateTime<Utc>`.
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, ContractCoreError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ContractCoreError::Crypto(format!("Invalid timestamp '{}': {}", ts, e)))
}

/// Prüft, ob der übergebene Ablauf-Zeitstempel in der Vergangenheit liegt.
///
/// Ein nicht parsbarer Zeitstempel gilt als abgelaufen (fail-closed).
pub fn is_in_past(ts: &str) -> bool {
    match parse_timestamp(ts) {
        Ok(dt) => dt <= Utc::now(),
        Err(_) => true,
    }
}

/// Serialisiert eine beliebige Struktur in ihre kanonische JSON-Form
/// nach RFC 8785 (JCS). Zwei semantisch gleiche Objekte ergeben so
/// byte-identische Eingaben für Hash und Signatur.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, ContractCoreError> {
    serde_json_canonicalizer::to_string(value).map_err(ContractCoreError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        let value = json!({ "b": 2, "a": 1 });
        let canonical = to_canonical_json(&value).unwrap();
        assert_eq!(canonical, r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn timestamp_roundtrip() {
        let ts = get_current_timestamp();
        assert!(parse_timestamp(&ts).is_ok());
        assert!(!is_in_past(&get_timestamp_in_days(1)));
        assert!(is_in_past(&get_timestamp_in_days(-1)));
    }

    #[test]
    fn unparsable_expiry_counts_as_expired() {
        assert!(is_in_past("not-a-timestamp"));
    }
}
