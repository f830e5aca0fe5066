//! Shared data structures: foundations, amount choices, persisted
//! preference records and outbound payment requests.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel stored in place of a preset when the user types their own amount.
pub const CUSTOM_SENTINEL: &str = "custom";

/// A donatable charitable entity as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foundation {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    /// Image reference, resolved by the presentation layer.
    pub image: String,
    /// ISO currency code, e.g. `THB`.
    pub currency: String,
}

/// The provider may hand out numeric or string identifiers.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Which amount the user has selected in the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountChoice {
    /// One of the suggested amounts.
    Preset(u64),
    /// The user enters the amount themselves.
    Custom,
}

impl AmountChoice {
    /// Parse the stored / submitted string form (`"20"` or `"custom"`).
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == CUSTOM_SENTINEL {
            return Some(Self::Custom);
        }
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().filter(|n| *n > 0).map(Self::Preset)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom)
    }
}

impl fmt::Display for AmountChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(n) => write!(f, "{n}"),
            Self::Custom => f.write_str(CUSTOM_SENTINEL),
        }
    }
}

impl Serialize for AmountChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ordered, non-empty list of suggested amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Presets(Vec<u64>);

impl Presets {
    pub fn new(amounts: Vec<u64>) -> Option<Self> {
        if amounts.is_empty() {
            None
        } else {
            Some(Self(amounts))
        }
    }

    /// The amount a never-seen foundation starts with.
    pub fn first(&self) -> u64 {
        self.0[0]
    }

    pub fn contains(&self, amount: u64) -> bool {
        self.as_slice().contains(&amount)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

/// Remembered amount for one foundation, as persisted in the store.
///
/// `donation_amount` is kept as the raw string so that a single malformed
/// entry never prevents the rest of the mapping from loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    pub id: String,
    pub donation_amount: String,
    /// Last custom number typed for this foundation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_amount: Option<u64>,
}

/// Body of `POST /foundations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(rename = "charitiesId")]
    pub foundation_id: String,
    pub amount: u64,
    pub currency: String,
}

/// Lower bound on how long an operation appears to take.
///
/// Fast responses are held back until the floor has elapsed so the
/// presentation layer does not flash a spinner for a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinLatency(pub Duration);

impl MinLatency {
    pub async fn hold<F: Future>(&self, operation: F) -> F::Output {
        if self.0.is_zero() {
            return operation.await;
        }
        let floor = tokio::time::sleep(self.0);
        let (output, ()) = tokio::join!(operation, floor);
        output
    }
}
