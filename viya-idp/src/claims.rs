use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigurationError;

/// Standard OpenID Connect claim type names.
pub mod claim_types {
    pub const SUBJECT: &str = "sub";
    pub const NAME: &str = "name";
    pub const GIVEN_NAME: &str = "given_name";
    pub const FAMILY_NAME: &str = "family_name";
    pub const MIDDLE_NAME: &str = "middle_name";
    pub const NICKNAME: &str = "nickname";
    pub const PREFERRED_USERNAME: &str = "preferred_username";
    pub const PROFILE: &str = "profile";
    pub const PICTURE: &str = "picture";
    pub const WEBSITE: &str = "website";
    pub const GENDER: &str = "gender";
    pub const BIRTHDATE: &str = "birthdate";
    pub const ZONE_INFO: &str = "zoneinfo";
    pub const LOCALE: &str = "locale";
    pub const UPDATED_AT: &str = "updated_at";
    pub const EMAIL: &str = "email";
    pub const EMAIL_VERIFIED: &str = "email_verified";
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const PHONE_NUMBER_VERIFIED: &str = "phone_number_verified";
    pub const ADDRESS: &str = "address";
    pub const ROLE: &str = "role";
}

/// How a claim's string value is to be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimValueType {
    #[default]
    String,
    Boolean,
    Integer,
    /// Serialized JSON (e.g. a structured `address`).
    Json,
}

/// A single typed fact about an identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaim")]
pub struct Claim {
    #[serde(rename = "type")]
    claim_type: String,
    value: String,
    value_type: ClaimValueType,
}

impl Claim {
    /// A plain string claim.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: ClaimValueType::String,
        }
    }

    pub fn boolean(claim_type: impl Into<String>, value: bool) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.to_string(),
            value_type: ClaimValueType::Boolean,
        }
    }

    pub fn integer(claim_type: impl Into<String>, value: i64) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.to_string(),
            value_type: ClaimValueType::Integer,
        }
    }

    /// A structured claim, stored as serialized JSON.
    pub fn json(claim_type: impl Into<String>, value: &Value) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.to_string(),
            value_type: ClaimValueType::Json,
        }
    }

    /// A claim whose string value must conform to `value_type`.
    pub fn typed(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        value_type: ClaimValueType,
    ) -> Result<Self, ConfigurationError> {
        let claim_type = claim_type.into();
        let value = value.into();
        let invalid = |reason: String| ConfigurationError::InvalidClaim {
            claim_type: claim_type.clone(),
            reason,
        };
        match value_type {
            ClaimValueType::String => {}
            ClaimValueType::Boolean => {
                if value != "true" && value != "false" {
                    return Err(invalid(format!("'{value}' is not a boolean")));
                }
            }
            ClaimValueType::Integer => {
                value
                    .parse::<i64>()
                    .map_err(|e| invalid(format!("'{value}' is not an integer: {e}")))?;
            }
            ClaimValueType::Json => {
                serde_json::from_str::<Value>(&value)
                    .map_err(|e| invalid(format!("value is not JSON: {e}")))?;
            }
        }
        Ok(Self {
            claim_type,
            value,
            value_type,
        })
    }

    pub fn claim_type(&self) -> &str {
        &self.claim_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn value_type(&self) -> ClaimValueType {
        self.value_type
    }

    /// The value as a native JSON value, as it would appear in a token.
    pub fn to_json_value(&self) -> Value {
        match self.value_type {
            ClaimValueType::String => Value::String(self.value.clone()),
            ClaimValueType::Boolean => Value::Bool(self.value == "true"),
            ClaimValueType::Integer => self
                .value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(self.value.clone())),
            ClaimValueType::Json => serde_json::from_str(&self.value)
                .unwrap_or_else(|_| Value::String(self.value.clone())),
        }
    }
}

/// Deserialization shape: `value` may be a scalar or, for JSON claims, a
/// structured YAML/JSON value.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClaim {
    #[serde(rename = "type")]
    claim_type: String,
    value: Value,
    #[serde(default)]
    value_type: Option<ClaimValueType>,
}

impl TryFrom<RawClaim> for Claim {
    type Error = ConfigurationError;

    fn try_from(raw: RawClaim) -> Result<Self, Self::Error> {
        match (raw.value, raw.value_type) {
            (Value::String(s), value_type) => {
                Claim::typed(raw.claim_type, s, value_type.unwrap_or_default())
            }
            (Value::Bool(b), None | Some(ClaimValueType::Boolean)) => {
                Ok(Claim::boolean(raw.claim_type, b))
            }
            (Value::Number(n), None | Some(ClaimValueType::Integer)) if n.is_i64() => {
                Claim::typed(raw.claim_type, n.to_string(), ClaimValueType::Integer)
            }
            (value @ (Value::Object(_) | Value::Array(_)), None | Some(ClaimValueType::Json)) => {
                Ok(Claim::json(raw.claim_type, &value))
            }
            (value, Some(ClaimValueType::String)) => {
                Ok(Claim::new(raw.claim_type, value.to_string()))
            }
            (value, value_type) => Err(ConfigurationError::InvalidClaim {
                claim_type: raw.claim_type,
                reason: format!("value {value} does not match value type {value_type:?}"),
            }),
        }
    }
}

/// Ordered claims attached to a user. Claim types may repeat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Vec<Claim>);

impl ClaimSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a claim (builder style).
    pub fn with(mut self, claim: Claim) -> Self {
        self.0.push(claim);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Claim> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First value for a claim type.
    pub fn first(&self, claim_type: &str) -> Option<&Claim> {
        self.0.iter().find(|c| c.claim_type == claim_type)
    }

    /// All values for a claim type, in order.
    pub fn values_of<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Keep only claims whose type is in `claim_types`, preserving order.
    pub fn filter(&self, claim_types: &BTreeSet<String>) -> ClaimSet {
        ClaimSet(
            self.0
                .iter()
                .filter(|c| claim_types.contains(&c.claim_type))
                .cloned()
                .collect(),
        )
    }

    /// Render as a JSON object; repeated claim types become arrays.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut repeated: HashSet<&str> = HashSet::new();
        for claim in &self.0 {
            let value = claim.to_json_value();
            match map.get_mut(&claim.claim_type) {
                Some(Value::Array(values)) if repeated.contains(claim.claim_type.as_str()) => {
                    values.push(value)
                }
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                    repeated.insert(&claim.claim_type);
                }
                None => {
                    map.insert(claim.claim_type.clone(), value);
                }
            }
        }
        map
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self {
        ClaimSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
