use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

const TARGET_VB_UUID: &str = "target_vb_uuid";
const STARTUP_TIME: &str = "startup_time";

/// Error raised when a persisted target opaque has an unrecognized shape.
///
/// A seed document carrying a malformed opaque is rejected outright; the
/// holder refuses to initialize from it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpaqueParseError {
    #[error("target vb opaque must be a JSON object, got {0}")]
    NotAnObject(String),
    #[error("target vb opaque has an unrecognized shape: {0}")]
    UnrecognizedShape(String),
}

/// Target-side vbucket identity persisted in checkpoint records.
///
/// Three wire shapes exist, distinguished by field presence: older targets
/// persist a single numeric uuid, some persist a single string uuid, and newer
/// targets pair a string uuid with their startup time. The shape is inferred
/// at deserialization time from the field count and the runtime type of
/// `target_vb_uuid`. Equality across shapes is always false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetVbOpaque {
    Uuid { target_vb_uuid: u64 },
    UuidStr { target_vb_uuid: String },
    UuidAndStartupTime {
        target_vb_uuid: String,
        startup_time: String,
    },
}

impl TargetVbOpaque {
    /// Infers the opaque shape from a decoded JSON value.
    pub fn from_value(value: &Value) -> Result<Self, OpaqueParseError> {
        let fields = value
            .as_object()
            .ok_or_else(|| OpaqueParseError::NotAnObject(value.to_string()))?;
        let unrecognized = || OpaqueParseError::UnrecognizedShape(value.to_string());

        match fields.len() {
            1 => {
                let uuid = fields.get(TARGET_VB_UUID).ok_or_else(unrecognized)?;
                if let Some(numeric) = uuid.as_u64() {
                    return Ok(TargetVbOpaque::Uuid {
                        target_vb_uuid: numeric,
                    });
                }
                if let Some(text) = uuid.as_str() {
                    return Ok(TargetVbOpaque::UuidStr {
                        target_vb_uuid: text.to_string(),
                    });
                }
                Err(unrecognized())
            }
            2 => {
                let uuid = fields
                    .get(TARGET_VB_UUID)
                    .and_then(Value::as_str)
                    .ok_or_else(unrecognized)?;
                let startup_time = fields
                    .get(STARTUP_TIME)
                    .and_then(Value::as_str)
                    .ok_or_else(unrecognized)?;
                Ok(TargetVbOpaque::UuidAndStartupTime {
                    target_vb_uuid: uuid.to_string(),
                    startup_time: startup_time.to_string(),
                })
            }
            _ => Err(unrecognized()),
        }
    }
}

impl Serialize for TargetVbOpaque {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TargetVbOpaque::Uuid { target_vb_uuid } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TARGET_VB_UUID, target_vb_uuid)?;
                map.end()
            }
            TargetVbOpaque::UuidStr { target_vb_uuid } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TARGET_VB_UUID, target_vb_uuid)?;
                map.end()
            }
            TargetVbOpaque::UuidAndStartupTime {
                target_vb_uuid,
                startup_time,
            } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(TARGET_VB_UUID, target_vb_uuid)?;
                map.serialize_entry(STARTUP_TIME, startup_time)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TargetVbOpaque {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// One persisted restart position for a vbucket.
///
/// Pairs the source through seqno with the source failover identity, the dcp
/// snapshot bounds it was taken inside, and the target-side opaque + seqno.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub failover_uuid: u64,
    /// Source through seqno at checkpoint time.
    pub seqno: u64,
    pub dcp_snapshot_seqno: u64,
    pub dcp_snapshot_end_seqno: u64,
    pub target_vb_opaque: TargetVbOpaque,
    pub target_seqno: u64,
}

impl CheckpointRecord {
    /// Serializes the record to JSON for storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a record from JSON; a malformed opaque shape fails the whole
    /// record.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
