use std::fmt;
use std::ops::Deref;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::errors::Error;

/// Free-form OCR value. The extractor emits numbers and text in the same
/// fields (`"duration_days": 7` next to `"duration_days": "As needed"`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{}", value),
            Scalar::Number(value) => write!(f, "{}", value),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(value.into())
    }
}

/// Typed reading of the known prescription fields
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrescriptionFields {
    pub patient_name: Option<Scalar>,
    pub age: Option<Scalar>,
    pub gender: Option<Scalar>,
    pub prescription_date: Option<Scalar>,
    pub doctor_name: Option<Scalar>,
    pub diagnosis: Option<Scalar>,
    pub disease_info: DiseaseInfo,
    pub medications: Vec<Medication>,
    pub reminders: Reminders,
    pub additional_notes: Option<Scalar>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiseaseInfo {
    pub summary: Option<Scalar>,
    pub precautions: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Medication {
    pub medicine_name: Option<Scalar>,
    pub dosage: Option<Scalar>,
    pub duration_days: Option<Scalar>,
    pub total_doses: Option<Scalar>,
    pub purpose: Option<Scalar>,
    pub notes: Option<Scalar>,
    pub side_effects: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Reminders {
    pub enabled: bool,
    pub times: Vec<String>,
}

/// Structured prescription produced by the OCR service.
///
/// The document is kept exactly as received and is what gets serialized and
/// stored; the typed fields (reachable through `Deref`) are a read-only view
/// of it for rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrescriptionRecord {
    document: Map<String, Value>,
    fields: PrescriptionFields,
}

impl PrescriptionRecord {
    /// Decodes the string-encoded document carried in the OCR `data` field.
    pub fn from_ocr_payload(payload: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(payload).map_err(|e| Error::ParseFailed {
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(document) => {
                Self::from_document(document).map_err(|e| Error::ParseFailed {
                    reason: e.to_string(),
                })
            }
            _ => Err(Error::ParseFailed {
                reason: "OCR data is not a JSON object".to_string(),
            }),
        }
    }

    pub fn from_document(document: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let fields = PrescriptionFields::deserialize(&Value::Object(document.clone()))?;
        Ok(Self { document, fields })
    }

    /// The document as the OCR service sent it.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}

impl Deref for PrescriptionRecord {
    type Target = PrescriptionFields;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl Serialize for PrescriptionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PrescriptionRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Map::deserialize(deserializer)?;
        Self::from_document(document).map_err(de::Error::custom)
    }
}
