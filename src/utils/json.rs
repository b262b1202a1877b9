use serde_json::Value;

/// Three-way state of an optional nullable JSON field in a patch body.
#[derive(Debug, PartialEq, Eq)]
pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

impl NullableValue {
    /// Changeset form: omitted leaves the column alone, null clears it.
    /// Blank strings clear as well.
    pub fn into_patch(self) -> Option<Option<String>> {
        match self {
            NullableValue::Omitted => None,
            NullableValue::Null => Some(None),
            NullableValue::String(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Some(None)
                } else {
                    Some(Some(trimmed.to_string()))
                }
            }
        }
    }
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}
