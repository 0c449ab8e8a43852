use std::fmt;

use chrono::{DateTime, Utc};
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::domain::{AvailCheckId, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Style class the message region carries while showing a result of this status.
    pub fn message_class(self) -> &'static str {
        match self {
            Self::Success => "success_message",
            Self::Error => "error_message",
        }
    }
}

/// Field name to ordered error messages, in the order the server listed the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, messages: Vec<String>) {
        self.0.push((field.into(), messages));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Every `(field, message)` pair, fields in server order.
    pub fn iter_all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| (field.as_str(), message.as_str()))
        })
    }

    pub fn first_errors(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter_map(|(_, messages)| messages.first().map(String::as_str))
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldErrorsVisitor;

        impl<'de> Visitor<'de> for FieldErrorsVisitor {
            type Value = FieldErrors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to error lists, or null")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(FieldErrors::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(FieldErrors::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut errors = FieldErrors::default();
                while let Some((field, messages)) = access.next_entry::<String, ErrorList>()? {
                    errors.push(field, messages.0);
                }
                Ok(errors)
            }
        }

        deserializer.deserialize_any(FieldErrorsVisitor)
    }
}

/// Django sends either a list of strings or a single string per field.
struct ErrorList(Vec<String>);

impl<'de> Deserialize<'de> for ErrorList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(message) => ErrorList(vec![message]),
            Raw::Many(messages) => ErrorList(messages),
        })
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalised payload of every mutating endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult<E = serde_json::Value> {
    pub status: ActionStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default)]
    pub errors: FieldErrors,
    #[serde(alias = "user", skip_serializing_if = "Option::is_none")]
    pub entity: Option<E>,
}

impl<E> ActionResult<E> {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegFormResponse {
    pub user_reg_form: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandinRegFormResponse {
    #[serde(default)]
    pub standin_reg_form: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub user: Option<UserRef>,
    pub profile_form: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailCheckRecord {
    pub id: AvailCheckId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AvailCheckRecord {
    /// Key used for the list item id; `pk` when the server sent one.
    pub fn list_key(&self) -> i64 {
        self.pk.unwrap_or(self.id.0)
    }

    pub fn summary(&self) -> String {
        let project = match &self.project {
            Some(serde_json::Value::String(name)) => name.clone(),
            Some(serde_json::Value::Null) | None => format!("Avail check {}", self.id),
            Some(other) => other.to_string(),
        };
        match self.created_at {
            Some(created_at) => format!("{project} ({})", created_at.format("%Y-%m-%d")),
            None => project,
        }
    }
}
