use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const DEFAULT_LIMIT: i64 = 100;

/// A row of the `inventory_items` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: bool,
}

/// Payload accepted by `POST /items`.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct CreationInput {
    /// Unique item name.
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    #[schema(example = "Coffee Beans", min_length = 1, max_length = 100)]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    #[schema(example = "Arabica dark roast", max_length = 500)]
    pub description: Option<String>,
    /// `true` for active, `false` for inactive.
    #[serde(default = "default_status")]
    #[schema(default = true)]
    pub status: bool,
}

fn default_status() -> bool {
    true
}

impl CreationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            status: default_status(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.status = status;
        self
    }

    /// Names are stored without surrounding whitespace.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// State of a single field in a partial update.
///
/// `Unset` is what an omitted field deserializes to (via `#[serde(default)]`),
/// `Null` is an explicit JSON `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Payload accepted by `PUT /items/:id`. Omitted fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct UpdateInput {
    #[serde(default)]
    #[schema(value_type = Option<String>, min_length = 1, max_length = 100)]
    pub name: Patch<String>,
    /// `null` clears the description.
    #[serde(default)]
    #[schema(value_type = Option<String>, max_length = 500)]
    pub description: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub status: Patch<bool>,
}

impl UpdateInput {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Patch::Value(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Patch::Value(description.into());
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Patch::Null;
        self
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.status = Patch::Value(status);
        self
    }

    pub fn normalized(mut self) -> Self {
        if let Patch::Value(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        self
    }

    /// True when applying this update would not write any column. A `null`
    /// name or status is never written.
    pub fn is_empty(&self) -> bool {
        self.name.as_value().is_none()
            && self.description.is_unset()
            && self.status.as_value().is_none()
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

impl Validate for UpdateInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match &self.name {
            Patch::Null => errors.add("name", field_error("null", "may not be null")),
            Patch::Value(name) if name.is_empty() || name.chars().count() > NAME_MAX_LEN => errors
                .add(
                    "name",
                    field_error("length", "must be between 1 and 100 characters"),
                ),
            _ => {}
        }

        if let Patch::Value(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                errors.add(
                    "description",
                    field_error("length", "must be at most 500 characters"),
                );
            }
        }

        if let Patch::Null = self.status {
            errors.add("status", field_error("null", "may not be null"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Query parameters of `GET /items`.
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Number of items to skip (default 0).
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub skip: Option<i64>,
    /// Maximum number of items to return (default 100).
    #[validate(range(min = 0, message = "must be greater than or equal to 0"))]
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemOutput {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: bool,
}

impl From<InventoryItem> for ItemOutput {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            status: item.status,
        }
    }
}
