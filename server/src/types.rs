//! Shapes exchanged with the HTTP layer: the inbound `RecipeRequest` and the
//! fully assembled `Recipe` aggregate returned from every read and write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Measurement system a unit belongs to. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSystem {
    Metric,
    Imperial,
}

impl MeasurementSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementSystem::Metric => "metric",
            MeasurementSystem::Imperial => "imperial",
        }
    }
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid measurement system: {0}")]
pub struct UnknownMeasurementSystem(pub String);

impl FromStr for MeasurementSystem {
    type Err = UnknownMeasurementSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(MeasurementSystem::Metric),
            "imperial" => Ok(MeasurementSystem::Imperial),
            other => Err(UnknownMeasurementSystem(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementUnit {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    pub system: MeasurementSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_unit_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredient_category: Option<String>,
    /// `None` means "to taste".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sort_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<MeasurementUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub id: Uuid,
    pub step_number: i32,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A recipe with its ingredients, steps and tags.
///
/// The list view only fills the scalar fields; the collections are then empty
/// and omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serves: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i32>,
    /// Computed by the database from prep + cook time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<RecipeStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredientRequest {
    pub ingredient_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Unit looked up (or created) by name. Empty is treated as no unit.
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeStepRequest {
    pub step_number: i32,
    pub instruction: String,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub temperature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeTagRequest {
    pub name: String,
}

/// Create/update payload. Update replaces everything, including the
/// ingredient, step and tag collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_filename: Option<String>,
    #[serde(default)]
    pub serves: Option<i32>,
    #[serde(default)]
    pub prep_time_minutes: Option<i32>,
    #[serde(default)]
    pub cook_time_minutes: Option<i32>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientRequest>,
    #[serde(default)]
    pub steps: Vec<RecipeStepRequest>,
    #[serde(default)]
    pub tags: Vec<RecipeTagRequest>,
}

/// Paging for the recipe list. Both absent means every recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ListOptions {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
