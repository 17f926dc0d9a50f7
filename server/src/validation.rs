//! Field-level checks on `RecipeRequest`.
//!
//! Cross-row rules (duplicate step numbers, the same ingredient twice) are
//! left to the database constraints and surface as conflicts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{RecipeIngredientRequest, RecipeRequest, RecipeStepRequest, RecipeTagRequest};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 255;
pub const PHOTO_FILENAME_MAX_CHARS: usize = 255;
pub const INGREDIENT_NAME_MAX_CHARS: usize = 255;
pub const UNIT_NAME_MAX_CHARS: usize = 100;
pub const TEMPERATURE_MAX_CHARS: usize = 50;
pub const TAG_NAME_MAX_CHARS: usize = 100;

/// Every failed field, keyed by its path in the request
/// (`title`, `ingredients[0].quantity`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_max_len(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if char_len(value) > max {
            errors.add(field, format!("must be at most {} characters", max));
        }
    }
}

fn check_non_negative(errors: &mut ValidationErrors, field: &str, value: Option<i32>) {
    if matches!(value, Some(v) if v < 0) {
        errors.add(field, "must be greater than or equal to 0");
    }
}

impl RecipeRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.add("title", "is required");
        } else {
            let len = char_len(&self.title);
            if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
                errors.add(
                    "title",
                    format!(
                        "must be between {} and {} characters",
                        TITLE_MIN_CHARS, TITLE_MAX_CHARS
                    ),
                );
            }
        }

        check_max_len(
            &mut errors,
            "photo_filename",
            self.photo_filename.as_deref(),
            PHOTO_FILENAME_MAX_CHARS,
        );

        if matches!(self.serves, Some(s) if s <= 0) {
            errors.add("serves", "must be greater than 0");
        }
        check_non_negative(&mut errors, "prep_time_minutes", self.prep_time_minutes);
        check_non_negative(&mut errors, "cook_time_minutes", self.cook_time_minutes);

        for (i, line) in self.ingredients.iter().enumerate() {
            validate_ingredient(&mut errors, i, line);
        }
        for (i, step) in self.steps.iter().enumerate() {
            validate_step(&mut errors, i, step);
        }
        for (i, tag) in self.tags.iter().enumerate() {
            validate_tag(&mut errors, i, tag);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_ingredient(errors: &mut ValidationErrors, index: usize, line: &RecipeIngredientRequest) {
    let prefix = format!("ingredients[{}]", index);

    if line.ingredient_name.trim().is_empty() {
        errors.add(format!("{}.ingredient_name", prefix), "is required");
    } else {
        check_max_len(
            errors,
            &format!("{}.ingredient_name", prefix),
            Some(&line.ingredient_name),
            INGREDIENT_NAME_MAX_CHARS,
        );
    }

    if let Some(quantity) = line.quantity {
        if quantity.is_nan() || quantity <= 0.0 {
            errors.add(format!("{}.quantity", prefix), "must be greater than 0");
        }
    }

    check_max_len(
        errors,
        &format!("{}.unit_name", prefix),
        line.unit_name.as_deref(),
        UNIT_NAME_MAX_CHARS,
    );

    if line.sort_order < 0 {
        errors.add(
            format!("{}.sort_order", prefix),
            "must be greater than or equal to 0",
        );
    }
}

fn validate_step(errors: &mut ValidationErrors, index: usize, step: &RecipeStepRequest) {
    let prefix = format!("steps[{}]", index);

    if step.step_number < 1 {
        errors.add(format!("{}.step_number", prefix), "must be at least 1");
    }
    if step.instruction.trim().is_empty() {
        errors.add(format!("{}.instruction", prefix), "is required");
    }
    check_non_negative(
        errors,
        &format!("{}.duration_minutes", prefix),
        step.duration_minutes,
    );
    check_max_len(
        errors,
        &format!("{}.temperature", prefix),
        step.temperature.as_deref(),
        TEMPERATURE_MAX_CHARS,
    );
}

fn validate_tag(errors: &mut ValidationErrors, index: usize, tag: &RecipeTagRequest) {
    let field = format!("tags[{}].name", index);

    if tag.name.trim().is_empty() {
        errors.add(field, "is required");
    } else {
        check_max_len(errors, &field, Some(&tag.name), TAG_NAME_MAX_CHARS);
    }
}
