use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::types::{RecipeIngredientRequest, RecipeRequest, RecipeStepRequest};

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub photo_filename: Option<String>,
    pub serves: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub total_time_minutes: Option<i32>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar recipe columns as written on create. `total_time_minutes` is a
/// generated column and deliberately absent.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub photo_filename: Option<&'a str>,
    pub serves: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub created_by: Option<Uuid>,
}

impl<'a> NewRecipe<'a> {
    pub fn from_request(id: Uuid, request: &'a RecipeRequest) -> Self {
        Self {
            id,
            title: &request.title,
            description: request.description.as_deref(),
            photo_filename: request.photo_filename.as_deref(),
            serves: request.serves,
            prep_time_minutes: request.prep_time_minutes,
            cook_time_minutes: request.cook_time_minutes,
            created_by: request.created_by,
        }
    }
}

/// Full replacement of the scalar columns; an absent field clears the column.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(treat_none_as_null = true)]
pub struct RecipeChanges<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub photo_filename: Option<&'a str>,
    pub serves: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub created_by: Option<Uuid>,
}

impl<'a> From<&'a RecipeRequest> for RecipeChanges<'a> {
    fn from(request: &'a RecipeRequest) -> Self {
        Self {
            title: &request.title,
            description: request.description.as_deref(),
            photo_filename: request.photo_filename.as_deref(),
            serves: request.serves,
            prep_time_minutes: request.prep_time_minutes,
            cook_time_minutes: request.cook_time_minutes,
            created_by: request.created_by,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ingredients)]
pub struct NewIngredient<'a> {
    pub id: Uuid,
    pub name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::measurement_units)]
pub struct NewMeasurementUnit<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub system: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::tags)]
pub struct NewTag<'a> {
    pub id: Uuid,
    pub name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_ingredients)]
pub struct NewRecipeIngredient<'a> {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Option<f64>,
    pub unit_id: Option<Uuid>,
    pub notes: Option<&'a str>,
    pub sort_order: i32,
}

impl<'a> NewRecipeIngredient<'a> {
    pub fn new(
        recipe_id: Uuid,
        ingredient_id: Uuid,
        unit_id: Option<Uuid>,
        line: &'a RecipeIngredientRequest,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipe_id,
            ingredient_id,
            quantity: line.quantity,
            unit_id,
            notes: line.notes.as_deref(),
            sort_order: line.sort_order,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_steps)]
pub struct NewRecipeStep<'a> {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub instruction: &'a str,
    pub duration_minutes: Option<i32>,
    pub temperature: Option<&'a str>,
}

impl<'a> NewRecipeStep<'a> {
    pub fn new(recipe_id: Uuid, step: &'a RecipeStepRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipe_id,
            step_number: step.step_number,
            instruction: &step.instruction,
            duration_minutes: step.duration_minutes,
            temperature: step.temperature.as_deref(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_tags)]
pub struct NewRecipeTag {
    pub recipe_id: Uuid,
    pub tag_id: Uuid,
}

/// One ingredient junction row joined with its ingredient and (optional) unit.
/// Field order matches the select tuple in the assembler.
#[derive(Queryable, Debug)]
pub struct IngredientLineRow {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub ingredient_category: Option<String>,
    pub quantity: Option<f64>,
    pub notes: Option<String>,
    pub sort_order: i32,
    pub unit_id: Option<Uuid>,
    pub unit_name: Option<String>,
    pub unit_abbreviation: Option<String>,
    pub unit_system: Option<String>,
    pub unit_base_unit_id: Option<Uuid>,
    pub unit_conversion_factor: Option<f64>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recipe_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepRow {
    pub id: Uuid,
    pub step_number: i32,
    pub instruction: String,
    pub duration_minutes: Option<i32>,
    pub temperature: Option<String>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}
