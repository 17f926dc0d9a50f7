//! Rebuilds a `Recipe` aggregate from its normalized rows.

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use uuid::Uuid;

use super::error::{DbResultExt, StoreError};
use crate::models::{IngredientLineRow, RecipeRow, StepRow, TagRow};
use crate::schema::{
    ingredients, measurement_units, recipe_ingredients, recipe_steps, recipe_tags, recipes, tags,
};
use crate::types::{
    MeasurementSystem, MeasurementUnit, Recipe, RecipeIngredient, RecipeStep, Tag,
};

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            title: row.title,
            description: row.description,
            photo_filename: row.photo_filename,
            serves: row.serves,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            total_time_minutes: row.total_time_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            ingredients: Vec::new(),
            steps: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl From<StepRow> for RecipeStep {
    fn from(row: StepRow) -> Self {
        RecipeStep {
            id: row.id,
            step_number: row.step_number,
            instruction: row.instruction,
            duration_minutes: row.duration_minutes,
            temperature: row.temperature,
        }
    }
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
        }
    }
}

fn ingredient_from_row(row: IngredientLineRow) -> Result<RecipeIngredient, StoreError> {
    // Every unit column is NULL when the line has no unit.
    let unit = match (row.unit_id, row.unit_name, row.unit_system) {
        (Some(id), Some(name), Some(system)) => {
            let system: MeasurementSystem = system.parse().map_err(|e| {
                StoreError::database(
                    format!("unit {} has an invalid measurement system", id),
                    DieselError::DeserializationError(Box::new(e)),
                )
            })?;
            Some(MeasurementUnit {
                id,
                name,
                abbreviation: row.unit_abbreviation,
                system,
                base_unit_id: row.unit_base_unit_id,
                conversion_factor: row.unit_conversion_factor,
            })
        }
        _ => None,
    };

    Ok(RecipeIngredient {
        id: row.id,
        ingredient_id: row.ingredient_id,
        ingredient_name: row.ingredient_name,
        ingredient_category: row.ingredient_category,
        quantity: row.quantity,
        unit_id: unit.as_ref().map(|u| u.id),
        notes: row.notes,
        sort_order: row.sort_order,
        unit,
    })
}

fn load_ingredients(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Vec<RecipeIngredient>, StoreError> {
    let rows: Vec<IngredientLineRow> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .left_join(measurement_units::table)
        .filter(recipe_ingredients::recipe_id.eq(id))
        .order((recipe_ingredients::sort_order.asc(), ingredients::name.asc()))
        .select((
            recipe_ingredients::id,
            recipe_ingredients::ingredient_id,
            ingredients::name,
            ingredients::category,
            recipe_ingredients::quantity,
            recipe_ingredients::notes,
            recipe_ingredients::sort_order,
            measurement_units::id.nullable(),
            measurement_units::name.nullable(),
            measurement_units::abbreviation.nullable(),
            measurement_units::system.nullable(),
            measurement_units::base_unit_id.nullable(),
            measurement_units::conversion_factor.nullable(),
        ))
        .load(conn)
        .db_context(|| format!("failed to load ingredients for recipe {}", id))?;

    rows.into_iter().map(ingredient_from_row).collect()
}

fn load_steps(conn: &mut PgConnection, id: Uuid) -> Result<Vec<RecipeStep>, StoreError> {
    let rows: Vec<StepRow> = recipe_steps::table
        .filter(recipe_steps::recipe_id.eq(id))
        .order(recipe_steps::step_number.asc())
        .select(StepRow::as_select())
        .load(conn)
        .db_context(|| format!("failed to load steps for recipe {}", id))?;

    Ok(rows.into_iter().map(RecipeStep::from).collect())
}

fn load_tags(conn: &mut PgConnection, id: Uuid) -> Result<Vec<Tag>, StoreError> {
    let rows: Vec<TagRow> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq(id))
        .order(tags::name.asc())
        .select(TagRow::as_select())
        .load(conn)
        .db_context(|| format!("failed to load tags for recipe {}", id))?;

    Ok(rows.into_iter().map(Tag::from).collect())
}

/// Read the recipe and all of its collections.
///
/// Read-only. Callers that need a consistent view across the four queries
/// run this inside a repeatable-read transaction.
pub fn assemble(conn: &mut PgConnection, id: Uuid) -> Result<Recipe, StoreError> {
    let row: RecipeRow = recipes::table
        .find(id)
        .select(RecipeRow::as_select())
        .first(conn)
        .optional()
        .db_context(|| format!("failed to load recipe {}", id))?
        .ok_or(StoreError::NotFound(id))?;

    let mut recipe = Recipe::from(row);
    recipe.ingredients = load_ingredients(conn, id)?;
    recipe.steps = load_steps(conn, id)?;
    recipe.tags = load_tags(conn, id)?;
    Ok(recipe)
}
