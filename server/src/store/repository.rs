//! Synchronous aggregate operations over one checked-out connection.
//!
//! Every write runs in a single transaction. Any error, including a tripped
//! `Cancellation`, rolls back all of it.

use diesel::dsl::now;
use diesel::prelude::*;
use uuid::Uuid;

use super::assembler::assemble;
use super::cancel::Cancellation;
use super::error::{DbResultExt, StoreError};
use super::resolver::{resolve, ReferenceKind};
use crate::models::{
    NewRecipe, NewRecipeIngredient, NewRecipeStep, NewRecipeTag, RecipeChanges, RecipeRow,
};
use crate::raw_sql;
use crate::schema::{recipe_ingredients, recipe_steps, recipe_tags, recipes};
use crate::types::{ListOptions, Recipe, RecipeRequest};

/// First statement of every write transaction.
fn begin_operation(conn: &mut PgConnection, cancel: &Cancellation) -> Result<(), StoreError> {
    cancel.check()?;
    if let Some(remaining) = cancel.remaining() {
        raw_sql::set_local_statement_timeout(remaining.as_millis())
            .execute(conn)
            .db_context(|| "failed to set statement timeout")?;
    }
    Ok(())
}

/// Insert the ingredient lines, steps and tag links of `request` for `recipe_id`,
/// in request order.
fn write_collections(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    request: &RecipeRequest,
    cancel: &Cancellation,
) -> Result<(), StoreError> {
    for line in &request.ingredients {
        cancel.check()?;
        let ingredient_id = resolve(conn, ReferenceKind::Ingredient, &line.ingredient_name)?;
        let unit_id = match line.unit_name.as_deref() {
            Some(unit_name) if !unit_name.is_empty() => {
                Some(resolve(conn, ReferenceKind::Unit, unit_name)?)
            }
            _ => None,
        };

        diesel::insert_into(recipe_ingredients::table)
            .values(&NewRecipeIngredient::new(recipe_id, ingredient_id, unit_id, line))
            .execute(conn)
            .db_context(|| {
                format!(
                    "failed to insert ingredient '{}' for recipe {}",
                    line.ingredient_name, recipe_id
                )
            })?;
    }

    for step in &request.steps {
        cancel.check()?;
        diesel::insert_into(recipe_steps::table)
            .values(&NewRecipeStep::new(recipe_id, step))
            .execute(conn)
            .db_context(|| {
                format!(
                    "failed to insert step {} for recipe {}",
                    step.step_number, recipe_id
                )
            })?;
    }

    for tag in &request.tags {
        cancel.check()?;
        let tag_id = resolve(conn, ReferenceKind::Tag, &tag.name)?;
        diesel::insert_into(recipe_tags::table)
            .values(&NewRecipeTag { recipe_id, tag_id })
            .execute(conn)
            .db_context(|| format!("failed to link tag '{}' to recipe {}", tag.name, recipe_id))?;
    }

    Ok(())
}

/// Assemble `id` from one snapshot so a concurrent update is never seen half-applied.
pub fn read_recipe(conn: &mut PgConnection, id: Uuid) -> Result<Recipe, StoreError> {
    conn.build_transaction()
        .read_only()
        .repeatable_read()
        .run(|conn| assemble(conn, id))
}

pub fn create_recipe(
    conn: &mut PgConnection,
    request: &RecipeRequest,
    cancel: &Cancellation,
) -> Result<Recipe, StoreError> {
    request.validate()?;
    let recipe_id = Uuid::new_v4();

    conn.transaction::<_, StoreError, _>(|conn| {
        begin_operation(conn, cancel)?;

        diesel::insert_into(recipes::table)
            .values(&NewRecipe::from_request(recipe_id, request))
            .execute(conn)
            .db_context(|| format!("failed to insert recipe '{}'", request.title))?;

        write_collections(conn, recipe_id, request, cancel)?;

        // Last chance to abandon the write before it becomes visible.
        cancel.check()
    })?;

    tracing::info!(%recipe_id, title = %request.title, "created recipe");
    read_recipe(conn, recipe_id)
}

pub fn update_recipe(
    conn: &mut PgConnection,
    id: Uuid,
    request: &RecipeRequest,
    cancel: &Cancellation,
) -> Result<Recipe, StoreError> {
    request.validate()?;

    conn.transaction::<_, StoreError, _>(|conn| {
        begin_operation(conn, cancel)?;

        let updated = diesel::update(recipes::table.find(id))
            .set((RecipeChanges::from(request), recipes::updated_at.eq(now)))
            .execute(conn)
            .db_context(|| format!("failed to update recipe {}", id))?;
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }

        // Collections are replaced wholesale, never merged.
        cancel.check()?;
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(id)))
            .execute(conn)
            .db_context(|| format!("failed to clear ingredients of recipe {}", id))?;
        diesel::delete(recipe_steps::table.filter(recipe_steps::recipe_id.eq(id)))
            .execute(conn)
            .db_context(|| format!("failed to clear steps of recipe {}", id))?;
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(id)))
            .execute(conn)
            .db_context(|| format!("failed to clear tags of recipe {}", id))?;

        write_collections(conn, id, request, cancel)?;

        cancel.check()
    })?;

    tracing::info!(recipe_id = %id, "updated recipe");
    read_recipe(conn, id)
}

/// Delete the recipe row. Ingredient lines, steps and tag links go with it
/// via `ON DELETE CASCADE`; shared reference rows stay.
pub fn delete_recipe(
    conn: &mut PgConnection,
    id: Uuid,
    cancel: &Cancellation,
) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        begin_operation(conn, cancel)?;

        let deleted = diesel::delete(recipes::table.find(id))
            .execute(conn)
            .db_context(|| format!("failed to delete recipe {}", id))?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    })?;

    tracing::info!(recipe_id = %id, "deleted recipe");
    Ok(())
}

/// Scalar fields only, most recently updated first.
pub fn list_recipes(
    conn: &mut PgConnection,
    options: ListOptions,
    cancel: &Cancellation,
) -> Result<Vec<Recipe>, StoreError> {
    cancel.check()?;

    let mut query = recipes::table
        .select(RecipeRow::as_select())
        .order((recipes::updated_at.desc(), recipes::id.asc()))
        .into_boxed();
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = options.offset {
        query = query.offset(offset);
    }

    let rows: Vec<RecipeRow> = query
        .load(conn)
        .db_context(|| "failed to list recipes")?;

    Ok(rows.into_iter().map(Recipe::from).collect())
}
