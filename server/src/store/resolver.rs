//! Find-or-create for the shared reference tables (ingredients, units, tags).
//!
//! Names match exactly (case-sensitive). Rows created here are never deleted
//! by the store.

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use std::fmt;
use uuid::Uuid;

use super::error::StoreError;
use crate::models::{NewIngredient, NewMeasurementUnit, NewTag};
use crate::schema::{ingredients, measurement_units, tags};
use crate::types::MeasurementSystem;

/// System given to units first seen through a recipe request, which only
/// carries the unit's name.
pub const DEFAULT_UNIT_SYSTEM: MeasurementSystem = MeasurementSystem::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Ingredient,
    Unit,
    Tag,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Ingredient => "ingredient",
            ReferenceKind::Unit => "unit",
            ReferenceKind::Tag => "tag",
        })
    }
}

/// Look up `$name` in `$table`, inserting `$new_row` when it is missing.
///
/// A concurrent transaction can insert the same name between the lookup and
/// the insert. `ON CONFLICT DO NOTHING` waits for that transaction and then
/// yields no row, so the name is read again and the other row's id returned.
macro_rules! find_or_create {
    ($conn:expr, $table:ident, $name:expr, $new_row:expr) => {{
        let conn: &mut PgConnection = $conn;
        let existing: Option<Uuid> = $table::table
            .filter($table::name.eq($name))
            .select($table::id)
            .first(conn)
            .optional()?;

        match existing {
            Some(id) => Ok(id),
            None => {
                let inserted: Option<Uuid> = diesel::insert_into($table::table)
                    .values(&$new_row)
                    .on_conflict($table::name)
                    .do_nothing()
                    .returning($table::id)
                    .get_result(conn)
                    .optional()?;

                match inserted {
                    Some(id) => {
                        tracing::debug!(table = stringify!($table), %id, "created reference row");
                        Ok(id)
                    }
                    None => $table::table
                        .filter($table::name.eq($name))
                        .select($table::id)
                        .first(conn),
                }
            }
        }
    }};
}

fn find_or_create_ingredient(conn: &mut PgConnection, name: &str) -> Result<Uuid, DieselError> {
    find_or_create!(
        conn,
        ingredients,
        name,
        NewIngredient {
            id: Uuid::new_v4(),
            name,
        }
    )
}

fn find_or_create_unit(conn: &mut PgConnection, name: &str) -> Result<Uuid, DieselError> {
    find_or_create!(
        conn,
        measurement_units,
        name,
        NewMeasurementUnit {
            id: Uuid::new_v4(),
            name,
            system: DEFAULT_UNIT_SYSTEM.as_str(),
        }
    )
}

fn find_or_create_tag(conn: &mut PgConnection, name: &str) -> Result<Uuid, DieselError> {
    find_or_create!(
        conn,
        tags,
        name,
        NewTag {
            id: Uuid::new_v4(),
            name,
        }
    )
}

/// Resolve a reference name to its id, creating the row on first use.
///
/// Must run inside the caller's transaction: a failure here is meant to
/// abort the whole aggregate write.
pub fn resolve(
    conn: &mut PgConnection,
    kind: ReferenceKind,
    name: &str,
) -> Result<Uuid, StoreError> {
    let result = match kind {
        ReferenceKind::Ingredient => find_or_create_ingredient(conn, name),
        ReferenceKind::Unit => find_or_create_unit(conn, name),
        ReferenceKind::Tag => find_or_create_tag(conn, name),
    };

    result.map_err(|e| {
        let context = format!("failed to resolve {} '{}'", kind, name);
        match e {
            // Lost the insert race and the winner's row is still not visible.
            DieselError::NotFound => StoreError::Conflict { context, source: e },
            e => StoreError::database(context, e),
        }
    })
}
