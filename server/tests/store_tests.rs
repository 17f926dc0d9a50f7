//! Store behavior against a real PostgreSQL.
//!
//! Set `TEST_DATABASE_URL` (environment or `.env`) to run these; without it
//! every test returns early. Names carry a per-test suffix so the shared
//! reference tables never collide between tests.

use diesel::prelude::*;
use recipes_server::config::Config;
use recipes_server::db::{self, DbPool};
use recipes_server::schema::{
    ingredients, measurement_units, recipe_ingredients, recipe_steps, recipe_tags, recipes, tags,
};
use recipes_server::store::{
    repository, resolver, Cancellation, DbRecipeStore, ErrorKind, RecipeStore, ReferenceKind,
};
use recipes_server::types::{
    ListOptions, MeasurementSystem, RecipeIngredientRequest, RecipeRequest, RecipeStepRequest,
    RecipeTagRequest,
};
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

fn pool() -> Option<DbPool> {
    static POOL: OnceLock<Option<DbPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        dotenvy::dotenv().ok();
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database tests");
            return None;
        };
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.clone()),
            "DB_POOL_SIZE" => Some("16".to_string()),
            _ => None,
        })
        .expect("test config");
        Some(db::create_pool(&config).expect("test database pool"))
    })
    .clone()
}

fn store() -> Option<DbRecipeStore> {
    pool().map(DbRecipeStore::new)
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn line(name: &str, quantity: f64, unit: Option<&str>, sort_order: i32) -> RecipeIngredientRequest {
    RecipeIngredientRequest {
        ingredient_name: name.to_string(),
        quantity: Some(quantity),
        unit_name: unit.map(str::to_string),
        notes: None,
        sort_order,
    }
}

fn step(number: i32, instruction: &str) -> RecipeStepRequest {
    RecipeStepRequest {
        step_number: number,
        instruction: instruction.to_string(),
        ..Default::default()
    }
}

fn tag(name: &str) -> RecipeTagRequest {
    RecipeTagRequest {
        name: name.to_string(),
    }
}

fn tart(sfx: &str) -> RecipeRequest {
    RecipeRequest {
        title: format!("Tart {sfx}"),
        prep_time_minutes: Some(15),
        cook_time_minutes: Some(25),
        ingredients: vec![line(&format!("feta {sfx}"), 200.0, Some(&format!("gram {sfx}")), 0)],
        steps: vec![step(1, "Preheat oven")],
        tags: vec![tag(&format!("vegetarian {sfx}"))],
        ..Default::default()
    }
}

fn ingredient_count(pool: &DbPool, name: &str) -> i64 {
    let mut conn = pool.get().unwrap();
    ingredients::table
        .filter(ingredients::name.eq(name))
        .count()
        .get_result(&mut conn)
        .unwrap()
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let created = store
        .create_recipe(tart(&sfx), Cancellation::new())
        .await
        .unwrap();
    assert_eq!(created.total_time_minutes, Some(40));
    assert_eq!(created.ingredients.len(), 1);
    let unit = created.ingredients[0].unit.as_ref().expect("unit snapshot");
    assert_eq!(unit.name, format!("gram {sfx}"));
    assert_eq!(unit.system, MeasurementSystem::Metric);
    assert_eq!(created.ingredients[0].unit_id, Some(unit.id));
    assert_eq!(created.steps[0].instruction, "Preheat oven");
    assert_eq!(created.tags[0].name, format!("vegetarian {sfx}"));

    let fetched = store.get_recipe(created.id, Cancellation::new()).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_reference_rows_are_shared_between_recipes() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let first = store.create_recipe(tart(&sfx), Cancellation::new()).await.unwrap();
    let mut second_request = tart(&sfx);
    second_request.title = format!("Second tart {sfx}");
    let second = store
        .create_recipe(second_request, Cancellation::new())
        .await
        .unwrap();

    assert_eq!(
        first.ingredients[0].ingredient_id,
        second.ingredients[0].ingredient_id
    );
    assert_eq!(first.ingredients[0].unit_id, second.ingredients[0].unit_id);
    assert_eq!(first.tags[0].id, second.tags[0].id);
    assert_eq!(ingredient_count(&pool().unwrap(), &format!("feta {sfx}")), 1);
}

#[test]
fn test_concurrent_resolution_yields_one_row() {
    let Some(pool) = pool() else { return };
    let name = format!("saffron {}", suffix());

    let ids: Vec<Uuid> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                let name = name.clone();
                scope.spawn(move || {
                    let mut conn = pool.get().unwrap();
                    resolver::resolve(&mut conn, ReferenceKind::Ingredient, &name).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(ingredient_count(&pool, &name), 1);
}

#[test]
fn test_resolved_unit_defaults_to_metric() {
    let Some(pool) = pool() else { return };
    let name = format!("cup {}", suffix());
    let mut conn = pool.get().unwrap();

    let id = resolver::resolve(&mut conn, ReferenceKind::Unit, &name).unwrap();
    let system: String = measurement_units::table
        .find(id)
        .select(measurement_units::system)
        .first(&mut conn)
        .unwrap();
    assert_eq!(system, "metric");
}

#[tokio::test]
async fn test_total_time_is_derived() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let only_prep = RecipeRequest {
        title: format!("Salad {sfx}"),
        prep_time_minutes: Some(10),
        ..Default::default()
    };
    let created = store.create_recipe(only_prep, Cancellation::new()).await.unwrap();
    assert_eq!(created.total_time_minutes, Some(10));

    let neither = RecipeRequest {
        title: format!("Water {sfx}"),
        ..Default::default()
    };
    let updated = store
        .update_recipe(created.id, neither, Cancellation::new())
        .await
        .unwrap();
    assert_eq!(updated.total_time_minutes, None);
    assert_eq!(updated.prep_time_minutes, None);
}

#[tokio::test]
async fn test_update_replaces_collections() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let mut request = tart(&sfx);
    request.ingredients = vec![
        line(&format!("flour {sfx}"), 250.0, Some(&format!("gram {sfx}")), 0),
        line(&format!("butter {sfx}"), 125.0, Some(&format!("gram {sfx}")), 1),
        line(&format!("salt {sfx}"), 1.0, None, 2),
    ];
    request.steps = vec![step(1, "Mix"), step(2, "Rest"), step(3, "Bake")];
    let created = store.create_recipe(request, Cancellation::new()).await.unwrap();
    assert_eq!(created.ingredients.len(), 3);
    assert!(created.ingredients[2].unit.is_none());

    let mut replacement = tart(&sfx);
    replacement.title = format!("Simpler tart {sfx}");
    replacement.ingredients = vec![line(&format!("flour {sfx}"), 300.0, None, 0)];
    replacement.steps = vec![step(1, "Bake")];
    replacement.tags = vec![];

    let updated = store
        .update_recipe(created.id, replacement, Cancellation::new())
        .await
        .unwrap();
    assert_eq!(updated.title, format!("Simpler tart {sfx}"));
    assert_eq!(updated.ingredients.len(), 1);
    assert_eq!(updated.ingredients[0].quantity, Some(300.0));
    assert_eq!(updated.steps.len(), 1);
    assert!(updated.tags.is_empty());
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let mut conn = pool().unwrap().get().unwrap();
    let lines: i64 = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(created.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(lines, 1);
}

#[tokio::test]
async fn test_failed_create_leaves_nothing_behind() {
    let Some(store) = store() else { return };
    let sfx = suffix();
    let new_ingredient = format!("sumac {sfx}");

    let mut request = tart(&sfx);
    request.ingredients.push(line(&new_ingredient, 1.0, None, 1));
    request.steps = vec![step(1, "Mix"), step(1, "Mix again")];

    let err = store
        .create_recipe(request.clone(), Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let pool = pool().unwrap();
    let mut conn = pool.get().unwrap();
    let recipes_with_title: i64 = recipes::table
        .filter(recipes::title.eq(&request.title))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(recipes_with_title, 0);
    assert_eq!(ingredient_count(&pool, &new_ingredient), 0);
}

#[tokio::test]
async fn test_duplicate_tag_in_one_request_is_a_conflict() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let mut request = tart(&sfx);
    request.tags = vec![tag(&format!("quick {sfx}")), tag(&format!("quick {sfx}"))];
    let err = store
        .create_recipe(request, Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_delete_cascades_but_keeps_reference_rows() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let created = store.create_recipe(tart(&sfx), Cancellation::new()).await.unwrap();
    let mut sharing_request = tart(&sfx);
    sharing_request.title = format!("Feta salad {sfx}");
    sharing_request.steps = vec![step(1, "Crumble")];
    let sharing = store
        .create_recipe(sharing_request, Cancellation::new())
        .await
        .unwrap();

    store.delete_recipe(created.id, Cancellation::new()).await.unwrap();

    let err = store
        .get_recipe(created.id, Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let pool = pool().unwrap();
    let mut conn = pool.get().unwrap();
    let lines: i64 = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(created.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(lines, 0);
    let steps: i64 = recipe_steps::table
        .filter(recipe_steps::recipe_id.eq(created.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(steps, 0);
    let tag_links: i64 = recipe_tags::table
        .filter(recipe_tags::recipe_id.eq(created.id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(tag_links, 0);

    assert_eq!(ingredient_count(&pool, &format!("feta {sfx}")), 1);
    let tag_rows: i64 = tags::table
        .filter(tags::name.eq(format!("vegetarian {sfx}")))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(tag_rows, 1);

    // The other recipe still reads its shared ingredient, unit and tag.
    let survivor = store
        .get_recipe(sharing.id, Cancellation::new())
        .await
        .unwrap();
    assert_eq!(survivor.ingredients.len(), 1);
    assert_eq!(survivor.ingredients[0].ingredient_name, format!("feta {sfx}"));
    assert_eq!(
        survivor.ingredients[0].ingredient_id,
        created.ingredients[0].ingredient_id
    );
    assert_eq!(
        survivor.ingredients[0].unit.as_ref().map(|u| u.name.clone()),
        Some(format!("gram {sfx}"))
    );
    assert_eq!(survivor.tags[0].id, created.tags[0].id);
}

#[tokio::test]
async fn test_collections_come_back_ordered() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let mut request = tart(&sfx);
    request.ingredients = vec![
        line(&format!("c-pepper {sfx}"), 1.0, None, 2),
        line(&format!("a-eggs {sfx}"), 3.0, None, 0),
        line(&format!("b-milk {sfx}"), 100.0, Some(&format!("ml {sfx}")), 1),
    ];
    request.steps = vec![step(3, "Bake"), step(1, "Whisk"), step(2, "Pour")];
    request.tags = vec![tag(&format!("z-brunch {sfx}")), tag(&format!("m-eggs {sfx}"))];

    let created = store.create_recipe(request, Cancellation::new()).await.unwrap();
    let fetched = store.get_recipe(created.id, Cancellation::new()).await.unwrap();

    for recipe in [&created, &fetched] {
        let lines: Vec<(String, i32)> = recipe
            .ingredients
            .iter()
            .map(|i| (i.ingredient_name.clone(), i.sort_order))
            .collect();
        assert_eq!(
            lines,
            vec![
                (format!("a-eggs {sfx}"), 0),
                (format!("b-milk {sfx}"), 1),
                (format!("c-pepper {sfx}"), 2),
            ]
        );

        let steps: Vec<(i32, &str)> = recipe
            .steps
            .iter()
            .map(|s| (s.step_number, s.instruction.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Whisk"), (2, "Pour"), (3, "Bake")]);

        let tag_names: Vec<&str> = recipe.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            tag_names,
            vec![format!("m-eggs {sfx}"), format!("z-brunch {sfx}")]
        );
    }
}

#[tokio::test]
async fn test_failed_update_keeps_previous_state() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let mut request = tart(&sfx);
    request.title = format!("Keep {sfx}");
    request.prep_time_minutes = Some(5);
    request.cook_time_minutes = None;
    request.steps = vec![step(1, "Mix"), step(2, "Chill")];
    let before = store.create_recipe(request, Cancellation::new()).await.unwrap();

    let new_ingredient = format!("za'atar {sfx}");
    let mut broken = tart(&sfx);
    broken.title = format!("Changed {sfx}");
    broken.prep_time_minutes = Some(50);
    broken.ingredients = vec![line(&new_ingredient, 1.0, None, 0)];
    broken.steps = vec![step(1, "Mix"), step(1, "Mix again")];
    broken.tags = vec![];

    let err = store
        .update_recipe(before.id, broken, Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let after = store.get_recipe(before.id, Cancellation::new()).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.title, format!("Keep {sfx}"));
    assert_eq!(after.prep_time_minutes, Some(5));
    assert_eq!(after.steps.len(), 2);
    assert_eq!(after.ingredients[0].ingredient_name, format!("feta {sfx}"));
    assert_eq!(after.tags.len(), 1);
    assert_eq!(ingredient_count(&pool().unwrap(), &new_ingredient), 0);
}

#[test]
fn test_very_long_deadline_still_writes() {
    let Some(pool) = pool() else { return };
    let cancel = Cancellation::with_timeout(Duration::from_secs(3_000_000));

    let mut conn = pool.get().unwrap();
    let created = repository::create_recipe(&mut conn, &tart(&suffix()), &cancel).unwrap();
    assert_eq!(created.total_time_minutes, Some(40));

    repository::delete_recipe(&mut conn, created.id, &cancel).unwrap();
}

#[tokio::test]
async fn test_missing_recipe_is_not_found() {
    let Some(store) = store() else { return };
    let missing = Uuid::new_v4();

    let err = store
        .update_recipe(missing, tart(&suffix()), Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .delete_recipe(missing, Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_writing() {
    let Some(store) = store() else { return };
    let mut request = tart(&suffix());
    request.serves = Some(0);

    let err = store
        .create_recipe(request, Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_cancelled_create_writes_nothing() {
    let Some(pool) = pool() else { return };
    let sfx = suffix();
    let request = tart(&sfx);
    let cancel = Cancellation::new();
    cancel.cancel();

    let mut conn = pool.get().unwrap();
    let err = repository::create_recipe(&mut conn, &request, &cancel).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(ingredient_count(&pool, &format!("feta {sfx}")), 0);
}

#[tokio::test]
async fn test_list_orders_by_most_recent_update() {
    let Some(store) = store() else { return };
    let sfx = suffix();

    let older = store.create_recipe(tart(&sfx), Cancellation::new()).await.unwrap();
    let mut newer_request = tart(&sfx);
    newer_request.title = format!("Newer {sfx}");
    let newer = store
        .create_recipe(newer_request, Cancellation::new())
        .await
        .unwrap();

    let all = store
        .list_recipes(ListOptions::default(), Cancellation::new())
        .await
        .unwrap();
    let older_pos = all.iter().position(|r| r.id == older.id).unwrap();
    let newer_pos = all.iter().position(|r| r.id == newer.id).unwrap();
    assert!(newer_pos < older_pos);
    assert!(all.iter().all(|r| r.ingredients.is_empty() && r.tags.is_empty()));

    let page = store
        .list_recipes(
            ListOptions {
                limit: Some(1),
                offset: None,
            },
            Cancellation::new(),
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}
