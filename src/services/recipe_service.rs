use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::recipes::{CreateRecipeRequest, IngredientAmountInput, RecipeList, UpdateRecipeRequest},
    entity::{
        Favorites, Ingredients, RecipeIngredients, RecipeTags, Recipes, ShoppingCarts, Tags, Users,
        favorites::Column as FavCol,
        ingredients::Column as IngCol,
        recipe_ingredients::{ActiveModel as RecipeIngredientActive, Column as RecipeIngCol},
        recipe_tags::{ActiveModel as RecipeTagActive, Column as RecipeTagCol},
        recipes::{ActiveModel as RecipeActive, Column as RecipeCol, Model as RecipeModel},
        shopping_carts::Column as CartCol,
        tags::Column as TagCol,
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    ledger,
    media::{DecodedImage, MediaStore, check_extension, parse_data_uri},
    middleware::auth::{AuthUser, ensure_owner},
    models::{Recipe, RecipeIngredient, RecipeShort, Tag},
    response::{ApiResponse, Meta},
    routes::params::RecipeQuery,
    services::user_service,
    state::AppState,
};

pub fn short_card(media: &MediaStore, model: RecipeModel) -> RecipeShort {
    RecipeShort {
        id: model.id,
        name: model.name,
        image: media.url_for(&model.image),
        cooking_time: model.cooking_time,
    }
}

pub async fn find_recipe<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<RecipeModel> {
    Recipes::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Shape checks on the ingredient and tag sets of a recipe write.
pub fn check_composition(ingredients: &[IngredientAmountInput], tags: &[Uuid]) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::invalid(
            "ingredients",
            "At least one ingredient is required",
        ));
    }
    if has_duplicates(ingredients.iter().map(|i| i.id)) {
        return Err(AppError::invalid("ingredients", "Ingredients repeat"));
    }
    if ingredients.iter().any(|i| i.amount < 1) {
        return Err(AppError::invalid(
            "ingredients",
            "Ingredient amount must be at least 1",
        ));
    }
    if tags.is_empty() {
        return Err(AppError::invalid("tags", "At least one tag is required"));
    }
    if has_duplicates(tags.iter().copied()) {
        return Err(AppError::invalid("tags", "Tags repeat"));
    }
    Ok(())
}

fn has_duplicates(ids: impl IntoIterator<Item = Uuid>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

/// Every referenced ingredient and tag must exist.
async fn check_references<C: ConnectionTrait>(
    db: &C,
    ingredients: &[IngredientAmountInput],
    tags: &[Uuid],
) -> AppResult<()> {
    let ingredient_ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
    let found = Ingredients::find()
        .filter(IngCol::Id.is_in(ingredient_ids.clone()))
        .count(db)
        .await?;
    if found as usize != ingredient_ids.len() {
        return Err(AppError::invalid("ingredients", "Unknown ingredient"));
    }

    let found = Tags::find()
        .filter(TagCol::Id.is_in(tags.to_vec()))
        .count(db)
        .await?;
    if found as usize != tags.len() {
        return Err(AppError::invalid("tags", "Unknown tag"));
    }
    Ok(())
}

async fn insert_composition<C: ConnectionTrait>(
    db: &C,
    recipe_id: Uuid,
    ingredients: &[IngredientAmountInput],
    tags: &[Uuid],
) -> AppResult<()> {
    RecipeIngredients::insert_many(ingredients.iter().map(|item| RecipeIngredientActive {
        id: Set(Uuid::new_v4()),
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
    }))
    .exec_without_returning(db)
    .await?;

    RecipeTags::insert_many(tags.iter().map(|tag_id| RecipeTagActive {
        id: Set(Uuid::new_v4()),
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

#[derive(Debug, FromQueryResult)]
struct TagRow {
    recipe_id: Uuid,
    tag_id: Uuid,
    name: String,
    color: String,
    slug: String,
}

#[derive(Debug, FromQueryResult)]
struct IngredientRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    name: String,
    measurement_unit: String,
    amount: i32,
}

/// Full representations for `models`, in input order. Viewer flags are
/// looked up in batch; anonymous viewers get `false` everywhere.
pub async fn hydrate<C: ConnectionTrait>(
    db: &C,
    media: &MediaStore,
    viewer: Option<Uuid>,
    models: Vec<RecipeModel>,
) -> AppResult<Vec<Recipe>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    let tag_rows = RecipeTags::find()
        .select_only()
        .column(RecipeTagCol::RecipeId)
        .column_as(TagCol::Id, "tag_id")
        .column(TagCol::Name)
        .column(TagCol::Color)
        .column(TagCol::Slug)
        .inner_join(Tags)
        .filter(RecipeTagCol::RecipeId.is_in(ids.clone()))
        .order_by_asc(TagCol::Name)
        .into_model::<TagRow>()
        .all(db)
        .await?;
    for row in tag_rows {
        tags.entry(row.recipe_id).or_default().push(Tag {
            id: row.tag_id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        });
    }

    let mut ingredients: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
    let ingredient_rows = RecipeIngredients::find()
        .select_only()
        .column(RecipeIngCol::RecipeId)
        .column(RecipeIngCol::IngredientId)
        .column(IngCol::Name)
        .column(IngCol::MeasurementUnit)
        .column(RecipeIngCol::Amount)
        .inner_join(Ingredients)
        .filter(RecipeIngCol::RecipeId.is_in(ids.clone()))
        .order_by_asc(IngCol::Name)
        .into_model::<IngredientRow>()
        .all(db)
        .await?;
    for row in ingredient_rows {
        ingredients
            .entry(row.recipe_id)
            .or_default()
            .push(RecipeIngredient {
                id: row.ingredient_id,
                name: row.name,
                measurement_unit: row.measurement_unit,
                amount: row.amount,
            });
    }

    let author_ids: Vec<Uuid> = models
        .iter()
        .map(|m| m.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let authors = Users::find()
        .filter(UserCol::Id.is_in(author_ids))
        .all(db)
        .await?;
    let authors: HashMap<Uuid, _> = user_service::profiles(db, viewer, authors)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (favorited, in_cart) = match viewer {
        Some(viewer) => (
            ledger::targets_among::<Favorites, _>(db, viewer, ids.clone()).await?,
            ledger::targets_among::<ShoppingCarts, _>(db, viewer, ids).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    models
        .into_iter()
        .map(|model| -> AppResult<Recipe> {
            let author = authors.get(&model.author_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("author of recipe {} is missing", model.id))
            })?;
            Ok(Recipe {
                id: model.id,
                tags: tags.remove(&model.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&model.id).unwrap_or_default(),
                is_favorited: favorited.contains(&model.id),
                is_in_shopping_cart: in_cart.contains(&model.id),
                image: media.url_for(&model.image),
                name: model.name,
                text: model.text,
                cooking_time: model.cooking_time,
                created_at: model.created_at.with_timezone(&Utc),
            })
        })
        .collect()
}

async fn hydrate_one(
    state: &AppState,
    viewer: Option<Uuid>,
    model: RecipeModel,
) -> AppResult<Recipe> {
    hydrate(&state.orm, &state.media, viewer, vec![model])
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

pub async fn list_recipes(
    state: &AppState,
    viewer: Option<AuthUser>,
    query: RecipeQuery,
) -> AppResult<ApiResponse<RecipeList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(author) = query.author {
        condition = condition.add(RecipeCol::AuthorId.eq(author));
    }

    if !query.tags.is_empty() {
        let tagged = RecipeTags::find()
            .select_only()
            .column(RecipeTagCol::RecipeId)
            .inner_join(Tags)
            .filter(TagCol::Slug.is_in(query.tags.clone()))
            .into_query();
        condition = condition.add(RecipeCol::Id.in_subquery(tagged));
    }

    // Relation filters only make sense for a known viewer.
    if let Some(viewer) = viewer {
        if query.is_favorited {
            let favorited = Favorites::find()
                .select_only()
                .column(FavCol::RecipeId)
                .filter(FavCol::UserId.eq(viewer.user_id))
                .into_query();
            condition = condition.add(RecipeCol::Id.in_subquery(favorited));
        }
        if query.is_in_shopping_cart {
            let in_cart = ShoppingCarts::find()
                .select_only()
                .column(CartCol::RecipeId)
                .filter(CartCol::UserId.eq(viewer.user_id))
                .into_query();
            condition = condition.add(RecipeCol::Id.in_subquery(in_cart));
        }
    }

    let finder = Recipes::find()
        .filter(condition)
        .order_by_desc(RecipeCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = hydrate(
        &state.orm,
        &state.media,
        viewer.map(|v| v.user_id),
        models,
    )
    .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Recipes", RecipeList { items }, Some(meta)))
}

pub async fn get_recipe(
    state: &AppState,
    viewer: Option<AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Recipe>> {
    let model = find_recipe(&state.orm, id).await?;
    let recipe = hydrate_one(state, viewer.map(|v| v.user_id), model).await?;
    Ok(ApiResponse::success("Recipe", recipe, None))
}

pub async fn create_recipe(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRecipeRequest,
) -> AppResult<ApiResponse<Recipe>> {
    payload.validate()?;
    check_composition(&payload.ingredients, &payload.tags)?;
    check_references(&state.orm, &payload.ingredients, &payload.tags).await?;
    let image = parse_data_uri(&payload.image)?;

    let image_path = state.media.save(&image).await?;
    let recipe = match write_new_recipe(&state.orm, user.user_id, &payload, &image_path).await {
        Ok(recipe) => recipe,
        Err(err) => {
            state.media.discard(&image_path).await;
            return Err(err);
        }
    };

    tracing::info!(recipe_id = %recipe.id, author_id = %user.user_id, "recipe created");
    let recipe = hydrate_one(state, Some(user.user_id), recipe).await?;
    Ok(ApiResponse::success(
        "Recipe created",
        recipe,
        Some(Meta::empty()),
    ))
}

async fn write_new_recipe(
    db: &DatabaseConnection,
    author_id: Uuid,
    payload: &CreateRecipeRequest,
    image_path: &str,
) -> AppResult<RecipeModel> {
    let txn = db.begin().await?;

    let recipe = RecipeActive {
        id: Set(Uuid::new_v4()),
        author_id: Set(author_id),
        name: Set(payload.name.clone()),
        text: Set(payload.text.clone()),
        cooking_time: Set(payload.cooking_time),
        image: Set(image_path.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    insert_composition(&txn, recipe.id, &payload.ingredients, &payload.tags).await?;

    txn.commit().await?;
    Ok(recipe)
}

pub async fn update_recipe(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRecipeRequest,
) -> AppResult<ApiResponse<Recipe>> {
    let existing = find_recipe(&state.orm, id).await?;
    ensure_owner(user, existing.author_id)?;

    payload.validate()?;
    check_composition(&payload.ingredients, &payload.tags)?;
    check_references(&state.orm, &payload.ingredients, &payload.tags).await?;
    let image = payload.image.as_deref().map(parse_data_uri).transpose()?;

    let new_image = match &image {
        Some(image) => Some(state.media.save(image).await?),
        None => None,
    };
    let old_image = existing.image.clone();

    let recipe = match write_update(&state.orm, existing, &payload, new_image.as_deref()).await {
        Ok(recipe) => recipe,
        Err(err) => {
            if let Some(path) = &new_image {
                state.media.discard(path).await;
            }
            return Err(err);
        }
    };
    if new_image.is_some() {
        state.media.discard(&old_image).await;
    }

    tracing::info!(recipe_id = %recipe.id, "recipe updated");
    let recipe = hydrate_one(state, Some(user.user_id), recipe).await?;
    Ok(ApiResponse::success("Updated", recipe, Some(Meta::empty())))
}

/// Scalar fields are patched; ingredient and tag rows are deleted and
/// reinserted inside the same transaction.
async fn write_update(
    db: &DatabaseConnection,
    existing: RecipeModel,
    payload: &UpdateRecipeRequest,
    image_path: Option<&str>,
) -> AppResult<RecipeModel> {
    let txn = db.begin().await?;

    let unchanged = existing.clone();
    let mut active: RecipeActive = existing.into();
    if let Some(name) = &payload.name {
        active.name = Set(name.clone());
    }
    if let Some(text) = &payload.text {
        active.text = Set(text.clone());
    }
    if let Some(cooking_time) = payload.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    if let Some(path) = image_path {
        active.image = Set(path.to_string());
    }
    let recipe = if active.is_changed() {
        active.update(&txn).await?
    } else {
        unchanged
    };

    RecipeIngredients::delete_many()
        .filter(RecipeIngCol::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    RecipeTags::delete_many()
        .filter(RecipeTagCol::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    insert_composition(&txn, recipe.id, &payload.ingredients, &payload.tags).await?;

    txn.commit().await?;
    Ok(recipe)
}

/// Removes the recipe; ingredient, tag, favorite and cart rows go with it
/// through `ON DELETE CASCADE`.
pub async fn delete_recipe(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let existing = find_recipe(&state.orm, id).await?;
    ensure_owner(user, existing.author_id)?;

    let result = Recipes::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    state.media.discard(&existing.image).await;

    tracing::info!(recipe_id = %id, "recipe deleted");
    Ok(())
}

/// Replaces the image of an existing recipe with an uploaded file.
pub async fn replace_image(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    ext: &str,
    bytes: Vec<u8>,
) -> AppResult<ApiResponse<Recipe>> {
    let existing = find_recipe(&state.orm, id).await?;
    ensure_owner(user, existing.author_id)?;

    let ext = ext.to_ascii_lowercase();
    check_extension(&ext)?;
    if bytes.is_empty() {
        return Err(AppError::invalid("image", "Image payload is empty"));
    }

    let old_image = existing.image.clone();
    let path = state.media.save(&DecodedImage { ext, bytes }).await?;

    let mut active: RecipeActive = existing.into();
    active.image = Set(path.clone());
    let recipe = match active.update(&state.orm).await {
        Ok(recipe) => recipe,
        Err(err) => {
            state.media.discard(&path).await;
            return Err(err.into());
        }
    };
    state.media.discard(&old_image).await;

    let recipe = hydrate_one(state, Some(user.user_id), recipe).await?;
    Ok(ApiResponse::success("Image updated", recipe, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Uuid, amount: i32) -> IngredientAmountInput {
        IngredientAmountInput { id, amount }
    }

    #[test]
    fn composition_requires_ingredients_and_tags() {
        let tag = Uuid::new_v4();
        assert!(matches!(
            check_composition(&[], &[tag]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_composition(&[item(Uuid::new_v4(), 1)], &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn composition_rejects_repeats_and_zero_amounts() {
        let salt = Uuid::new_v4();
        let tag = Uuid::new_v4();
        assert!(check_composition(&[item(salt, 1), item(salt, 2)], &[tag]).is_err());
        assert!(check_composition(&[item(salt, 0)], &[tag]).is_err());
        assert!(check_composition(&[item(salt, 1)], &[tag, tag]).is_err());
        assert!(check_composition(&[item(salt, 1)], &[tag]).is_ok());
    }
}
