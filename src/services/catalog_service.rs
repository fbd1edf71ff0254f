use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::catalog::{IngredientList, TagList},
    entity::{
        Ingredients, Tags,
        ingredients::{Column as IngCol, Model as IngredientModel},
        tags::{Column as TagCol, Model as TagModel},
    },
    error::{AppError, AppResult},
    models::{Ingredient, Tag},
    response::{ApiResponse, Meta},
    routes::params::IngredientQuery,
    state::AppState,
};

fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
        color: model.color,
        slug: model.slug,
    }
}

fn ingredient_from_entity(model: IngredientModel) -> Ingredient {
    Ingredient {
        id: model.id,
        name: model.name,
        measurement_unit: model.measurement_unit,
    }
}

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items: Vec<Tag> = Tags::find()
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("OK", TagList { items }, Some(meta)))
}

pub async fn get_tag(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Tag>> {
    let tag = Tags::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", tag_from_entity(tag), None))
}

pub async fn list_ingredients(
    state: &AppState,
    query: IngredientQuery,
) -> AppResult<ApiResponse<IngredientList>> {
    let mut finder = Ingredients::find().order_by_asc(IngCol::Name);
    if let Some(prefix) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        finder = finder.filter(IngCol::Name.starts_with(prefix));
    }

    let items: Vec<Ingredient> = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ingredient_from_entity)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("OK", IngredientList { items }, Some(meta)))
}

pub async fn get_ingredient(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Ingredient>> {
    let ingredient = Ingredients::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "OK",
        ingredient_from_entity(ingredient),
        None,
    ))
}
