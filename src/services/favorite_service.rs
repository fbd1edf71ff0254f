use uuid::Uuid;

use crate::{
    entity::Favorites,
    error::AppResult,
    ledger,
    middleware::auth::AuthUser,
    models::RecipeShort,
    response::{ApiResponse, Meta},
    services::recipe_service::{find_recipe, short_card},
    state::AppState,
};

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeShort>> {
    let recipe = find_recipe(&state.orm, recipe_id).await?;
    ledger::add::<Favorites, _>(&state.orm, user.user_id, recipe.id).await?;

    tracing::info!(user_id = %user.user_id, recipe_id = %recipe.id, "favorite added");
    Ok(ApiResponse::success(
        "Added to favorites",
        short_card(&state.media, recipe),
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(state: &AppState, user: &AuthUser, recipe_id: Uuid) -> AppResult<()> {
    find_recipe(&state.orm, recipe_id).await?;
    ledger::remove::<Favorites, _>(&state.orm, user.user_id, recipe_id).await?;

    tracing::info!(user_id = %user.user_id, recipe_id = %recipe_id, "favorite removed");
    Ok(())
}
