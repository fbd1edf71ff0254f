use std::fmt::Write as _;

use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    entity::{
        Ingredients, RecipeIngredients, ShoppingCarts, ingredients::Column as IngCol,
        recipe_ingredients::Column as RecipeIngCol, shopping_carts::Column as CartCol,
    },
    error::{AppError, AppResult},
    ledger,
    middleware::auth::AuthUser,
    models::RecipeShort,
    response::{ApiResponse, Meta},
    services::recipe_service::{find_recipe, short_card},
    state::AppState,
};

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeShort>> {
    let recipe = find_recipe(&state.orm, recipe_id).await?;
    ledger::add::<ShoppingCarts, _>(&state.orm, user.user_id, recipe.id).await?;

    tracing::info!(user_id = %user.user_id, recipe_id = %recipe.id, "cart entry added");
    Ok(ApiResponse::success(
        "Added to shopping cart",
        short_card(&state.media, recipe),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(state: &AppState, user: &AuthUser, recipe_id: Uuid) -> AppResult<()> {
    find_recipe(&state.orm, recipe_id).await?;
    ledger::remove::<ShoppingCarts, _>(&state.orm, user.user_id, recipe_id).await?;

    tracing::info!(user_id = %user.user_id, recipe_id = %recipe_id, "cart entry removed");
    Ok(())
}

/// One aggregated line of the shopping list.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums ingredient amounts over every recipe in the user's cart, grouped
/// by ingredient name and unit.
pub async fn shopping_list(state: &AppState, user: &AuthUser) -> AppResult<Vec<ShoppingListLine>> {
    let in_cart = ShoppingCarts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?;
    if in_cart == 0 {
        return Err(AppError::EmptyCart);
    }

    let cart_recipes = ShoppingCarts::find()
        .select_only()
        .column(CartCol::RecipeId)
        .filter(CartCol::UserId.eq(user.user_id))
        .into_query();

    let lines = RecipeIngredients::find()
        .select_only()
        .column(IngCol::Name)
        .column(IngCol::MeasurementUnit)
        .column_as(Expr::col(RecipeIngCol::Amount).sum(), "amount")
        .inner_join(Ingredients)
        .filter(RecipeIngCol::RecipeId.in_subquery(cart_recipes))
        .group_by(IngCol::Name)
        .group_by(IngCol::MeasurementUnit)
        .order_by_asc(IngCol::Name)
        .order_by_asc(IngCol::MeasurementUnit)
        .into_model::<ShoppingListLine>()
        .all(&state.orm)
        .await?;

    tracing::debug!(user_id = %user.user_id, lines = lines.len(), "shopping list built");
    Ok(lines)
}

pub fn render_shopping_list(lines: &[ShoppingListLine]) -> String {
    let mut out = String::from("Shopping Cart\n");
    for line in lines {
        let _ = writeln!(
            out,
            "{} ({}) - {}",
            line.name, line.measurement_unit, line.amount
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i64) -> ShoppingListLine {
        ShoppingListLine {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn renders_header_and_lines() {
        let text = render_shopping_list(&[line("Flour", "g", 500), line("Salt", "g", 15)]);
        assert_eq!(text, "Shopping Cart\nFlour (g) - 500\nSalt (g) - 15\n");
    }

    #[test]
    fn renders_header_only_for_no_lines() {
        assert_eq!(render_shopping_list(&[]), "Shopping Cart\n");
    }
}
