use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Recipe;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IngredientAmountInput {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<Uuid>,
    /// `data:image/<ext>;base64,<data>`
    pub image: String,
    #[validate(length(min = 1, max = 250))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(range(min = 1))]
    pub cooking_time: i32,
}

/// Ingredient and tag sets are replaced wholesale; other fields are
/// updated only when present.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 250))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub text: Option<String>,
    #[validate(range(min = 1))]
    pub cooking_time: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct RecipeList {
    #[schema(value_type = Vec<Recipe>)]
    pub items: Vec<Recipe>,
}
