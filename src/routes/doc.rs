use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, SetPasswordRequest},
        catalog::{IngredientList, TagList},
        recipes::{CreateRecipeRequest, IngredientAmountInput, RecipeList, UpdateRecipeRequest},
        users::{ProfileList, SubscriptionList},
    },
    models::{Ingredient, Profile, Recipe, RecipeIngredient, RecipeShort, Subscription, Tag},
    response::{ApiResponse, Meta},
    routes::{auth, health, ingredients, params, recipes, tags, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        recipes::list_recipes,
        recipes::create_recipe,
        recipes::get_recipe,
        recipes::update_recipe,
        recipes::delete_recipe,
        recipes::upload_image,
        recipes::add_favorite,
        recipes::remove_favorite,
        recipes::add_to_cart,
        recipes::remove_from_cart,
        recipes::download_shopping_cart,
        users::list_users,
        users::me,
        users::get_user,
        users::set_password,
        users::list_subscriptions,
        users::subscribe,
        users::unsubscribe,
        tags::list_tags,
        tags::get_tag,
        ingredients::list_ingredients,
        ingredients::get_ingredient
    ),
    components(
        schemas(
            Profile,
            Tag,
            Ingredient,
            RecipeIngredient,
            Recipe,
            RecipeShort,
            Subscription,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            SetPasswordRequest,
            IngredientAmountInput,
            CreateRecipeRequest,
            UpdateRecipeRequest,
            recipes::UploadImageRequest,
            RecipeList,
            ProfileList,
            SubscriptionList,
            TagList,
            IngredientList,
            params::Pagination,
            Meta,
            ApiResponse<Recipe>,
            ApiResponse<RecipeList>,
            ApiResponse<RecipeShort>,
            ApiResponse<Profile>,
            ApiResponse<Subscription>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and token endpoints"),
        (name = "Recipes", description = "Recipe endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Shopping cart", description = "Shopping cart endpoints"),
        (name = "Users", description = "Profiles and subscriptions"),
        (name = "Tags", description = "Tag catalog"),
        (name = "Ingredients", description = "Ingredient catalog"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_recipe_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/recipes"));
        assert!(doc.paths.paths.contains_key("/api/recipes/download_shopping_cart"));
        assert!(doc.paths.paths.contains_key("/api/users/{id}/subscribe"));

        let schemas = doc.components.expect("components").schemas;
        assert!(schemas.contains_key("UploadImageRequest"));
    }
}
