mod common;

use foodgram_api::{
    dto::recipes::{IngredientAmountInput, UpdateRecipeRequest},
    entity::{Favorites, RecipeIngredients, RecipeTags, Recipes, ShoppingCarts},
    error::AppError,
    routes::params::RecipeQuery,
    services::{cart_service, favorite_service, recipe_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn create_recipe_persists_composition_and_image() -> anyhow::Result<()> {
    let (state, media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let flour = common::create_ingredient(&state, "Flour", "g").await?;
    let egg = common::create_ingredient(&state, "Egg", "pcs").await?;
    let tag = common::create_tag(&state, "Breakfast", "#E26C2D").await?;

    let recipe = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Pancakes", &[(flour.id, 200), (egg.id, 2)], &[tag.id]),
    )
    .await?;

    assert_eq!(recipe.author.id, author.user_id);
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(recipe.tags[0].slug, "breakfast");
    assert!(!recipe.is_favorited);
    assert!(!recipe.is_in_shopping_cart);

    let relative = recipe
        .image
        .strip_prefix("/media/")
        .expect("image url under media prefix");
    assert!(relative.starts_with("recipes/"));
    assert!(relative.ends_with("/temp.png"));
    assert!(media.path().join(relative).exists());

    let fetched = recipe_service::get_recipe(&state, None, recipe.id)
        .await?
        .data
        .expect("recipe");
    assert_eq!(fetched.name, "Pancakes");
    Ok(())
}

#[tokio::test]
async fn duplicate_ingredient_is_rejected_and_nothing_is_stored() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;

    let result = recipe_service::create_recipe(
        &state,
        &author,
        common::recipe_request("Salty", &[(salt.id, 1), (salt.id, 2)], &[tag.id]),
    )
    .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(Recipes::find().count(&state.orm).await?, 0);
    assert_eq!(RecipeIngredients::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_tag_is_a_validation_error() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;

    let result = recipe_service::create_recipe(
        &state,
        &author,
        common::recipe_request("Salty", &[(salt.id, 1)], &[uuid::Uuid::new_v4()]),
    )
    .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(Recipes::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn only_the_author_may_change_a_recipe() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let stranger = common::create_user(&state, "stranger").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;
    let recipe = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 3)], &[tag.id]),
    )
    .await?;

    let update = UpdateRecipeRequest {
        ingredients: vec![IngredientAmountInput {
            id: salt.id,
            amount: 4,
        }],
        tags: vec![tag.id],
        image: None,
        name: Some("Stolen soup".into()),
        text: None,
        cooking_time: None,
    };
    let result = recipe_service::update_recipe(&state, &stranger, recipe.id, update).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let result = recipe_service::delete_recipe(&state, &stranger, recipe.id).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
    assert_eq!(Recipes::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn update_replaces_ingredients_and_tags() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let rice = common::create_ingredient(&state, "Rice", "g").await?;
    let lunch = common::create_tag(&state, "Lunch", "#49B64E").await?;
    let dinner = common::create_tag(&state, "Dinner", "#8775D2").await?;
    let recipe = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Bowl", &[(salt.id, 2), (rice.id, 100)], &[lunch.id]),
    )
    .await?;

    let update = UpdateRecipeRequest {
        ingredients: vec![IngredientAmountInput {
            id: rice.id,
            amount: 150,
        }],
        tags: vec![dinner.id],
        image: None,
        name: None,
        text: Some("Steam the rice.".into()),
        cooking_time: Some(25),
    };
    let updated = recipe_service::update_recipe(&state, &author, recipe.id, update)
        .await?
        .data
        .expect("recipe");

    assert_eq!(updated.name, "Bowl");
    assert_eq!(updated.text, "Steam the rice.");
    assert_eq!(updated.cooking_time, 25);
    assert_eq!(updated.ingredients.len(), 1);
    assert_eq!(updated.ingredients[0].id, rice.id);
    assert_eq!(updated.ingredients[0].amount, 150);
    assert_eq!(updated.tags.len(), 1);
    assert_eq!(updated.tags[0].id, dinner.id);
    assert_eq!(RecipeIngredients::find().count(&state.orm).await?, 1);
    assert_eq!(RecipeTags::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn delete_cascades_to_relations() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let fan = common::create_user(&state, "fan").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;
    let recipe = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 3)], &[tag.id]),
    )
    .await?;

    favorite_service::add_favorite(&state, &fan, recipe.id).await?;
    cart_service::add_to_cart(&state, &fan, recipe.id).await?;

    recipe_service::delete_recipe(&state, &author, recipe.id).await?;

    assert_eq!(Recipes::find().count(&state.orm).await?, 0);
    assert_eq!(RecipeIngredients::find().count(&state.orm).await?, 0);
    assert_eq!(RecipeTags::find().count(&state.orm).await?, 0);
    assert_eq!(Favorites::find().count(&state.orm).await?, 0);
    assert_eq!(ShoppingCarts::find().count(&state.orm).await?, 0);

    let result = recipe_service::get_recipe(&state, None, recipe.id).await;
    assert!(matches!(result, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn list_filters_by_tag_and_viewer_flags() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let viewer = common::create_user(&state, "viewer").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let lunch = common::create_tag(&state, "Lunch", "#49B64E").await?;
    let dinner = common::create_tag(&state, "Dinner", "#8775D2").await?;

    let soup = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 3)], &[lunch.id]),
    )
    .await?;
    common::create_recipe(
        &state,
        &author,
        common::recipe_request("Stew", &[(salt.id, 5)], &[dinner.id]),
    )
    .await?;

    let query = RecipeQuery {
        tags: vec!["lunch".into()],
        ..Default::default()
    };
    let items = recipe_service::list_recipes(&state, None, query)
        .await?
        .data
        .expect("list")
        .items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, soup.id);

    favorite_service::add_favorite(&state, &viewer, soup.id).await?;
    let query = RecipeQuery {
        is_favorited: true,
        ..Default::default()
    };
    let items = recipe_service::list_recipes(&state, Some(viewer), query)
        .await?
        .data
        .expect("list")
        .items;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_favorited);

    // Anonymous viewers get the flag ignored.
    let query = RecipeQuery {
        is_favorited: true,
        ..Default::default()
    };
    let resp = recipe_service::list_recipes(&state, None, query).await?;
    assert_eq!(resp.meta.and_then(|m| m.total), Some(2));
    Ok(())
}

#[tokio::test]
async fn stranger_sees_no_viewer_flags() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;
    let recipe = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 3)], &[tag.id]),
    )
    .await?;
    cart_service::add_to_cart(&state, &author, recipe.id).await?;

    let stranger = common::create_user(&state, "other").await?;
    let seen = recipe_service::get_recipe(&state, Some(stranger), recipe.id)
        .await?
        .data
        .expect("recipe");
    assert!(!seen.is_in_shopping_cart);

    let seen = recipe_service::get_recipe(&state, Some(author), recipe.id)
        .await?
        .data
        .expect("recipe");
    assert!(seen.is_in_shopping_cart);
    Ok(())
}

#[tokio::test]
async fn huge_page_number_yields_an_empty_page() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;
    common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 3)], &[tag.id]),
    )
    .await?;

    let query = RecipeQuery {
        page: Some(i64::MAX),
        per_page: Some(100),
        ..Default::default()
    };
    let resp = recipe_service::list_recipes(&state, None, query).await?;
    assert!(resp.data.expect("list").items.is_empty());
    assert_eq!(resp.meta.and_then(|m| m.total), Some(1));
    Ok(())
}
