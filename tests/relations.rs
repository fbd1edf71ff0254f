mod common;

use foodgram_api::{
    dto::auth::RegisterRequest,
    entity::{Favorites, Follows, Users},
    error::AppError,
    ledger,
    routes::params::SubscriptionQuery,
    services::{auth_service, cart_service, favorite_service, user_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn favorite_twice_and_remove_missing() -> anyhow::Result<()> {
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

    let card = favorite_service::add_favorite(&state, &fan, recipe.id)
        .await?
        .data
        .expect("card");
    assert_eq!(card.id, recipe.id);
    assert_eq!(card.cooking_time, 15);

    match favorite_service::add_favorite(&state, &fan, recipe.id).await {
        Err(AppError::AlreadyExists(message)) => {
            assert_eq!(message, "Recipe is already in favorites")
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    favorite_service::remove_favorite(&state, &fan, recipe.id).await?;
    match favorite_service::remove_favorite(&state, &fan, recipe.id).await {
        Err(AppError::RelationNotFound(message)) => {
            assert_eq!(message, "Recipe is not in favorites")
        }
        other => panic!("expected RelationNotFound, got {other:?}"),
    }

    let result = favorite_service::add_favorite(&state, &fan, uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn shopping_list_sums_matching_ingredients() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let buyer = common::create_user(&state, "buyer").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let rice = common::create_ingredient(&state, "Rice", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;

    let soup = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Soup", &[(salt.id, 5)], &[tag.id]),
    )
    .await?;
    let pilaf = common::create_recipe(
        &state,
        &author,
        common::recipe_request("Pilaf", &[(salt.id, 10), (rice.id, 200)], &[tag.id]),
    )
    .await?;

    cart_service::add_to_cart(&state, &buyer, soup.id).await?;
    cart_service::add_to_cart(&state, &buyer, pilaf.id).await?;

    let lines = cart_service::shopping_list(&state, &buyer).await?;
    let text = cart_service::render_shopping_list(&lines);
    assert_eq!(text, "Shopping Cart\nRice (g) - 200\nSalt (g) - 15\n");
    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_downloaded() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let buyer = common::create_user(&state, "buyer").await?;

    let result = cart_service::shopping_list(&state, &buyer).await;
    assert!(matches!(result, Err(AppError::EmptyCart)));
    Ok(())
}

#[tokio::test]
async fn cart_remove_of_absent_entry_is_rejected() -> anyhow::Result<()> {
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

    let result = cart_service::remove_from_cart(&state, &author, recipe.id).await;
    assert!(matches!(result, Err(AppError::RelationNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn cannot_subscribe_to_self() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let user = common::create_user(&state, "solo").await?;

    let result = user_service::subscribe(&state, &user, user.user_id, None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn subscriptions_respect_recipes_limit() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let author = common::create_user(&state, "chef").await?;
    let reader = common::create_user(&state, "reader").await?;
    let salt = common::create_ingredient(&state, "Salt", "g").await?;
    let tag = common::create_tag(&state, "Dinner", "#8775D2").await?;
    for name in ["Soup", "Stew", "Broth"] {
        common::create_recipe(
            &state,
            &author,
            common::recipe_request(name, &[(salt.id, 1)], &[tag.id]),
        )
        .await?;
    }

    let subscription = user_service::subscribe(&state, &reader, author.user_id, Some(1))
        .await?
        .data
        .expect("subscription");
    assert!(subscription.profile.is_subscribed);
    assert_eq!(subscription.recipes.len(), 1);
    assert_eq!(subscription.recipes_count, 3);

    let result = user_service::subscribe(&state, &reader, author.user_id, None).await;
    assert!(matches!(result, Err(AppError::AlreadyExists(_))));

    let query = SubscriptionQuery {
        recipes_limit: Some(2),
        ..Default::default()
    };
    let items = user_service::list_subscriptions(&state, &reader, query)
        .await?
        .data
        .expect("subscriptions")
        .items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].recipes.len(), 2);
    assert_eq!(items[0].recipes_count, 3);

    let profile = user_service::get_user(&state, Some(reader), author.user_id)
        .await?
        .data
        .expect("profile");
    assert!(profile.is_subscribed);

    user_service::unsubscribe(&state, &reader, author.user_id).await?;
    let result = user_service::unsubscribe(&state, &reader, author.user_id).await;
    assert!(matches!(result, Err(AppError::RelationNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    common::create_user(&state, "chef").await?;

    let result = common::create_user(&state, "chef").await;
    let err = result.expect_err("duplicate user");
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::AlreadyExists(_))
    ));
    Ok(())
}

#[tokio::test]
async fn unique_index_reports_a_lost_insert_race() -> anyhow::Result<()> {
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

    // A concurrent writer already stored the pair between lookup and insert.
    ledger::insert_pair::<Favorites, _>(&state.orm, fan.user_id, recipe.id).await?;

    match ledger::insert_pair::<Favorites, _>(&state.orm, fan.user_id, recipe.id).await {
        Err(AppError::AlreadyExists(message)) => {
            assert_eq!(message, "Recipe is already in favorites")
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    ledger::insert_pair::<Follows, _>(&state.orm, fan.user_id, author.user_id).await?;
    let result = ledger::insert_pair::<Follows, _>(&state.orm, fan.user_id, author.user_id).await;
    assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    Ok(())
}

#[tokio::test]
async fn account_insert_race_is_reported_as_duplicate() -> anyhow::Result<()> {
    let (state, _media) = common::setup().await?;
    let account = |username: &str| RegisterRequest {
        email: "shared@example.com".into(),
        username: username.into(),
        first_name: "Test".into(),
        last_name: "Cook".into(),
        password: "password123".into(),
    };

    auth_service::insert_account(&state.orm, account("first")).await?;
    let result = auth_service::insert_account(&state.orm, account("second")).await;
    assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    assert_eq!(Users::find().count(&state.orm).await?, 1);
    Ok(())
}
