#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use foodgram_api::{
    config::AppConfig,
    db::{connect, run_migrations},
    dto::{
        auth::RegisterRequest,
        recipes::{CreateRecipeRequest, IngredientAmountInput},
    },
    entity::{
        ingredients::{ActiveModel as IngredientActive, Model as IngredientModel},
        tags::{ActiveModel as TagActive, Model as TagModel},
    },
    middleware::auth::AuthUser,
    models::Recipe,
    services::{auth_service, recipe_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectOptions, Set};
use temp_dir::TempDir;
use uuid::Uuid;

/// In-memory SQLite lives as long as its only connection, so the pool is
/// pinned to exactly one.
pub async fn setup() -> anyhow::Result<(AppState, TempDir)> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = connect(options).await?;
    run_migrations(&orm).await?;

    let media = TempDir::new()?;
    let config = AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        token_ttl_hours: 1,
        media_root: media.path().to_path_buf(),
        media_url: "/media".into(),
        max_body_bytes: 10 * 1024 * 1024,
    };
    Ok((AppState::new(orm, config), media))
}

pub async fn create_user(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            email: format!("{username}@example.com"),
            username: username.into(),
            first_name: "Test".into(),
            last_name: "Cook".into(),
            password: "password123".into(),
        },
    )
    .await?;
    let profile = resp.data.ok_or_else(|| anyhow::anyhow!("missing profile"))?;
    Ok(AuthUser {
        user_id: profile.id,
    })
}

pub async fn create_ingredient(
    state: &AppState,
    name: &str,
    unit: &str,
) -> anyhow::Result<IngredientModel> {
    let ingredient = IngredientActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        measurement_unit: Set(unit.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(ingredient)
}

pub async fn create_tag(state: &AppState, name: &str, color: &str) -> anyhow::Result<TagModel> {
    let tag = TagActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        color: Set(color.into()),
        slug: Set(name.to_lowercase()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(tag)
}

pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG fake"))
}

pub fn recipe_request(
    name: &str,
    ingredients: &[(Uuid, i32)],
    tags: &[Uuid],
) -> CreateRecipeRequest {
    CreateRecipeRequest {
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmountInput {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
        image: png_data_uri(),
        name: name.into(),
        text: "Mix and cook.".into(),
        cooking_time: 15,
    }
}

pub async fn create_recipe(
    state: &AppState,
    author: &AuthUser,
    request: CreateRecipeRequest,
) -> anyhow::Result<Recipe> {
    let resp = recipe_service::create_recipe(state, author, request).await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("missing recipe"))
}
