use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use foodgram_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Ingredients, Tags, Users,
        ingredients::{ActiveModel as IngredientActive, Column as IngCol},
        tags::{ActiveModel as TagActive, Column as TagCol},
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    services::auth_service::hash_password,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "#E26C2D", "breakfast"),
    ("Lunch", "#49B64E", "lunch"),
    ("Dinner", "#8775D2", "dinner"),
];

#[derive(Debug, Deserialize)]
struct IngredientRecord {
    name: String,
    #[serde(default = "default_unit")]
    measurement_unit: String,
}

fn default_unit() -> String {
    "g".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/ingredients.json"));
    let added = seed_ingredients(&orm, &path).await?;
    println!("Seeded {added} ingredients from {}", path.display());

    seed_tags(&orm).await?;
    let user_id = ensure_user(&orm, "cook@example.com", "cook", "cook12345").await?;

    println!("Seed completed. Demo user ID: {user_id}");
    Ok(())
}

async fn seed_ingredients(orm: &DatabaseConnection, path: &PathBuf) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<IngredientRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let mut added = 0;
    for record in records {
        let existing = Ingredients::find()
            .filter(IngCol::Name.eq(record.name.as_str()))
            .filter(IngCol::MeasurementUnit.eq(record.measurement_unit.as_str()))
            .one(orm)
            .await?;
        if existing.is_some() {
            continue;
        }

        IngredientActive {
            id: Set(Uuid::new_v4()),
            name: Set(record.name),
            measurement_unit: Set(record.measurement_unit),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
        added += 1;
    }
    Ok(added)
}

async fn seed_tags(orm: &DatabaseConnection) -> anyhow::Result<()> {
    for (name, color, slug) in DEFAULT_TAGS {
        let existing = Tags::find()
            .filter(TagCol::Slug.eq(*slug))
            .one(orm)
            .await?;
        if existing.is_some() {
            continue;
        }

        TagActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            color: Set(color.to_string()),
            slug: Set(slug.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded tags");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    username: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    if let Some(user) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(user.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(username.to_string()),
        first_name: Set("Demo".to_string()),
        last_name: Set("Cook".to_string()),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email}");
    Ok(user.id)
}
