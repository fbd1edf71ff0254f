//! Pair relations between a user and a target row (favorites, shopping
//! cart entries, follows). Every pair is unique; `add` and `remove` are the
//! only state changes.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    entity::{favorites, follows, shopping_carts},
    error::{AppError, AppResult},
};

pub trait PairRelation: EntityTrait {
    type Row: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;

    /// Message returned when the pair is already recorded.
    const ALREADY_EXISTS: &'static str;
    /// Message returned when removing a pair that was never recorded.
    const MISSING: &'static str;

    fn owner_column() -> Self::Column;
    fn target_column() -> Self::Column;
    fn new_row(owner: Uuid, target: Uuid) -> Self::Row;
}

impl PairRelation for favorites::Entity {
    type Row = favorites::ActiveModel;

    const ALREADY_EXISTS: &'static str = "Recipe is already in favorites";
    const MISSING: &'static str = "Recipe is not in favorites";

    fn owner_column() -> Self::Column {
        favorites::Column::UserId
    }

    fn target_column() -> Self::Column {
        favorites::Column::RecipeId
    }

    fn new_row(owner: Uuid, target: Uuid) -> Self::Row {
        favorites::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner),
            recipe_id: Set(target),
            created_at: Set(Utc::now().into()),
        }
    }
}

impl PairRelation for shopping_carts::Entity {
    type Row = shopping_carts::ActiveModel;

    const ALREADY_EXISTS: &'static str = "Recipe is already in the shopping cart";
    const MISSING: &'static str = "Recipe is not in the shopping cart";

    fn owner_column() -> Self::Column {
        shopping_carts::Column::UserId
    }

    fn target_column() -> Self::Column {
        shopping_carts::Column::RecipeId
    }

    fn new_row(owner: Uuid, target: Uuid) -> Self::Row {
        shopping_carts::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner),
            recipe_id: Set(target),
            created_at: Set(Utc::now().into()),
        }
    }
}

impl PairRelation for follows::Entity {
    type Row = follows::ActiveModel;

    const ALREADY_EXISTS: &'static str = "You are already subscribed to this author";
    const MISSING: &'static str = "You are not subscribed to this author";

    fn owner_column() -> Self::Column {
        follows::Column::UserId
    }

    fn target_column() -> Self::Column {
        follows::Column::FollowingId
    }

    fn new_row(owner: Uuid, target: Uuid) -> Self::Row {
        follows::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner),
            following_id: Set(target),
            created_at: Set(Utc::now().into()),
        }
    }
}

pub async fn exists<R, C>(db: &C, owner: Uuid, target: Uuid) -> AppResult<bool>
where
    R: PairRelation,
    C: ConnectionTrait,
{
    let row = R::find()
        .filter(R::owner_column().eq(owner))
        .filter(R::target_column().eq(target))
        .one(db)
        .await?;
    Ok(row.is_some())
}

/// Record the pair. The lookup and the insert are not atomic; a concurrent
/// duplicate is caught by the unique index and reported the same way.
pub async fn add<R, C>(db: &C, owner: Uuid, target: Uuid) -> AppResult<R::Model>
where
    R: PairRelation,
    R::Model: IntoActiveModel<R::Row>,
    C: ConnectionTrait,
{
    if exists::<R, C>(db, owner, target).await? {
        return Err(AppError::AlreadyExists(R::ALREADY_EXISTS.into()));
    }
    insert_pair::<R, C>(db, owner, target).await
}

/// Insert without the lookup. A duplicate pair is rejected by the unique
/// index and reported as `AlreadyExists`.
pub async fn insert_pair<R, C>(db: &C, owner: Uuid, target: Uuid) -> AppResult<R::Model>
where
    R: PairRelation,
    R::Model: IntoActiveModel<R::Row>,
    C: ConnectionTrait,
{
    R::new_row(owner, target)
        .insert(db)
        .await
        .map_err(|err| AppError::on_conflict(err, R::ALREADY_EXISTS))
}

pub async fn remove<R, C>(db: &C, owner: Uuid, target: Uuid) -> AppResult<()>
where
    R: PairRelation,
    C: ConnectionTrait,
{
    let result = R::delete_many()
        .filter(R::owner_column().eq(owner))
        .filter(R::target_column().eq(target))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::RelationNotFound(R::MISSING.into()));
    }
    Ok(())
}

/// Subset of `candidates` paired with `owner`.
pub async fn targets_among<R, C>(
    db: &C,
    owner: Uuid,
    candidates: Vec<Uuid>,
) -> AppResult<HashSet<Uuid>>
where
    R: PairRelation,
    C: ConnectionTrait,
{
    if candidates.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<Uuid> = R::find()
        .select_only()
        .column(R::target_column())
        .filter(R::owner_column().eq(owner))
        .filter(R::target_column().is_in(candidates))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().collect())
}
