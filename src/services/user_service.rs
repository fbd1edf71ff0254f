use std::collections::{HashMap, HashSet};

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::users::{ProfileList, SubscriptionList},
    entity::{
        Follows, Recipes, Users,
        follows::Column as FollowCol,
        recipes::Column as RecipeCol,
        users::{Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    ledger,
    media::MediaStore,
    middleware::auth::AuthUser,
    models::{Profile, Subscription},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SubscriptionQuery},
    services::recipe_service::short_card,
    state::AppState,
};

pub fn profile_from_entity(model: UserModel, is_subscribed: bool) -> Profile {
    Profile {
        id: model.id,
        email: model.email,
        username: model.username,
        first_name: model.first_name,
        last_name: model.last_name,
        is_subscribed,
    }
}

/// Profiles in input order, with `is_subscribed` computed for `viewer`.
pub async fn profiles<C: ConnectionTrait>(
    db: &C,
    viewer: Option<Uuid>,
    users: Vec<UserModel>,
) -> AppResult<Vec<Profile>> {
    let subscribed = match viewer {
        Some(viewer) => {
            let ids = users.iter().map(|u| u.id).collect();
            ledger::targets_among::<Follows, _>(db, viewer, ids).await?
        }
        None => HashSet::new(),
    };

    Ok(users
        .into_iter()
        .map(|user| {
            let is_subscribed = subscribed.contains(&user.id);
            profile_from_entity(user, is_subscribed)
        })
        .collect())
}

pub async fn list_users(
    state: &AppState,
    viewer: Option<AuthUser>,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProfileList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Users::find().order_by_asc(UserCol::Username);
    let total = finder.clone().count(&state.orm).await? as i64;
    let users = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = profiles(&state.orm, viewer.map(|v| v.user_id), users).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", ProfileList { items }, Some(meta)))
}

pub async fn get_user(
    state: &AppState,
    viewer: Option<AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Profile>> {
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let profile = profiles(&state.orm, viewer.map(|v| v.user_id), vec![user])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", profile, None))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "OK",
        profile_from_entity(account, false),
        None,
    ))
}

pub async fn subscribe(
    state: &AppState,
    user: &AuthUser,
    author_id: Uuid,
    recipes_limit: Option<u64>,
) -> AppResult<ApiResponse<Subscription>> {
    let author = Users::find_by_id(author_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if author.id == user.user_id {
        return Err(AppError::invalid(
            "following",
            "You cannot subscribe to yourself",
        ));
    }

    ledger::add::<Follows, _>(&state.orm, user.user_id, author.id).await?;
    tracing::info!(user_id = %user.user_id, author_id = %author.id, "subscribed");

    let subscription = subscriptions_for(
        &state.orm,
        &state.media,
        user.user_id,
        vec![author],
        recipes_limit,
    )
    .await?
    .pop()
    .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Subscribed",
        subscription,
        Some(Meta::empty()),
    ))
}

pub async fn unsubscribe(state: &AppState, user: &AuthUser, author_id: Uuid) -> AppResult<()> {
    Users::find_by_id(author_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ledger::remove::<Follows, _>(&state.orm, user.user_id, author_id).await?;
    tracing::info!(user_id = %user.user_id, author_id = %author_id, "unsubscribed");
    Ok(())
}

pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
    query: SubscriptionQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let finder = Follows::find()
        .filter(FollowCol::UserId.eq(user.user_id))
        .order_by_desc(FollowCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let author_ids: Vec<Uuid> = finder
        .select_only()
        .column(FollowCol::FollowingId)
        .limit(limit as u64)
        .offset(offset as u64)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut by_id: HashMap<Uuid, UserModel> = Users::find()
        .filter(UserCol::Id.is_in(author_ids.clone()))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let authors = author_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();

    let items = subscriptions_for(
        &state.orm,
        &state.media,
        user.user_id,
        authors,
        query.recipes_limit,
    )
    .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "OK",
        SubscriptionList { items },
        Some(meta),
    ))
}

/// Each author with their newest recipes (up to `recipes_limit`) and the
/// full recipe count.
pub async fn subscriptions_for<C: ConnectionTrait>(
    db: &C,
    media: &MediaStore,
    viewer: Uuid,
    authors: Vec<UserModel>,
    recipes_limit: Option<u64>,
) -> AppResult<Vec<Subscription>> {
    let ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();
    let counts: HashMap<Uuid, i64> = Recipes::find()
        .select_only()
        .column(RecipeCol::AuthorId)
        .column_as(Expr::col(RecipeCol::Id).count(), "recipes_count")
        .filter(RecipeCol::AuthorId.is_in(ids))
        .group_by(RecipeCol::AuthorId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let mut subscriptions = Vec::with_capacity(authors.len());
    for profile in profiles(db, Some(viewer), authors).await? {
        let mut finder = Recipes::find()
            .filter(RecipeCol::AuthorId.eq(profile.id))
            .order_by_desc(RecipeCol::CreatedAt);
        if let Some(limit) = recipes_limit {
            finder = finder.limit(limit);
        }
        let recipes = finder
            .all(db)
            .await?
            .into_iter()
            .map(|recipe| short_card(media, recipe))
            .collect();

        subscriptions.push(Subscription {
            recipes_count: counts.get(&profile.id).copied().unwrap_or(0),
            profile,
            recipes,
        });
    }
    Ok(subscriptions)
}
