use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, SetPasswordRequest},
    entity::users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Profile,
    response::{ApiResponse, Meta},
    services::user_service::profile_from_entity,
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(user_id: Uuid, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<Profile>> {
    payload.validate()?;

    let taken = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(payload.email.as_str()))
                .add(UserCol::Username.eq(payload.username.as_str())),
        )
        .one(&state.orm)
        .await?;

    if let Some(existing) = taken {
        let message = if existing.email == payload.email {
            "A user with this email already exists"
        } else {
            "A user with this username already exists"
        };
        return Err(AppError::AlreadyExists(message.into()));
    }

    let user = insert_account(&state.orm, payload).await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::success(
        "User created",
        profile_from_entity(user, false),
        None,
    ))
}

/// Insert a validated account. A concurrent registration with the same
/// email or username trips the unique keys and comes back as `AlreadyExists`.
pub async fn insert_account<C: ConnectionTrait>(
    db: &C,
    account: RegisterRequest,
) -> AppResult<users::Model> {
    UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(account.email),
        username: Set(account.username),
        first_name: Set(account.first_name),
        last_name: Set(account.last_name),
        password_hash: Set(hash_password(&account.password)?),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .map_err(|err| AppError::on_conflict(err, "A user with this email or username already exists"))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let token = issue_token(
        user.id,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
        },
        Some(Meta::empty()),
    ))
}

pub async fn set_password(
    state: &AppState,
    user: &AuthUser,
    payload: SetPasswordRequest,
) -> AppResult<()> {
    payload.validate()?;
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !verify_password(&payload.current_password, &account.password_hash)? {
        return Err(AppError::invalid(
            "current_password",
            "Current password is incorrect",
        ));
    }

    let mut active: UserActive = account.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.update(&state.orm).await?;

    tracing::info!(user_id = %user.user_id, "password changed");
    Ok(())
}
