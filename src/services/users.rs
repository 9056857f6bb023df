use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use super::Clock;
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{CreateUserRequest, User};
use crate::store::{DocumentStore, Query, find_all, load, persist};

pub async fn create_user(store: &dyn DocumentStore, clock: Clock, request: CreateUserRequest) -> AppResult<User> {
    let mut user = User::create(request, clock.now)?;
    persist(store, &mut user).await?;
    info!("Created {:?} user {}", user.role, user.id);
    Ok(user)
}

pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> AppResult<Option<User>> {
    let email = email.trim().to_lowercase();
    let users: Vec<User> = find_all(store, &Query::filter(json!({ "email": email }))).await?;
    Ok(users.into_iter().next())
}

/// Books a successful login and stores the issued refresh token.
pub async fn record_login(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    user_id: Uuid,
    refresh_token: &str,
) -> AppResult<User> {
    let mut user: User = load(store, user_id).await?;
    if let Err(e) = user.record_successful_login(clock.now) {
        warn!("Login refused for user {}: {}", user_id, e);
        return Err(e);
    }
    user.prune_refresh_tokens(clock.now, config.refresh_token_ttl_days);
    user.add_refresh_token(refresh_token, clock.now, config.max_refresh_tokens);
    persist(store, &mut user).await?;
    info!("User {} logged in", user_id);
    Ok(user)
}

/// Books a failed login. Returns whether the account is now locked.
pub async fn record_failed_login(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    user_id: Uuid,
) -> AppResult<bool> {
    let mut user: User = load(store, user_id).await?;
    let locked = user.record_failed_login(clock.now, config.max_failed_logins, config.lockout_minutes);
    persist(store, &mut user).await?;
    if locked {
        warn!("User {} locked after {} failed logins", user_id, user.failed_logins);
    }
    Ok(locked)
}

/// Swaps a valid refresh token for a new one.
pub async fn rotate_refresh_token(
    store: &dyn DocumentStore,
    clock: Clock,
    config: &AppConfig,
    user_id: Uuid,
    current: &str,
    replacement: &str,
) -> AppResult<User> {
    let mut user: User = load(store, user_id).await?;
    if !user.active || !user.has_refresh_token(current, clock.now, config.refresh_token_ttl_days) {
        return Err(AppError::Validation("Refresh token is invalid or expired".to_string()));
    }
    user.revoke_refresh_token(current);
    user.add_refresh_token(replacement, clock.now, config.max_refresh_tokens);
    persist(store, &mut user).await?;
    Ok(user)
}

pub async fn logout(store: &dyn DocumentStore, user_id: Uuid, refresh_token: &str) -> AppResult<User> {
    let mut user: User = load(store, user_id).await?;
    if user.revoke_refresh_token(refresh_token) {
        persist(store, &mut user).await?;
    }
    Ok(user)
}

pub async fn deactivate_user(store: &dyn DocumentStore, user_id: Uuid) -> AppResult<User> {
    let mut user: User = load(store, user_id).await?;
    user.deactivate();
    persist(store, &mut user).await?;
    info!("Deactivated user {}", user_id);
    Ok(user)
}
