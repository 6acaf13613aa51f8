use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    credentials::PasswordHasher,
    error::{AppError, Result},
    models::{
        PatchUserRequest, ReplaceUserRequest, SessionUpdateRequest, SignupRequest, UserProfile,
        UserRecord,
    },
    policy::{authorize_self, authorize_user_listing},
    repository::{Repository, RepositoryError, UniqueField},
};

const LABEL: &str = "User";

/// The part of an email before the `@`, used as the default username.
fn username_base(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// First free username of the form `base`, `base1`, `base2`, ...
async fn free_username(repo: &dyn Repository, base: &str) -> Result<String> {
    let mut suffix: u32 = 0;
    loop {
        let candidate = if suffix == 0 {
            base.to_string()
        } else {
            format!("{base}{suffix}")
        };
        if !repo.username_taken(&candidate, None).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

async fn ensure_email_free(repo: &dyn Repository, email: &str, except: Option<Uuid>) -> Result<()> {
    if repo.email_taken(email, except).await? {
        return Err(AppError::Conflict(format!("email `{email}` is already registered")));
    }
    Ok(())
}

async fn ensure_username_free(
    repo: &dyn Repository,
    username: &str,
    except: Option<Uuid>,
) -> Result<()> {
    if repo.username_taken(username, except).await? {
        return Err(AppError::Conflict(format!("username `{username}` is already taken")));
    }
    Ok(())
}

/// signup
///
/// Public registration. A duplicate email or an explicitly chosen duplicate
/// username is a conflict; a username derived from the email is suffixed until
/// it is free. The repository re-checks both at insert, so two concurrent
/// signups cannot claim the same email, and a derived username lost to a
/// concurrent signup is recomputed.
pub async fn signup(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    req: SignupRequest,
) -> Result<UserProfile> {
    ensure_email_free(repo, &req.email, None).await?;
    if let Some(explicit) = &req.username {
        ensure_username_free(repo, explicit, None).await?;
    }

    let now = Utc::now();
    let mut user = UserRecord {
        id: Uuid::new_v4(),
        name: req.name,
        email: req.email,
        username: String::new(),
        password_hash: hasher.hash(&req.password)?,
        role: req.role,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    // Each lost race means another signup took the name, so this ends.
    let user = loop {
        user.username = match &req.username {
            Some(explicit) => explicit.clone(),
            None => free_username(repo, username_base(&user.email)).await?,
        };
        match repo.insert_user(user.clone()).await {
            Ok(stored) => break stored,
            Err(RepositoryError::Conflict(UniqueField::Username)) if req.username.is_none() => {
                tracing::debug!(username = %user.username, "Derived username taken concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    };

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user.into())
}

pub async fn list(repo: &dyn Repository, actor: &AuthUser) -> Result<Vec<UserProfile>> {
    authorize_user_listing(actor)?;
    let users = repo.list_users().await?;
    Ok(users.into_iter().map(UserProfile::from).collect())
}

async fn load_self(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<UserRecord> {
    authorize_self(actor, id)?;
    repo.find_user_by_id(id)
        .await?
        .ok_or(AppError::NotFound(LABEL))
}

pub async fn get(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<UserProfile> {
    Ok(load_self(repo, actor, id).await?.into())
}

/// replace
///
/// PUT: name, email and username are all required. The password is rehashed
/// only when supplied. The role never changes.
pub async fn replace(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    actor: &AuthUser,
    id: Uuid,
    req: ReplaceUserRequest,
) -> Result<UserProfile> {
    let mut user = load_self(repo, actor, id).await?;

    if req.email != user.email {
        ensure_email_free(repo, &req.email, Some(id)).await?;
    }
    if req.username != user.username {
        ensure_username_free(repo, &req.username, Some(id)).await?;
    }

    user.name = req.name;
    user.email = req.email;
    user.username = req.username;
    if let Some(password) = req.password {
        user.password_hash = hasher.hash(&password)?;
    }

    store(repo, &user).await
}

pub async fn patch(
    repo: &dyn Repository,
    hasher: &PasswordHasher,
    actor: &AuthUser,
    id: Uuid,
    req: PatchUserRequest,
) -> Result<UserProfile> {
    if req.is_empty() {
        return Err(AppError::Validation("no fields to update".to_string()));
    }
    let mut user = load_self(repo, actor, id).await?;

    if let Some(email) = req.email {
        if email != user.email {
            ensure_email_free(repo, &email, Some(id)).await?;
        }
        user.email = email;
    }
    if let Some(username) = req.username {
        if username != user.username {
            ensure_username_free(repo, &username, Some(id)).await?;
        }
        user.username = username;
    }
    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(password) = req.password {
        user.password_hash = hasher.hash(&password)?;
    }

    store(repo, &user).await
}

async fn store(repo: &dyn Repository, user: &UserRecord) -> Result<UserProfile> {
    let updated = repo
        .update_user(user)
        .await?
        .ok_or(AppError::NotFound(LABEL))?;
    tracing::debug!(user_id = %updated.id, "User profile updated");
    Ok(updated.into())
}

/// delete
///
/// Soft delete. The account can no longer log in, but its email and username
/// stay reserved. Tokens already issued remain valid until they expire.
pub async fn delete(repo: &dyn Repository, actor: &AuthUser, id: Uuid) -> Result<()> {
    authorize_self(actor, id)?;
    if !repo.soft_delete_user(id).await? {
        return Err(AppError::NotFound(LABEL));
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(())
}

/// session_snapshot
///
/// The display claims a session refresh may carry: always the caller's stored
/// profile. A supplied value that differs from it is rejected, so a token can
/// only ever echo what the account actually holds.
pub async fn session_snapshot(
    repo: &dyn Repository,
    user_id: Uuid,
    update: &SessionUpdateRequest,
) -> Result<SessionUpdateRequest> {
    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let mismatch = [
        ("name", &update.name, &user.name),
        ("email", &update.email, &user.email),
        ("username", &update.username, &user.username),
    ]
    .into_iter()
    .find(|(_, sent, stored)| sent.as_ref().is_some_and(|sent| sent != *stored));
    if let Some((field, _, _)) = mismatch {
        return Err(AppError::Validation(format!(
            "`{field}` does not match the stored profile"
        )));
    }

    Ok(SessionUpdateRequest {
        name: Some(user.name),
        email: Some(user.email),
        username: Some(user.username),
    })
}
