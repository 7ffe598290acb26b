use tracing::{error, info, warn};

use crate::auth::{
    password::{hash_password, verify_password},
    repo::AdminRepo,
    repo_types::Admin,
};

/// Checks a username/password pair against the stored hash.
///
/// Unknown usernames, wrong passwords, malformed hashes and store failures all
/// yield `None`; only the log tells them apart.
pub async fn verify_admin(repo: &dyn AdminRepo, username: &str, password: &str) -> Option<Admin> {
    let admin = match repo.find_by_username(username).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            warn!(username, "login unknown username");
            return None;
        }
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return None;
        }
    };

    match verify_password(password, &admin.password_hash) {
        Ok(true) => Some(admin),
        Ok(false) => {
            warn!(username, admin_id = %admin.id, "login invalid password");
            None
        }
        Err(e) => {
            error!(error = %e, admin_id = %admin.id, "verify_password failed");
            None
        }
    }
}

/// Creates the admin or resets its password.
pub async fn ensure_admin(repo: &dyn AdminRepo, username: &str, password: &str) -> anyhow::Result<Admin> {
    let hash = hash_password(password)?;
    let admin = repo.upsert(username, &hash).await?;
    info!(admin_id = %admin.id, username, "admin account ensured");
    Ok(admin)
}
