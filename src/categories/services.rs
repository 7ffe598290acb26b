use tracing::{info, warn};
use uuid::Uuid;

use super::{dto::CategoryRequest, repo::CategoryRepo, repo_types::Category};
use crate::{error::{ApiError, StoreError}, posts::repo::PostRepo};

const DUPLICATE_NAME: &str = "A category with this name already exists.";
const STILL_USED: &str = "This category cannot be deleted because posts still use it.";

struct ValidCategory {
    name: String,
    description: Option<String>,
}

fn validate(body: CategoryRequest) -> Result<ValidCategory, ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Category name is required.".into()));
    }
    let description = body
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    Ok(ValidCategory { name, description })
}

fn map_write_error(e: StoreError, action: &str) -> ApiError {
    match e {
        StoreError::UniqueViolation(_) => ApiError::Conflict(DUPLICATE_NAME.into()),
        other => ApiError::internal(format!("Failed to {action} category."), other),
    }
}

pub async fn create_category(repo: &dyn CategoryRepo, body: CategoryRequest) -> Result<Category, ApiError> {
    let v = validate(body)?;
    let category = repo
        .create(&v.name, v.description.as_deref())
        .await
        .map_err(|e| map_write_error(e, "create"))?;
    info!(category_id = %category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn update_category(
    repo: &dyn CategoryRepo,
    id: Uuid,
    body: CategoryRequest,
) -> Result<Category, ApiError> {
    let v = validate(body)?;
    let category = repo
        .update(id, &v.name, v.description.as_deref())
        .await
        .map_err(|e| map_write_error(e, "update"))?
        .ok_or_else(|| ApiError::NotFound("Category not found.".into()))?;
    info!(category_id = %category.id, "category updated");
    Ok(category)
}

/// Deletes a category that no post references.
pub async fn delete_category(
    categories: &dyn CategoryRepo,
    posts: &dyn PostRepo,
    id: Uuid,
) -> Result<(), ApiError> {
    let referenced = posts
        .any_in_category(id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete category.", e))?;
    if referenced {
        warn!(category_id = %id, "category still referenced by posts");
        return Err(ApiError::Conflict(STILL_USED.into()));
    }

    // a post may have been attached since the check; the FK still refuses
    let deleted = categories.delete(id).await.map_err(|e| match e {
        StoreError::ForeignKeyViolation(_) => {
            warn!(category_id = %id, "category referenced by a concurrent post");
            ApiError::Conflict(STILL_USED.into())
        }
        other => ApiError::internal("Failed to delete category.", other),
    })?;
    if !deleted {
        return Err(ApiError::NotFound("Category not found.".into()));
    }
    info!(category_id = %id, "category deleted");
    Ok(())
}
