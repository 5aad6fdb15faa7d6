use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{hash_password, verify_password},
    entities::users::{self, Entity as Users, UserRole},
    errors::ServiceError,
    services::{Page, SortOrder},
};

#[derive(Debug, Clone)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: u64,
    pub limit: u64,
}

fn parse_role(raw: &str) -> Result<UserRole, ServiceError> {
    raw.parse().map_err(|_| {
        ServiceError::ValidationError(format!(
            "Invalid role: {raw}. Must be one of: Admin, Manager, Staff"
        ))
    })
}

/// Service for managing user accounts
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterUserInput) -> Result<users::Model, ServiceError> {
        let email = input.email.trim().to_lowercase();
        let role = match input.role.as_deref() {
            Some(raw) => parse_role(raw)?,
            None => UserRole::default(),
        };

        let existing = Users::find()
            .filter(users::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(email.clone()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(role.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = user.insert(&*self.db).await.map_err(|e| {
            ServiceError::conflict_on_unique(e, "A user with this email already exists")
        })?;

        info!(email = %email, "user registered");
        Ok(created)
    }

    /// Verifies credentials for login. The same error covers an unknown
    /// email and a wrong password so the endpoint does not leak which
    /// accounts exist.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<users::Model, ServiceError> {
        let email = email.trim().to_lowercase();
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        let user = match user {
            Some(user) if verify_password(password, &user.password_hash)? => user,
            _ => {
                return Err(ServiceError::Unauthorized(
                    "Invalid email or password".to_string(),
                ))
            }
        };

        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "Your account has been deactivated. Please contact an administrator.".to_string(),
            ));
        }

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<users::Model, ServiceError> {
        Users::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        filter: UserListFilter,
    ) -> Result<(Vec<users::Model>, u64), ServiceError> {
        let page = Page::new(filter.page, filter.limit);
        let order = SortOrder::parse(filter.order.as_deref(), SortOrder::Desc)?;
        let column = sort_column(filter.sort_by.as_deref())?;

        let mut query = Users::find();
        if let Some(role) = filter.role.as_deref() {
            let role = parse_role(role)?;
            query = query.filter(users::Column::Role.eq(role.to_string()));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(users::Column::IsActive.eq(is_active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(users::Column::Name.contains(search))
                    .add(users::Column::Email.contains(search)),
            );
        }

        let total = query.clone().count(&*self.db).await?;
        let items = match order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        }
        .limit(page.limit)
        .offset(page.offset())
        .all(&*self.db)
        .await?;

        Ok((items, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> Result<users::Model, ServiceError> {
        let user = self.get_user(user_id).await?;

        let email = match input.email {
            Some(raw) => {
                let email = raw.trim().to_lowercase();
                if email != user.email {
                    let existing = Users::find()
                        .filter(users::Column::Email.eq(email.clone()))
                        .one(&*self.db)
                        .await?;
                    if existing.is_some() {
                        return Err(ServiceError::Conflict("Email already in use".to_string()));
                    }
                }
                Some(email)
            }
            None => None,
        };

        let role = match input.role.as_deref() {
            Some(raw) => Some(parse_role(raw)?.to_string()),
            None => None,
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Email already in use"))?;

        info!(user_id = %user_id, "user updated");
        Ok(updated)
    }

    /// Soft delete. An administrator cannot remove their own account.
    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, user_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        if user.id == actor_id {
            return Err(ServiceError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "user deactivated");
        Ok(())
    }

    #[instrument(skip(self, current_password, new_password))]
    pub async fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "password updated");
        Ok(())
    }
}

fn sort_column(raw: Option<&str>) -> Result<users::Column, ServiceError> {
    match raw.unwrap_or("created_at") {
        "created_at" => Ok(users::Column::CreatedAt),
        "name" => Ok(users::Column::Name),
        "email" => Ok(users::Column::Email),
        "role" => Ok(users::Column::Role),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid sort field '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(parse_role("Admin").unwrap(), UserRole::Admin);
        assert_eq!(parse_role("Staff").unwrap(), UserRole::Staff);
        assert!(parse_role("Superuser").is_err());
        assert!(parse_role("admin").is_err());
    }
}
