use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use crate::db::entities::user;

// --- User Service Functions ---

/// Existence checks the user validators need.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether any user already has exactly this email.
    async fn email_in_use(&self, email: &str) -> Result<bool, DbErr>;
    async fn username_in_use(&self, username: &str) -> Result<bool, DbErr>;
}

#[async_trait]
impl UserDirectory for DatabaseConnection {
    async fn email_in_use(&self, email: &str) -> Result<bool, DbErr> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(self)
            .await?;
        Ok(count > 0)
    }

    async fn username_in_use(&self, username: &str) -> Result<bool, DbErr> {
        let count = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(self)
            .await?;
        Ok(count > 0)
    }
}

/// Inserts a new active user with an already hashed password.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    password_hash: &str,
) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        password_hash: Set(password_hash.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_user.insert(db).await
}

pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
}
