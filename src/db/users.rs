use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    structs::{NewUser, User},
    utils::now_timestamp,
};

pub async fn create_user(pool: &SqlitePool, new: NewUser) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (user_id, user_name, email, phone_number, location, user_type, pwd_hash, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(new.user_name)
    .bind(new.email)
    .bind(new.phone_number)
    .bind(new.location)
    .bind(new.user_type)
    .bind(new.pwd_hash)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("User created: {} ({:?})", user.user_id, user.user_type);
    Ok(user)
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Regular users registered in `location`.
pub async fn list_regular_users_in(
    pool: &SqlitePool,
    location: &str,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE location = $1 AND user_type <> 'admin' ORDER BY user_name",
    )
    .bind(location)
    .fetch_all(pool)
    .await
}

pub async fn count_regular_users(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    super::count(pool, "SELECT COUNT(*) FROM users WHERE user_type <> 'admin'").await
}

/// Deletes a regular user. Their campaigns, doctor record and posts go with
/// them through the cascade. Admin rows are left alone.
///
/// Returns the stored image links those rows pointed at, or `None` when no
/// row went away.
pub async fn delete_regular_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Vec<String>>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let links: Vec<String> = sqlx::query_scalar(
        "SELECT image_link FROM campaigns WHERE user_id = $1 \
         UNION ALL SELECT id_card_link FROM doctors WHERE user_id = $1 \
         UNION ALL SELECT image_link FROM posts WHERE user_id = $1 AND image_link IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1 AND user_type <> 'admin'")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    tx.commit().await?;
    log::info!("User with id {} deleted ({} stored images)", user_id, links.len());
    Ok(Some(links))
}

#[cfg(test)]
pub(crate) fn new_user(name: &str, location: &str, user_type: crate::structs::UserType) -> NewUser {
    NewUser {
        user_name: name.to_owned(),
        email: format!("{}@example.org", name.to_lowercase()),
        phone_number: "9876543210".to_owned(),
        location: location.to_owned(),
        user_type,
        pwd_hash: "unused".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memory_pool, errors::is_unique_violation, structs::UserType};

    #[actix_web::test]
    async fn emails_are_unique() {
        let pool = memory_pool().await;
        create_user(&pool, new_user("asha", "Noida", UserType::Regular)).await.unwrap();
        let err = create_user(&pool, new_user("asha", "Delhi", UserType::Regular))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[actix_web::test]
    async fn location_listing_skips_admins_and_other_cities() {
        let pool = memory_pool().await;
        let admin = create_user(&pool, new_user("root", "Noida", UserType::Admin)).await.unwrap();
        create_user(&pool, new_user("asha", "Noida", UserType::Regular)).await.unwrap();
        create_user(&pool, new_user("ravi", "Delhi", UserType::Regular)).await.unwrap();

        let local = list_regular_users_in(&pool, "Noida").await.unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].user_name, "asha");
        assert_eq!(count_regular_users(&pool).await.unwrap(), 2);

        assert!(delete_regular_user(&pool, &admin.user_id).await.unwrap().is_none());
        assert!(get_user_by_id(&pool, &admin.user_id).await.unwrap().is_some());
        let links = delete_regular_user(&pool, &local[0].user_id).await.unwrap();
        assert_eq!(links, Some(Vec::new()));
        assert!(get_user_by_email(&pool, "asha@example.org").await.unwrap().is_none());
    }
}
