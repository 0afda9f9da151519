use sqlx::SqlitePool;

use crate::{
    structs::{Alert, NewAlert},
    utils::now_timestamp,
};

pub async fn create_alert(pool: &SqlitePool, new: NewAlert) -> Result<Alert, sqlx::Error> {
    let alert = sqlx::query_as::<_, Alert>(
        "INSERT INTO alerts (user_id, user_name, title, message, level, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.user_name)
    .bind(new.title)
    .bind(new.message)
    .bind(new.level)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("Alert {} raised ({:?})", alert.id, alert.level);
    Ok(alert)
}

pub async fn list_alerts(pool: &SqlitePool) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>("SELECT * FROM alerts ORDER BY id ASC")
        .fetch_all(pool)
        .await
}

/// The `limit` most recent alerts, newest first.
pub async fn latest_alerts(pool: &SqlitePool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>("SELECT * FROM alerts ORDER BY id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn count_alerts(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    super::count(pool, "SELECT COUNT(*) FROM alerts").await
}

pub async fn delete_alert(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM alerts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memory_pool, structs::AlertLevel};

    fn alert(title: &str, level: AlertLevel) -> NewAlert {
        NewAlert {
            user_id: "admin-1".to_owned(),
            user_name: "root".to_owned(),
            title: title.to_owned(),
            message: "Boil drinking water".to_owned(),
            level,
        }
    }

    #[actix_web::test]
    async fn ids_keep_growing_after_deletes() {
        let pool = memory_pool().await;
        let first = create_alert(&pool, alert("Cholera", AlertLevel::High)).await.unwrap();
        let second = create_alert(&pool, alert("Heat", AlertLevel::Moderate)).await.unwrap();
        assert!(delete_alert(&pool, second.id).await.unwrap());
        assert!(!delete_alert(&pool, second.id).await.unwrap());

        let third = create_alert(&pool, alert("Smog", AlertLevel::Moderate)).await.unwrap();
        assert!(third.id > second.id);

        let ids: Vec<i64> = list_alerts(&pool).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);
        let latest = latest_alerts(&pool, 1).await.unwrap();
        assert_eq!(latest[0].title, "Smog");
        assert_eq!(count_alerts(&pool).await.unwrap(), 2);
    }
}
