use sqlx::SqlitePool;

use crate::{
    structs::{Resource, ResourceField, ResourceInput},
    utils::now_timestamp,
};

pub async fn create_resource(
    pool: &SqlitePool,
    input: ResourceInput,
) -> Result<Resource, sqlx::Error> {
    let resource = sqlx::query_as::<_, Resource>(
        "INSERT INTO inventory (hospital, location, icu_beds, normal_beds, ventilators, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(input.hospital)
    .bind(input.location)
    .bind(input.icu_beds)
    .bind(input.normal_beds)
    .bind(input.ventilators)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("Inventory row {} added for {}", resource.id, resource.hospital);
    Ok(resource)
}

pub async fn update_resource(
    pool: &SqlitePool,
    id: i64,
    input: ResourceInput,
) -> Result<Option<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(
        "UPDATE inventory SET hospital = $1, location = $2, icu_beds = $3, normal_beds = $4, ventilators = $5, updated_at = $6 \
         WHERE id = $7 RETURNING *",
    )
    .bind(input.hospital)
    .bind(input.location)
    .bind(input.icu_beds)
    .bind(input.normal_beds)
    .bind(input.ventilators)
    .bind(now_timestamp())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_resource(pool: &SqlitePool, id: i64) -> Result<Option<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>("SELECT * FROM inventory WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_resource(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_resources(pool: &SqlitePool) -> Result<Vec<Resource>, sqlx::Error> {
    search_resources(pool, ResourceField::Hospital, "").await
}

/// Rows whose `field` contains `query`, ignoring case, by id.
pub async fn search_resources(
    pool: &SqlitePool,
    field: ResourceField,
    query: &str,
) -> Result<Vec<Resource>, sqlx::Error> {
    let sql = match field {
        ResourceField::Hospital => {
            "SELECT * FROM inventory WHERE instr(lower(hospital), lower($1)) > 0 ORDER BY id"
        }
        ResourceField::Location => {
            "SELECT * FROM inventory WHERE instr(lower(location), lower($1)) > 0 ORDER BY id"
        }
    };
    sqlx::query_as::<_, Resource>(sql)
        .bind(query.trim())
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn row(hospital: &str, location: &str) -> ResourceInput {
        ResourceInput {
            hospital: hospital.to_owned(),
            location: location.to_owned(),
            icu_beds: 4,
            normal_beds: 30,
            ventilators: 2,
        }
    }

    #[actix_web::test]
    async fn search_by_hospital_or_location() {
        let pool = memory_pool().await;
        create_resource(&pool, row("Sharda Hospital", "Greater Noida")).await.unwrap();
        create_resource(&pool, row("AIIMS", "New Delhi")).await.unwrap();

        let by_name = search_resources(&pool, ResourceField::Hospital, "sharda").await.unwrap();
        assert_eq!(by_name.len(), 1);
        let by_place = search_resources(&pool, ResourceField::Location, "DELHI").await.unwrap();
        assert_eq!(by_place[0].hospital, "AIIMS");
        assert_eq!(list_resources(&pool).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn update_and_delete() {
        let pool = memory_pool().await;
        let created = create_resource(&pool, row("AIIMS", "New Delhi")).await.unwrap();
        let mut changed = row("AIIMS Trauma Centre", "New Delhi");
        changed.icu_beds = 12;
        let updated = update_resource(&pool, created.id, changed).await.unwrap().unwrap();
        assert_eq!(updated.icu_beds, 12);
        assert!(update_resource(&pool, 999, row("x", "y")).await.unwrap().is_none());

        assert!(delete_resource(&pool, created.id).await.unwrap());
        assert!(get_resource(&pool, created.id).await.unwrap().is_none());
        let next = create_resource(&pool, row("Safdarjung", "New Delhi")).await.unwrap();
        assert!(next.id > created.id);
    }
}
