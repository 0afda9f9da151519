use sqlx::SqlitePool;

use crate::{
    structs::{Doctor, NewDoctor, VerificationStatus},
    utils::now_timestamp,
};

pub async fn create_doctor(pool: &SqlitePool, new: NewDoctor) -> Result<Doctor, sqlx::Error> {
    let doctor = sqlx::query_as::<_, Doctor>(
        "INSERT INTO doctors (user_id, user_name, hospital, location, id_card_link, authenticated, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.user_name)
    .bind(new.hospital)
    .bind(new.location)
    .bind(new.id_card_link)
    .bind(VerificationStatus::Pending)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("Doctor record {} submitted for verification", doctor.id);
    Ok(doctor)
}

pub async fn get_by_user(pool: &SqlitePool, user_id: &str) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_doctors(pool: &SqlitePool) -> Result<Vec<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn count_doctors(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    super::count(pool, "SELECT COUNT(*) FROM doctors").await
}

pub async fn verify_doctor(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE doctors SET authenticated = $1 WHERE id = $2")
        .bind(VerificationStatus::Verified)
        .bind(id)
        .execute(pool)
        .await?;
    let verified = result.rows_affected() > 0;
    if verified {
        log::info!("Doctor {} verified", id);
    }
    Ok(verified)
}

pub async fn delete_doctor(pool: &SqlitePool, id: i64) -> Result<Option<Doctor>, sqlx::Error> {
    let doctor = sqlx::query_as::<_, Doctor>("DELETE FROM doctors WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    if doctor.is_some() {
        log::info!("Doctor with id {} deleted", id);
    }
    Ok(doctor)
}

#[cfg(test)]
pub(crate) fn new_doctor(user_id: &str) -> NewDoctor {
    NewDoctor {
        user_id: user_id.to_owned(),
        user_name: "dr_rao".to_owned(),
        hospital: "Sharda Hospital".to_owned(),
        location: "Greater Noida".to_owned(),
        id_card_link: "/uploads/doctorImages/dr_rao_card_png".to_owned(),
    }
}
