use sqlx::SqlitePool;

use crate::{
    structs::{Campaign, CampaignStatus, NewCampaign, DEADLINE_FORMAT},
    utils::{now_timestamp, MAX_AMOUNT_PAISE},
};

pub async fn create_campaign(pool: &SqlitePool, new: NewCampaign) -> Result<Campaign, sqlx::Error> {
    let campaign = sqlx::query_as::<_, Campaign>(
        "INSERT INTO campaigns (title, description, image_link, target_amount, current_amount, upi_id, deadline, status, user_id, user_name, created_at) \
         VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(new.title)
    .bind(new.description)
    .bind(new.image_link)
    .bind(new.target_amount)
    .bind(new.upi_id)
    .bind(new.deadline.format(DEADLINE_FORMAT).to_string())
    .bind(CampaignStatus::Pending)
    .bind(new.user_id)
    .bind(new.user_name)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("Campaign {} created by {}", campaign.id, campaign.user_id);
    Ok(campaign)
}

pub async fn get_campaign(pool: &SqlitePool, id: i64) -> Result<Option<Campaign>, sqlx::Error> {
    sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Approved campaigns whose title contains `search`, ignoring case.
pub async fn list_approved(pool: &SqlitePool, search: &str) -> Result<Vec<Campaign>, sqlx::Error> {
    sqlx::query_as::<_, Campaign>(
        "SELECT * FROM campaigns WHERE status = $1 AND instr(lower(title), lower($2)) > 0 ORDER BY id DESC",
    )
    .bind(CampaignStatus::Approved)
    .bind(search.trim())
    .fetch_all(pool)
    .await
}

/// Every campaign, pending ones first, then approved.
pub async fn list_for_review(pool: &SqlitePool) -> Result<Vec<Campaign>, sqlx::Error> {
    let mut campaigns = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns ORDER BY id")
        .fetch_all(pool)
        .await?;
    campaigns.sort_by_key(|c| (c.status.review_rank(), c.id));
    Ok(campaigns)
}

pub async fn count_campaigns(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    super::count(pool, "SELECT COUNT(*) FROM campaigns").await
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: CampaignStatus,
) -> Result<Option<Campaign>, sqlx::Error> {
    let campaign = sqlx::query_as::<_, Campaign>(
        "UPDATE campaigns SET status = $1 WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    if campaign.is_some() {
        log::info!("Campaign {} is now {:?}", id, status);
    }
    Ok(campaign)
}

/// Deletes the row and hands it back so the caller can clean up its image.
pub async fn delete_campaign(pool: &SqlitePool, id: i64) -> Result<Option<Campaign>, sqlx::Error> {
    let campaign = sqlx::query_as::<_, Campaign>("DELETE FROM campaigns WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    if campaign.is_some() {
        log::info!("Campaign with id {} deleted", id);
    }
    Ok(campaign)
}

/// Adds `amount` paise to an approved campaign whose deadline (`today` as
/// `YYYY-MM-DD`) has not passed and whose total stays within
/// `MAX_AMOUNT_PAISE`. One statement, so concurrent contributions all land.
pub async fn add_contribution(
    pool: &SqlitePool,
    id: i64,
    amount: i64,
    today: &str,
) -> Result<Option<Campaign>, sqlx::Error> {
    sqlx::query_as::<_, Campaign>(
        "UPDATE campaigns SET current_amount = current_amount + $1 \
         WHERE id = $2 AND status = $3 AND deadline >= $4 AND current_amount <= $5 - $1 \
         RETURNING *",
    )
    .bind(amount)
    .bind(id)
    .bind(CampaignStatus::Approved)
    .bind(today)
    .bind(MAX_AMOUNT_PAISE)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
pub(crate) fn new_campaign(user_id: &str, title: &str) -> NewCampaign {
    NewCampaign {
        title: title.to_owned(),
        description: "Support treatment costs".to_owned(),
        image_link: format!("/uploads/campaigns/{}", crate::utils::sanitize_file_name(title)),
        target_amount: 5_000_000,
        upi_id: "fund@okaxis".to_owned(),
        deadline: chrono::NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
        user_id: user_id.to_owned(),
        user_name: "asha".to_owned(),
    }
}
