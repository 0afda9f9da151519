use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Regular,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub user_type: UserType,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub user_type: UserType,
    pub pwd_hash: String,
}

/// Approval state of a campaign. Admins walk it forward one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Approved,
    Takedown,
}

impl CampaignStatus {
    /// The status an admin action moves to, `None` once taken down.
    pub fn next(self) -> Option<CampaignStatus> {
        match self {
            CampaignStatus::Pending => Some(CampaignStatus::Approved),
            CampaignStatus::Approved => Some(CampaignStatus::Takedown),
            CampaignStatus::Takedown => None,
        }
    }

    /// Sort key for the admin listing: pending first, then approved.
    pub fn review_rank(self) -> u8 {
        match self {
            CampaignStatus::Pending => 0,
            CampaignStatus::Approved => 1,
            CampaignStatus::Takedown => 2,
        }
    }
}

/// Amounts are integer paise.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Campaign {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_link: String,
    pub target_amount: i64,
    pub current_amount: i64,
    pub upi_id: String,
    pub deadline: String,
    pub status: CampaignStatus,
    pub user_id: String,
    pub user_name: String,
    pub created_at: String,
}

impl Campaign {
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.deadline, DEADLINE_FORMAT).ok()
    }

    /// Whole days until the deadline, clamped at zero.
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        self.deadline_date()
            .map(|deadline| (deadline - today).num_days().max(0))
            .unwrap_or(0)
    }

    pub fn accepts_funds(&self, today: NaiveDate) -> bool {
        self.status == CampaignStatus::Approved
            && self.deadline_date().is_some_and(|deadline| deadline >= today)
    }

    /// Share of the target raised so far, clamped to `0..=100`.
    pub fn progress_percent(&self) -> i64 {
        if self.target_amount <= 0 {
            return 0;
        }
        let percent = i128::from(self.current_amount) * 100 / i128::from(self.target_amount);
        percent.clamp(0, 100) as i64
    }
}

pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub image_link: String,
    pub target_amount: i64,
    pub upi_id: String,
    pub deadline: NaiveDate,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Doctor {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub hospital: String,
    pub location: String,
    pub id_card_link: String,
    pub authenticated: VerificationStatus,
    pub created_at: String,
}

impl Doctor {
    pub fn is_verified(&self) -> bool {
        self.authenticated == VerificationStatus::Verified
    }
}

pub struct NewDoctor {
    pub user_id: String,
    pub user_name: String,
    pub hospital: String,
    pub location: String,
    pub id_card_link: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub content: String,
    pub location: String,
    pub image_link: Option<String>,
    pub created_at: String,
}

pub struct NewPost {
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub content: String,
    pub location: String,
    pub image_link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AlertLevel {
    Moderate,
    High,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Alert {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub message: String,
    pub level: AlertLevel,
    pub created_at: String,
}

pub struct NewAlert {
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub message: String,
    pub level: AlertLevel,
}

/// A row of the hospital inventory.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Resource {
    pub id: i64,
    pub hospital: String,
    pub location: String,
    pub icu_beds: i64,
    pub normal_beds: i64,
    pub ventilators: i64,
    pub updated_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ResourceInput {
    pub hospital: String,
    pub location: String,
    pub icu_beds: i64,
    pub normal_beds: i64,
    pub ventilators: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceField {
    #[default]
    Hospital,
    Location,
}
