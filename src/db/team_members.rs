//! Team member mirror

use serde_json::Value;
use sqlx::PgPool;

use crate::provider::types::TeamMember;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn upsert_one(
    pool: &PgPool,
    merchant_id: &str,
    raw: &Value,
    now: i64,
) -> Result<(), BoxError> {
    let member: TeamMember = serde_json::from_value(raw.clone())?;

    sqlx::query(
        r#"
        INSERT INTO team_members (
            merchant_id, team_member_id, given_name, family_name,
            email_address, status, is_owner, assigned_locations,
            raw_data, synced_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (merchant_id, team_member_id)
        DO UPDATE SET given_name = EXCLUDED.given_name,
                      family_name = EXCLUDED.family_name,
                      email_address = EXCLUDED.email_address,
                      status = EXCLUDED.status,
                      is_owner = EXCLUDED.is_owner,
                      assigned_locations = EXCLUDED.assigned_locations,
                      raw_data = EXCLUDED.raw_data,
                      synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(merchant_id)
    .bind(&member.id)
    .bind(&member.given_name)
    .bind(&member.family_name)
    .bind(&member.email_address)
    .bind(&member.status)
    .bind(member.is_owner)
    .bind(&member.assigned_locations)
    .bind(raw)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}
