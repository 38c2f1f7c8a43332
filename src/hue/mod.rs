//! Philips Hue: per-user bridge credentials, the cached light list, and the
//! bridge client.

pub mod bridge;

pub use bridge::{BridgeError, BridgeLight, HueBridge};

use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::AppError;
use crate::store::UserId;

/// Rows written from a bridge listing are tagged with this resource type.
pub const LIGHT_RTYPE: &str = "Light";

#[derive(Debug, Clone, Serialize)]
pub struct HueCredentials {
    pub user_id: UserId,
    pub username: String,
    pub clientkey: String,
    pub ip_address: String,
}

#[derive(Debug, Clone)]
pub struct HueLight {
    pub user_id: UserId,
    pub lightname: String,
    pub rid: String,
    pub rtype: String,
}

/// Store bridge credentials, replacing any previous pairing for the user.
pub async fn save_credentials(db: &PgPool, creds: &HueCredentials) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO hue_tokens (user_id, username, clientkey, ip_address)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET
            username = EXCLUDED.username,
            clientkey = EXCLUDED.clientkey,
            ip_address = EXCLUDED.ip_address
        "#,
    )
    .bind(creds.user_id)
    .bind(&creds.username)
    .bind(&creds.clientkey)
    .bind(&creds.ip_address)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn credentials(db: &PgPool, user_id: UserId) -> Result<Option<HueCredentials>, AppError> {
    let row = sqlx::query(
        "SELECT user_id, username, clientkey, ip_address FROM hue_tokens WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| HueCredentials {
        user_id: r.get(0),
        username: r.get(1),
        clientkey: r.get(2),
        ip_address: r.get(3),
    }))
}

/// Upsert every listed light; returns how many rows were written.
pub async fn save_lights(
    db: &PgPool,
    user_id: UserId,
    lights: &[BridgeLight],
) -> Result<usize, AppError> {
    let mut tx = db.begin().await?;
    for light in lights {
        sqlx::query(
            r#"
            INSERT INTO hue_lights (user_id, lightname, rid, rtype)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, rid) DO UPDATE SET
                lightname = EXCLUDED.lightname,
                rtype = EXCLUDED.rtype
            "#,
        )
        .bind(user_id)
        .bind(&light.name)
        .bind(&light.id)
        .bind(LIGHT_RTYPE)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(lights.len())
}

pub async fn find_light(
    db: &PgPool,
    user_id: UserId,
    lightname: &str,
) -> Result<Option<HueLight>, AppError> {
    let row = sqlx::query(
        r#"
        SELECT user_id, lightname, rid, rtype FROM hue_lights
        WHERE user_id = $1 AND lightname = $2
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(lightname)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|r| HueLight {
        user_id: r.get(0),
        lightname: r.get(1),
        rid: r.get(2),
        rtype: r.get(3),
    }))
}
