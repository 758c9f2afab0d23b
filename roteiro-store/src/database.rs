use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{error, info};
use serde_json::Value;

use roteiro_core::CoreError;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overrides file-based rules with rows stored as `{"value": ...}`.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_rows(defaults, rows))
    }
}

fn apply_rule_rows(mut rules: BusinessRules, rows: Vec<(String, Value)>) -> BusinessRules {
    for (key, value) in rows {
        let Some(v) = value.get("value") else { continue };
        match key.as_str() {
            "seat_hold_seconds" => {
                if let Some(u) = v.as_u64() {
                    rules.seat_hold_seconds = u;
                }
            }
            "rate_limit_per_minute" => {
                if let Some(i) = v.as_i64() {
                    rules.rate_limit_per_minute = i;
                }
            }
            "default_commission_rate" => {
                if let Some(i) = v.as_i64().and_then(|i| i32::try_from(i).ok()) {
                    rules.default_commission_rate = i;
                }
            }
            _ => {}
        }
    }
    rules
}

/// Unique and foreign-key violations become `Conflict`; everything else is internal.
pub(crate) fn db_error(context: &str, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return CoreError::Conflict(format!("{context}: {}", db.message()));
        }
    }
    error!("{} failed: {}", context, err);
    CoreError::InternalError(format!("{context}: {err}"))
}

pub(crate) fn corrupt(column: &str, value: &str) -> CoreError {
    CoreError::InternalError(format!("unexpected {column} value '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_rules_override_defaults() {
        let rules = apply_rule_rows(
            BusinessRules::default(),
            vec![
                ("seat_hold_seconds".into(), json!({ "value": 120 })),
                ("default_commission_rate".into(), json!({ "value": 8 })),
                ("rate_limit_per_minute".into(), json!({ "nope": 1 })),
                ("unknown".into(), json!({ "value": true })),
            ],
        );
        assert_eq!(rules.seat_hold_seconds, 120);
        assert_eq!(rules.default_commission_rate, 8);
        assert_eq!(rules.rate_limit_per_minute, 120);
    }
}
