use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, invalid_data, parse_datetime, to_i64},
};
use crate::models::DistractionOutcome;

fn row_to_outcome(row: &Row) -> Result<DistractionOutcome, rusqlite::Error> {
    let started_at: String = row.get("started_at")?;
    let resolved_at: String = row.get("resolved_at")?;

    Ok(DistractionOutcome {
        id: row.get("id")?,
        objective_id: row.get("objective_id")?,
        objective_text: row.get("objective_text")?,
        app_name: row.get("app_name")?,
        started_at: parse_datetime(&started_at, "started_at").map_err(invalid_data)?,
        resolved_at: parse_datetime(&resolved_at, "resolved_at").map_err(invalid_data)?,
        duration_secs: row.get("duration_secs")?,
        recovered: row.get::<_, i64>("recovered")? != 0,
    })
}

pub fn insert_distraction_outcome(conn: &Connection, outcome: &DistractionOutcome) -> Result<()> {
    conn.execute(
        "INSERT INTO distraction_log (
            id,
            objective_id,
            objective_text,
            app_name,
            started_at,
            resolved_at,
            duration_secs,
            recovered
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            outcome.id,
            outcome.objective_id,
            outcome.objective_text,
            outcome.app_name,
            format_datetime(&outcome.started_at),
            format_datetime(&outcome.resolved_at),
            outcome.duration_secs,
            outcome.recovered as i64,
        ],
    )
    .with_context(|| "failed to append distraction outcome")?;
    Ok(())
}

impl Database {
    /// Most recently resolved first.
    pub async fn list_distraction_outcomes(&self, limit: usize) -> Result<Vec<DistractionOutcome>> {
        let limit = to_i64(limit as u64)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    objective_id,
                    objective_text,
                    app_name,
                    started_at,
                    resolved_at,
                    duration_secs,
                    recovered
                FROM distraction_log
                ORDER BY resolved_at DESC
                LIMIT ?1",
            )?;

            let outcomes = stmt
                .query_map(params![limit], row_to_outcome)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(outcomes)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistractionEvent;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn outcomes_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let event = DistractionEvent {
            distraction_app: "Twitter".into(),
            objective_text: "Fix auth bug".into(),
            start_time: start,
        };

        let first = DistractionOutcome::resolve(&event, None, start + Duration::seconds(30), true);
        let second = DistractionOutcome::resolve(
            &event,
            Some("obj-1".into()),
            start + Duration::minutes(5),
            false,
        );
        let (a, b) = (first.clone(), second.clone());
        db.execute(move |conn| {
            insert_distraction_outcome(conn, &a)?;
            insert_distraction_outcome(conn, &b)
        })
        .await
        .unwrap();

        let outcomes = db.list_distraction_outcomes(10).await.unwrap();
        assert_eq!(outcomes, vec![second, first]);
        assert_eq!(outcomes[1].duration_secs, 30);
    }
}
