use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{
        format_datetime, format_optional_datetime, invalid_data, parse_datetime,
        parse_end_reason, parse_optional_datetime, to_i64, to_u64,
    },
};
use crate::models::{EndReason, Objective};

const OBJECTIVE_COLUMNS: &str = "id, text, start_time, end_time, end_reason, is_paused, pause_start_time, total_paused_ms";

fn row_to_objective(row: &Row) -> Result<Objective, rusqlite::Error> {
    let start_time: String = row.get("start_time")?;

    Ok(Objective {
        id: row.get("id")?,
        text: row.get("text")?,
        start_time: parse_datetime(&start_time, "start_time").map_err(invalid_data)?,
        end_time: parse_optional_datetime(row.get("end_time")?, "end_time")
            .map_err(invalid_data)?,
        end_reason: parse_end_reason(row.get("end_reason")?).map_err(invalid_data)?,
        is_paused: row.get::<_, i64>("is_paused")? != 0,
        pause_start_time: parse_optional_datetime(row.get("pause_start_time")?, "pause_start_time")
            .map_err(invalid_data)?,
        total_paused_ms: to_u64(row.get("total_paused_ms")?, "total_paused_ms")
            .map_err(invalid_data)?,
    })
}

/// Insert or overwrite the row for `objective`.
pub fn upsert_objective(conn: &Connection, objective: &Objective) -> Result<()> {
    conn.execute(
        "INSERT INTO objectives (id, text, start_time, end_time, end_reason, is_paused, pause_start_time, total_paused_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
             text = excluded.text,
             end_time = excluded.end_time,
             end_reason = excluded.end_reason,
             is_paused = excluded.is_paused,
             pause_start_time = excluded.pause_start_time,
             total_paused_ms = excluded.total_paused_ms",
        params![
            objective.id,
            objective.text,
            format_datetime(&objective.start_time),
            format_optional_datetime(objective.end_time.as_ref()),
            objective.end_reason.map(|reason| reason.as_str()),
            objective.is_paused as i64,
            format_optional_datetime(objective.pause_start_time.as_ref()),
            to_i64(objective.total_paused_ms)?,
        ],
    )
    .with_context(|| format!("failed to save objective {}", objective.id))?;
    Ok(())
}

impl Database {
    /// Open rows, most recent first. More than one only happens after a crash.
    pub async fn get_open_objectives(&self) -> Result<Vec<Objective>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OBJECTIVE_COLUMNS}
                 FROM objectives
                 WHERE end_time IS NULL
                 ORDER BY start_time DESC"
            ))?;

            let objectives = stmt
                .query_map([], row_to_objective)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(objectives)
        })
        .await
    }

    /// Ended rows, most recently ended first.
    pub async fn list_ended_objectives(&self, limit: usize) -> Result<Vec<Objective>> {
        let limit = to_i64(limit as u64)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OBJECTIVE_COLUMNS}
                 FROM objectives
                 WHERE end_time IS NOT NULL
                 ORDER BY end_time DESC
                 LIMIT ?1"
            ))?;

            let objectives = stmt
                .query_map(params![limit], row_to_objective)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(objectives)
        })
        .await
    }

    pub async fn get_objective(&self, id: &str) -> Result<Option<Objective>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let objective = conn
                .query_row(
                    &format!("SELECT {OBJECTIVE_COLUMNS} FROM objectives WHERE id = ?1"),
                    params![id],
                    row_to_objective,
                )
                .optional()?;
            Ok(objective)
        })
        .await
    }

    pub async fn end_objective(
        &self,
        id: &str,
        reason: EndReason,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE objectives
                 SET end_time = ?1,
                     end_reason = ?2,
                     is_paused = 0,
                     pause_start_time = NULL
                 WHERE id = ?3 AND end_time IS NULL",
                params![format_datetime(&ended_at), reason.as_str(), id],
            )
            .with_context(|| "failed to end objective")?;
            Ok(())
        })
        .await
    }
}
