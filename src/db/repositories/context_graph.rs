use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{
        decode_set, encode_set, format_datetime, format_optional_datetime, invalid_data,
        parse_context_type, parse_datetime, parse_edge_type, parse_optional_datetime, to_i64,
        to_u64,
    },
};
use crate::models::{ContextEdge, ContextNode};

const NODE_COLUMNS: &str = "id, context_type, label, start_time, end_time, last_event_at, focus_score, event_count, apps_json, window_titles_json, clipboard_hashes_json, screenshot_filenames_json, note_ids_json";

/// A node as stored, with the time of the last event folded into it.
#[derive(Debug, Clone)]
pub struct StoredContextNode {
    pub node: ContextNode,
    pub last_event_at: DateTime<Utc>,
}

fn row_to_node(row: &Row) -> Result<StoredContextNode, rusqlite::Error> {
    let context_type: String = row.get("context_type")?;
    let start_time: String = row.get("start_time")?;
    let last_event_at: String = row.get("last_event_at")?;
    let apps: String = row.get("apps_json")?;
    let titles: String = row.get("window_titles_json")?;
    let clipboard: String = row.get("clipboard_hashes_json")?;
    let screenshots: String = row.get("screenshot_filenames_json")?;
    let notes: String = row.get("note_ids_json")?;

    let node = ContextNode {
        id: row.get("id")?,
        context_type: parse_context_type(&context_type).map_err(invalid_data)?,
        label: row.get("label")?,
        start_time: parse_datetime(&start_time, "start_time").map_err(invalid_data)?,
        end_time: parse_optional_datetime(row.get("end_time")?, "end_time")
            .map_err(invalid_data)?,
        focus_score: row.get("focus_score")?,
        event_count: to_u64(row.get("event_count")?, "event_count").map_err(invalid_data)?,
        apps: decode_set(&apps, "apps_json").map_err(invalid_data)?,
        window_titles: decode_set(&titles, "window_titles_json").map_err(invalid_data)?,
        clipboard_item_hashes: decode_set(&clipboard, "clipboard_hashes_json")
            .map_err(invalid_data)?,
        screenshot_filenames: decode_set(&screenshots, "screenshot_filenames_json")
            .map_err(invalid_data)?,
        note_ids: decode_set(&notes, "note_ids_json").map_err(invalid_data)?,
    };

    Ok(StoredContextNode {
        node,
        last_event_at: parse_datetime(&last_event_at, "last_event_at").map_err(invalid_data)?,
    })
}

fn row_to_edge(row: &Row) -> Result<ContextEdge, rusqlite::Error> {
    let edge_type: String = row.get("edge_type")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(ContextEdge {
        id: row.get("id")?,
        from_context_id: row.get("from_context_id")?,
        to_context_id: row.get("to_context_id")?,
        edge_type: parse_edge_type(&edge_type).map_err(invalid_data)?,
        timestamp: parse_datetime(&timestamp, "timestamp").map_err(invalid_data)?,
    })
}

pub fn upsert_context_node(
    conn: &Connection,
    node: &ContextNode,
    last_event_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO context_nodes ({NODE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            node.id,
            node.context_type.as_str(),
            node.label,
            format_datetime(&node.start_time),
            format_optional_datetime(node.end_time.as_ref()),
            format_datetime(&last_event_at),
            node.focus_score,
            to_i64(node.event_count)?,
            encode_set(&node.apps)?,
            encode_set(&node.window_titles)?,
            encode_set(&node.clipboard_item_hashes)?,
            encode_set(&node.screenshot_filenames)?,
            encode_set(&node.note_ids)?,
        ],
    )
    .with_context(|| format!("failed to save context node {}", node.id))?;
    Ok(())
}

pub fn insert_context_edge(conn: &Connection, edge: &ContextEdge) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO context_edges (id, from_context_id, to_context_id, edge_type, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            edge.id,
            edge.from_context_id,
            edge.to_context_id,
            edge.edge_type.as_str(),
            format_datetime(&edge.timestamp),
        ],
    )
    .with_context(|| format!("failed to save context edge {}", edge.id))?;
    Ok(())
}

impl Database {
    /// Nodes still open or ending at/after `since`, oldest first.
    pub async fn get_context_nodes_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredContextNode>> {
        let since = format_datetime(&since);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NODE_COLUMNS}
                 FROM context_nodes
                 WHERE end_time IS NULL OR end_time >= ?1
                 ORDER BY start_time ASC"
            ))?;

            let nodes = stmt
                .query_map(params![since], row_to_node)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(nodes)
        })
        .await
    }

    pub async fn get_open_context_nodes(&self) -> Result<Vec<StoredContextNode>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NODE_COLUMNS}
                 FROM context_nodes
                 WHERE end_time IS NULL
                 ORDER BY start_time ASC"
            ))?;

            let nodes = stmt
                .query_map([], row_to_node)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(nodes)
        })
        .await
    }

    pub async fn get_context_edges_since(&self, since: DateTime<Utc>) -> Result<Vec<ContextEdge>> {
        let since = format_datetime(&since);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, from_context_id, to_context_id, edge_type, timestamp
                 FROM context_edges
                 WHERE timestamp >= ?1
                 ORDER BY timestamp ASC",
            )?;

            let edges = stmt
                .query_map(params![since], row_to_edge)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })
        .await
    }
}
