use serde::{Deserialize, Serialize};

use crate::models::{ActivationEvent, ContextEdge, EdgeType, Objective};
use crate::snapshot::FocusSnapshot;

/// One request to the control loop, as read from the host's JSON-lines feed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Activation(ActivationEvent),
    #[serde(rename_all = "camelCase")]
    SetObjective { text: String },
    Pause,
    Resume,
    Complete,
    Abandon,
    ResumeWork,
    TakeBreak,
    Key { key: String },
    StartMonitoring,
    StopMonitoring,
    Suspend,
    LinkScreenshot { filename: String },
    LinkClipboard { hash: String },
    #[serde(rename_all = "camelCase")]
    LinkNote { note_id: String },
    #[serde(rename_all = "camelCase")]
    LinkContexts {
        from: String,
        to: String,
        edge_type: EdgeType,
    },
    Snapshot {
        #[serde(default)]
        hours: Option<i64>,
    },
    Shutdown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Activation(_) => "activation",
            Command::SetObjective { .. } => "setObjective",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Complete => "complete",
            Command::Abandon => "abandon",
            Command::ResumeWork => "resumeWork",
            Command::TakeBreak => "takeBreak",
            Command::Key { .. } => "key",
            Command::StartMonitoring => "startMonitoring",
            Command::StopMonitoring => "stopMonitoring",
            Command::Suspend => "suspend",
            Command::LinkScreenshot { .. } => "linkScreenshot",
            Command::LinkClipboard { .. } => "linkClipboard",
            Command::LinkNote { .. } => "linkNote",
            Command::LinkContexts { .. } => "linkContexts",
            Command::Snapshot { .. } => "snapshot",
            Command::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum Reply {
    /// Whether the command changed anything.
    Ack { accepted: bool },
    ObjectiveStarted { objective: Objective },
    ContextLinked { edge: Option<ContextEdge> },
    Snapshot { snapshot: Box<FocusSnapshot> },
    ShuttingDown,
}

impl Reply {
    pub fn accepted(&self) -> bool {
        match self {
            Reply::Ack { accepted } => *accepted,
            Reply::ContextLinked { edge } => edge.is_some(),
            Reply::ObjectiveStarted { .. } | Reply::Snapshot { .. } | Reply::ShuttingDown => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_lines_commands() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"setObjective","text":"Fix auth bug"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SetObjective {
                text: "Fix auth bug".into()
            }
        );

        let cmd: Command = serde_json::from_str(
            r#"{"command":"activation","timestamp":"2026-03-02T09:00:00Z","appId":"com.apple.dt.Xcode","appName":"Xcode"}"#,
        )
        .unwrap();
        match cmd {
            Command::Activation(event) => assert_eq!(event.app_name(), Some("Xcode")),
            other => panic!("unexpected {other:?}"),
        }

        let cmd: Command = serde_json::from_str(r#"{"command":"snapshot"}"#).unwrap();
        assert_eq!(cmd, Command::Snapshot { hours: None });
        assert_eq!(cmd.name(), "snapshot");
    }

    #[test]
    fn link_contexts_takes_edge_type() {
        let cmd: Command = serde_json::from_str(
            r#"{"command":"linkContexts","from":"a","to":"b","edgeType":"parentChild"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::LinkContexts {
                from: "a".into(),
                to: "b".into(),
                edge_type: EdgeType::ParentChild,
            }
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"command":"explode"}"#).is_err());
    }
}
