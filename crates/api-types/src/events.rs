use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{Comment, Review};

/// Events a connected client may send over the realtime channel.
#[derive(Debug, Clone, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinPr { project_id: Uuid, pr_number: i64 },
    LeavePr { project_id: Uuid, pr_number: i64 },
}

/// Events the server fans out to a pull-request room.
///
/// The originator of a write receives the same event as everyone else in the
/// room; the broadcast stream is the single source of truth for the UI.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    RoomJoined {
        room: String,
        client_count: usize,
    },
    CommentAdded {
        comment: Comment,
    },
    CommentUpdated {
        comment: Comment,
    },
    CommentDeleted {
        comment_id: Uuid,
        project_id: Uuid,
        pr_number: i64,
    },
    ReviewSubmitted {
        review: Review,
    },
}
