//! Read-only view of the in-memory subject states.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/live` | Every subject, sorted by id |
//! | `GET`  | `/live/{subject_id}` | 404 if not watched |

use axum::{
  Json,
  extract::{Path, State},
};
use livestatus_core::subject::{SubjectId, SubjectState};

use crate::{AppState, LiveService, error::Error};

/// `GET /live`
pub async fn list<L: LiveService>(State(state): State<AppState<L>>) -> Json<Vec<SubjectState>> {
  Json(state.live.snapshots().await)
}

/// `GET /live/{subject_id}`
pub async fn get_one<L: LiveService>(
  State(state): State<AppState<L>>,
  Path(id): Path<String>,
) -> Result<Json<SubjectState>, Error> {
  let id = SubjectId::new(id);
  state
    .live
    .snapshot(&id)
    .await
    .map(Json)
    .ok_or_else(|| Error::NotFound(format!("subject {id}")))
}
