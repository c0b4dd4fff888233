//! `docflow training`: sessions spawned by completed business cases.

use chrono::{DateTime, Utc};
use docflow_core::models::AddParticipantInput;
use docflow_core::state::AppState;

use super::{fail, not_found, to_json};

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}' (expected RFC 3339): {}", value, e))
}

pub async fn sessions(state: &AppState, business_case_id: i64) -> Result<serde_json::Value, String> {
    let sessions = state
        .training_store
        .list_sessions(business_case_id)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({ "businessCaseId": business_case_id, "sessions": sessions }))
}

pub async fn participants(state: &AppState, session_id: i64) -> Result<serde_json::Value, String> {
    let session = state
        .training_store
        .get_session(session_id)
        .await
        .map_err(fail)?
        .ok_or_else(|| not_found("Training session", session_id))?;
    let participants = state
        .training_store
        .list_participants(session_id)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({
        "session": session,
        "durationHours": session.duration_hours(),
        "participants": participants,
    }))
}

pub async fn add_participant(
    state: &AppState,
    session_id: i64,
    input: AddParticipantInput,
) -> Result<serde_json::Value, String> {
    let participant = state
        .training_store
        .add_participant(session_id, input)
        .await
        .map_err(fail)?;
    tracing::info!("Registered {} on session {}", participant.display_name(), session_id);
    to_json(&participant)
}

pub async fn score(
    state: &AppState,
    participant_id: i64,
    score: f64,
    comment: Option<String>,
) -> Result<serde_json::Value, String> {
    let session = state
        .training_store
        .score_participant(participant_id, score, comment)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({
        "participantId": participant_id,
        "score": score,
        "sessionId": session.id,
        "averageScore": session.average_score,
    }))
}

pub async fn attendance(state: &AppState, participant_id: i64, present: bool) -> Result<serde_json::Value, String> {
    if !state
        .training_store
        .set_presence(participant_id, present)
        .await
        .map_err(fail)?
    {
        return Err(not_found("Participant", participant_id));
    }
    Ok(serde_json::json!({ "participantId": participant_id, "present": present }))
}

pub async fn schedule(
    state: &AppState,
    session_id: i64,
    trainer: Option<String>,
    starts_at: &str,
    ends_at: &str,
) -> Result<serde_json::Value, String> {
    let session = state
        .training_store
        .update_schedule(session_id, trainer, parse_datetime(starts_at)?, parse_datetime(ends_at)?)
        .await
        .map_err(fail)?;
    let mut value = to_json(&session)?;
    value["durationHours"] = serde_json::json!(session.duration_hours());
    Ok(value)
}
