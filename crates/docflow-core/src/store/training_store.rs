use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{ms_to_dt, on_constraint, opt_ms_to_dt};
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::{AddParticipantInput, Participant, TrainingSession};

const SESSION_COLUMNS: &str = "id, business_case_id, client_id, product_id, title, description, \
                               trainer, starts_at, ends_at, average_score, created_at";
const PARTICIPANT_COLUMNS: &str = "id, training_session_id, last_name, first_name, email, phone, \
                                   job_title, present, score, score_comment";

/// Participant scores are marked out of 20.
pub const MAX_SCORE: f64 = 20.0;

/// Training sessions spawned by completed business cases, and their participants.
#[derive(Clone)]
pub struct TrainingStore {
    db: Database,
}

impl TrainingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get_session(&self, id: i64) -> Result<Option<TrainingSession>, DocflowError> {
        self.db
            .with_conn_async(move |conn| get_session(conn, id))
            .await
    }

    pub async fn list_sessions(&self, business_case_id: i64) -> Result<Vec<TrainingSession>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM training_sessions WHERE business_case_id = ?1 ORDER BY id",
                    SESSION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![business_case_id], row_to_session)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Set the trainer and schedule of a session. The end may not precede the start.
    pub async fn update_schedule(
        &self,
        id: i64,
        trainer: Option<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<TrainingSession, DocflowError> {
        if ends_at < starts_at {
            return Err(DocflowError::Validation(
                "The end date cannot be earlier than the start date".to_string(),
            ));
        }
        self.db
            .with_tx_async(move |conn| {
                let n = conn.execute(
                    "UPDATE training_sessions SET trainer = COALESCE(?1, trainer), starts_at = ?2, ends_at = ?3
                     WHERE id = ?4",
                    rusqlite::params![trainer, starts_at.timestamp_millis(), ends_at.timestamp_millis(), id],
                )?;
                if n == 0 {
                    return Err(DocflowError::NotFound(format!("Training session {} not found", id)));
                }
                get_session(conn, id)?
                    .ok_or_else(|| DocflowError::NotFound(format!("Training session {} not found", id)))
            })
            .await
    }

    pub async fn add_participant(
        &self,
        session_id: i64,
        input: AddParticipantInput,
    ) -> Result<Participant, DocflowError> {
        if input.last_name.trim().is_empty() || input.first_name.trim().is_empty() {
            return Err(DocflowError::Validation(
                "Participant first and last names are required".to_string(),
            ));
        }
        self.db
            .with_tx_async(move |conn| {
                if get_session(conn, session_id)?.is_none() {
                    return Err(DocflowError::NotFound(format!(
                        "Training session {} not found",
                        session_id
                    )));
                }
                conn.execute(
                    "INSERT INTO participants (training_session_id, last_name, first_name, email, phone, job_title, present)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
                    rusqlite::params![
                        session_id,
                        input.last_name,
                        input.first_name,
                        input.email,
                        input.phone,
                        input.job_title,
                    ],
                )
                .map_err(|e| {
                    on_constraint(e, || {
                        format!(
                            "A participant with email {} is already registered for session {}",
                            input.email.as_deref().unwrap_or("-"),
                            session_id
                        )
                    })
                })?;
                Ok(Participant {
                    id: conn.last_insert_rowid(),
                    training_session_id: session_id,
                    last_name: input.last_name,
                    first_name: input.first_name,
                    email: input.email,
                    phone: input.phone,
                    job_title: input.job_title,
                    present: true,
                    score: None,
                    score_comment: None,
                })
            })
            .await
    }

    pub async fn get_participant(&self, id: i64) -> Result<Option<Participant>, DocflowError> {
        self.db
            .with_conn_async(move |conn| get_participant(conn, id))
            .await
    }

    pub async fn list_participants(&self, session_id: i64) -> Result<Vec<Participant>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM participants WHERE training_session_id = ?1 ORDER BY last_name, first_name",
                    PARTICIPANT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![session_id], row_to_participant)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn set_presence(&self, id: i64, present: bool) -> Result<bool, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute(
                    "UPDATE participants SET present = ?1 WHERE id = ?2",
                    rusqlite::params![present as i64, id],
                )?;
                Ok(n > 0)
            })
            .await
    }

    /// Record a participant's evaluation and refresh the session average.
    pub async fn score_participant(
        &self,
        id: i64,
        score: f64,
        comment: Option<String>,
    ) -> Result<TrainingSession, DocflowError> {
        if !(0.0..=MAX_SCORE).contains(&score) {
            return Err(DocflowError::Validation(format!(
                "Score must be between 0 and {}",
                MAX_SCORE
            )));
        }
        self.db
            .with_tx_async(move |conn| {
                let participant = get_participant(conn, id)?
                    .ok_or_else(|| DocflowError::NotFound(format!("Participant {} not found", id)))?;
                conn.execute(
                    "UPDATE participants SET score = ?1, score_comment = ?2 WHERE id = ?3",
                    rusqlite::params![score, comment, id],
                )?;
                let average: Option<f64> = conn.query_row(
                    "SELECT AVG(score) FROM participants WHERE training_session_id = ?1 AND score IS NOT NULL",
                    rusqlite::params![participant.training_session_id],
                    |row| row.get(0),
                )?;
                let average = average.map(|v| (v * 100.0).round() / 100.0);
                conn.execute(
                    "UPDATE training_sessions SET average_score = ?1 WHERE id = ?2",
                    rusqlite::params![average, participant.training_session_id],
                )?;
                tracing::debug!(
                    "Session {} average score is now {:?}",
                    participant.training_session_id,
                    average
                );
                get_session(conn, participant.training_session_id)?.ok_or_else(|| {
                    DocflowError::NotFound(format!(
                        "Training session {} not found",
                        participant.training_session_id
                    ))
                })
            })
            .await
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_session(
    conn: &Connection,
    business_case_id: i64,
    client_id: i64,
    product_id: i64,
    title: &str,
    description: &str,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<TrainingSession, DocflowError> {
    conn.execute(
        "INSERT INTO training_sessions (business_case_id, client_id, product_id, title, description,
                                        starts_at, ends_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            business_case_id,
            client_id,
            product_id,
            title,
            description,
            starts_at.map(|t| t.timestamp_millis()),
            ends_at.map(|t| t.timestamp_millis()),
            now.timestamp_millis(),
        ],
    )
    .map_err(|e| {
        on_constraint(e, || {
            format!(
                "A training session for product {} already exists on business case {}",
                product_id, business_case_id
            )
        })
    })?;
    let id = conn.last_insert_rowid();
    get_session(conn, id)?.ok_or_else(|| DocflowError::Internal(format!("Training session {} vanished", id)))
}

pub(crate) fn get_session(conn: &Connection, id: i64) -> rusqlite::Result<Option<TrainingSession>> {
    conn.query_row(
        &format!("SELECT {} FROM training_sessions WHERE id = ?1", SESSION_COLUMNS),
        rusqlite::params![id],
        row_to_session,
    )
    .optional()
}

pub(crate) fn get_participant(conn: &Connection, id: i64) -> rusqlite::Result<Option<Participant>> {
    conn.query_row(
        &format!("SELECT {} FROM participants WHERE id = ?1", PARTICIPANT_COLUMNS),
        rusqlite::params![id],
        row_to_participant,
    )
    .optional()
}

pub(crate) fn count_sessions(conn: &Connection, business_case_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM training_sessions WHERE business_case_id = ?1",
        rusqlite::params![business_case_id],
        |row| row.get(0),
    )
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<TrainingSession> {
    Ok(TrainingSession {
        id: row.get(0)?,
        business_case_id: row.get(1)?,
        client_id: row.get(2)?,
        product_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        trainer: row.get(6)?,
        starts_at: opt_ms_to_dt(row.get(7)?),
        ends_at: opt_ms_to_dt(row.get(8)?),
        average_score: row.get(9)?,
        created_at: ms_to_dt(row.get(10)?),
    })
}

fn row_to_participant(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        training_session_id: row.get(1)?,
        last_name: row.get(2)?,
        first_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        job_title: row.get(6)?,
        present: row.get::<_, i64>(7)? != 0,
        score: row.get(8)?,
        score_comment: row.get(9)?,
    })
}
