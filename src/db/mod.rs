use crate::errors::{AppError, AppResult};
use crate::models::{KpiThresholds, Metric, MetricValues, PerformanceRecord, Role, User};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");
const DATE_FORMAT: &str = "%Y-%m-%d";

const PERFORMANCE_COLUMNS: &str = "id, agent_email, attendance, quality_score, product_knowledge,
    contact_success_rate, onboarding, reporting, talk_time, resolution_rate, aht, csat, call_volume,
    date, created_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Inserts users that do not exist yet. Existing rows keep their role.
    pub fn seed_users(&self, users: &[User]) -> AppResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        for user in users {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO users (email, role) VALUES (?1, ?2)",
                params![user.email, user.role.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn find_user(&self, email: &str) -> AppResult<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT email, role FROM users WHERE email = ?1",
            [email],
            parse_user_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn list_agents(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT email FROM users WHERE role = ?1 ORDER BY email ASC")?;
        let rows = stmt.query_map([Role::Agent.as_str()], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::from)
    }

    pub fn set_kpi(&self, metric: Metric, threshold: f64) -> AppResult<()> {
        let conn = self.lock()?;
        upsert_kpi(&conn, metric, threshold, &Utc::now())?;
        Ok(())
    }

    /// Upserts every threshold in one transaction.
    pub fn set_kpis(&self, thresholds: &KpiThresholds) -> AppResult<()> {
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (metric, threshold) in thresholds.iter() {
            upsert_kpi(&tx, metric, threshold, &now)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_kpis(&self) -> AppResult<KpiThresholds> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT metric, threshold FROM kpis ORDER BY metric ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;

        let mut thresholds = KpiThresholds::new();
        for row in rows {
            let (name, threshold) = row?;
            match Metric::parse(&name) {
                Some(metric) => thresholds.set(metric, threshold),
                None => tracing::warn!(metric = %name, "ignoring threshold for unknown metric"),
            }
        }
        Ok(thresholds)
    }

    pub fn append_performance(
        &self,
        agent_email: &str,
        metrics: &MetricValues,
        date: NaiveDate,
    ) -> AppResult<PerformanceRecord> {
        let call_volume = call_volume_column(metrics.call_volume)?;
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO performance (
               agent_email, attendance, quality_score, product_knowledge, contact_success_rate,
               onboarding, reporting, talk_time, resolution_rate, aht, csat, call_volume, date, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                agent_email,
                metrics.attendance,
                metrics.quality_score,
                metrics.product_knowledge,
                metrics.contact_success_rate,
                metrics.onboarding,
                metrics.reporting,
                metrics.talk_time,
                metrics.resolution_rate,
                metrics.aht,
                metrics.csat,
                call_volume,
                date.format(DATE_FORMAT).to_string(),
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(PerformanceRecord {
            id: conn.last_insert_rowid(),
            agent_email: agent_email.to_string(),
            metrics: MetricValues {
                call_volume: call_volume as f64,
                ..*metrics
            },
            date,
            created_at,
        })
    }

    /// All records in append order, optionally restricted to one agent.
    pub fn list_performance(&self, agent_email: Option<&str>) -> AppResult<Vec<PerformanceRecord>> {
        let conn = self.lock()?;
        let records = match agent_email {
            Some(agent_email) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM performance WHERE agent_email = ?1 ORDER BY id ASC",
                    PERFORMANCE_COLUMNS
                ))?;
                let rows = stmt.query_map([agent_email], parse_performance_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM performance ORDER BY id ASC",
                    PERFORMANCE_COLUMNS
                ))?;
                let rows = stmt.query_map([], parse_performance_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

fn upsert_kpi(conn: &Connection, metric: Metric, threshold: f64, now: &DateTime<Utc>) -> AppResult<()> {
    conn.execute(
        "INSERT INTO kpis (metric, threshold, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(metric) DO UPDATE SET threshold = excluded.threshold, updated_at = excluded.updated_at",
        params![metric.as_str(), threshold, now.to_rfc3339()],
    )?;
    Ok(())
}

/// Call volume is an INTEGER column; anything that does not convert exactly is refused.
fn call_volume_column(value: f64) -> AppResult<i64> {
    // 2^63 is the first f64 past i64::MAX, so the upper check is exclusive.
    let representable =
        value.is_finite() && value.fract() == 0.0 && value >= 0.0 && value < i64::MAX as f64;
    if !representable {
        return Err(AppError::Validation(format!(
            "call_volume {} cannot be stored as a whole number of calls",
            value
        )));
    }
    Ok(value as i64)
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let raw_role: String = row.get(1)?;
    let role = Role::parse(&raw_role).ok_or_else(|| conversion_error(format!("Unknown role '{}'", raw_role)))?;
    Ok(User {
        email: row.get(0)?,
        role,
    })
}

fn parse_performance_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    Ok(PerformanceRecord {
        id: row.get(0)?,
        agent_email: row.get(1)?,
        metrics: MetricValues {
            attendance: row.get(2)?,
            quality_score: row.get(3)?,
            product_knowledge: row.get(4)?,
            contact_success_rate: row.get(5)?,
            onboarding: row.get(6)?,
            reporting: row.get(7)?,
            talk_time: row.get(8)?,
            resolution_rate: row.get(9)?,
            aht: row.get(10)?,
            csat: row.get(11)?,
            call_volume: row.get::<_, i64>(12)? as f64,
        },
        date: parse_date(&row.get::<_, String>(13)?)?,
        created_at: parse_time(&row.get::<_, String>(14)?)?,
    })
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|error| conversion_error(error.to_string()))
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| conversion_error(error.to_string()))
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}
