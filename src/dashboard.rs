use crate::assessment;
use crate::config::DashboardConfig;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AgentHistoryView, KpiFormField, KpiThresholds, Metric, PerformanceRecord, Role, SubmitPerformancePayload,
    TeamAssessmentView, User,
};
use crate::policy::InputPolicy;
use crate::session::{IdentityProvider, Session};
use std::sync::Arc;

/// Request handlers behind every dashboard view. Handlers take the caller's
/// session explicitly; nothing about the signed-in user is held here.
#[derive(Clone)]
pub struct DashboardCore {
    db: Arc<Database>,
    policy: InputPolicy,
}

impl DashboardCore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            policy: InputPolicy::new(),
        }
    }

    pub fn open(config: &DashboardConfig) -> AppResult<Self> {
        let db = Arc::new(Database::new(&config.database_path())?);
        let core = Self::new(db);

        let seeded = core.register_users(&config.seed_users())?;
        tracing::info!(path = %core.db.path().display(), seeded, "dashboard database ready");
        Ok(core)
    }

    /// Admin action: adds users that are not registered yet. Emails are stored
    /// trimmed and lowercased so they match what login resolves.
    pub fn register_users(&self, users: &[User]) -> AppResult<usize> {
        let users = users
            .iter()
            .map(|user| {
                let email = user.email.trim().to_ascii_lowercase();
                self.policy.validate_email(&email)?;
                Ok(User {
                    email,
                    role: user.role,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        let inserted = self.db.seed_users(&users)?;
        if inserted > 0 {
            tracing::info!(count = inserted, "registered users");
        }
        Ok(inserted)
    }

    pub fn login(&self, provider: &dyn IdentityProvider, code: &str) -> AppResult<Session> {
        let email = provider.resolve_email(code).map_err(|error| {
            tracing::warn!(provider = provider.name(), error = %error, "identity resolution failed");
            AppError::Authentication(error.into_message())
        })?;

        let Some(user) = self.db.find_user(&email)? else {
            tracing::warn!(email = %email, "login attempt by unregistered user");
            return Err(AppError::Authorization(format!(
                "User {} not registered. Contact admin.",
                email
            )));
        };

        let session = Session::open(user);
        tracing::info!(
            session_id = %session.session_id,
            email = %session.email,
            role = session.role.as_str(),
            "session started"
        );
        Ok(session)
    }

    pub fn logout(&self, session: Session) {
        tracing::info!(session_id = %session.session_id, email = %session.email, "session ended");
    }

    /// Current thresholds with form defaults filled in for metrics never configured.
    pub fn kpi_form(&self, session: &Session) -> AppResult<Vec<KpiFormField>> {
        session.require_role(Role::Manager)?;
        let kpis = self.db.get_kpis()?;
        Ok(Metric::ALL
            .into_iter()
            .map(|metric| {
                let stored = kpis.get(metric);
                KpiFormField {
                    metric,
                    label: metric.label().to_string(),
                    unit: metric.unit(),
                    comparison: metric.comparison(),
                    value: stored.unwrap_or_else(|| metric.form_default()),
                    stored: stored.is_some(),
                }
            })
            .collect())
    }

    pub fn save_kpis(&self, session: &Session, thresholds: KpiThresholds) -> AppResult<KpiThresholds> {
        session.require_role(Role::Manager)?;
        self.policy.validate_thresholds(&thresholds)?;
        self.db.set_kpis(&thresholds)?;
        tracing::info!(email = %session.email, count = thresholds.len(), "kpi thresholds saved");
        self.db.get_kpis()
    }

    pub fn list_agents(&self, session: &Session) -> AppResult<Vec<String>> {
        session.require_role(Role::Manager)?;
        self.db.list_agents()
    }

    pub fn submit_performance(
        &self,
        session: &Session,
        payload: SubmitPerformancePayload,
    ) -> AppResult<PerformanceRecord> {
        session.require_role(Role::Manager)?;
        let agent_email = payload.agent_email.trim().to_ascii_lowercase();
        self.policy.validate_email(&agent_email)?;
        self.policy.validate_metrics(&payload.metrics)?;

        match self.db.find_user(&agent_email)? {
            Some(user) if user.role == Role::Agent => {}
            Some(_) => {
                return Err(AppError::Validation(format!("{} is not an agent", agent_email)));
            }
            None => {
                return Err(AppError::Validation(format!("Agent {} is not registered", agent_email)));
            }
        }

        let date = payload
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let record = self.db.append_performance(&agent_email, &payload.metrics, date)?;
        tracing::info!(
            record_id = record.id,
            agent = %record.agent_email,
            submitted_by = %session.email,
            date = %record.date,
            "performance record stored"
        );
        Ok(record)
    }

    pub fn team_assessments(&self, session: &Session) -> AppResult<TeamAssessmentView> {
        session.require_role(Role::Manager)?;
        let records = self.db.list_performance(None)?;
        let kpis = self.current_kpis()?;
        let results = assessment::assess(&records, &kpis);
        let chart = assessment::score_by_agent(&results);

        Ok(TeamAssessmentView {
            thresholds: assessment::effective_thresholds(&kpis),
            results,
            chart,
        })
    }

    pub fn my_history(&self, session: &Session) -> AppResult<AgentHistoryView> {
        session.require_role(Role::Agent)?;
        let records = self.db.list_performance(Some(&session.email))?;
        let kpis = self.current_kpis()?;
        let results = assessment::assess(&records, &kpis);
        let chart = assessment::score_over_time(&results);

        Ok(AgentHistoryView {
            agent_email: session.email.clone(),
            thresholds: assessment::effective_thresholds(&kpis),
            results,
            chart,
        })
    }

    fn current_kpis(&self) -> AppResult<KpiThresholds> {
        let kpis = self.db.get_kpis()?;
        let missing = assessment::missing_metrics(&kpis);
        if !missing.is_empty() {
            tracing::info!(missing = ?missing, "assessing with default thresholds for unconfigured metrics");
        }
        Ok(kpis)
    }
}
