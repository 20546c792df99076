use crate::config::DashboardConfig;
use crate::dashboard::DashboardCore;
use crate::models::{
    AgentHistoryView, AgentScoreBar, AssessmentResult, KpiFormField, KpiThresholds, Metric, MetricValues, PerMetric,
    Role, ScorePoint, SubmitPerformancePayload, TeamAssessmentView, User,
};
use crate::session::{Session, TrustedEmailProvider};
use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::path::PathBuf;

const BAR_WIDTH: f64 = 40.0;

#[derive(Parser, Debug)]
#[command(name = "callcenter-kpi", about = "Call-center KPI thresholds and agent assessments")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the database, logs and default config
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print views as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage registered users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Show or set KPI thresholds (managers)
    Kpis {
        #[command(subcommand)]
        command: KpiCommands,
    },
    /// List registered agents (managers)
    Agents(LoginArgs),
    /// Submit a performance record for an agent (managers)
    Submit(SubmitArgs),
    /// Assessments for every agent with a score-by-agent chart (managers)
    Assessments(LoginArgs),
    /// Your own assessed history with a score-over-time chart (agents)
    History(LoginArgs),
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user if the email is not known yet
    Add {
        email: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

#[derive(Subcommand, Debug)]
pub enum KpiCommands {
    /// Show the KPI form with current values
    Show(LoginArgs),
    /// Save thresholds; metrics left out keep their current form value
    Set {
        #[command(flatten)]
        login: LoginArgs,
        #[command(flatten)]
        metrics: MetricArgs,
    },
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Login code handed to the identity provider (your email)
    #[arg(long = "as", env = "CALLCENTER_KPI_LOGIN")]
    pub login: String,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub login: LoginArgs,
    /// Agent the record belongs to
    #[arg(long)]
    pub agent: String,
    /// Submission date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[command(flatten)]
    pub metrics: MetricArgs,
}

#[derive(Args, Debug, Default)]
pub struct MetricArgs {
    /// Attendance (%)
    #[arg(long)]
    pub attendance: Option<f64>,
    /// Quality score (%)
    #[arg(long)]
    pub quality_score: Option<f64>,
    /// Product knowledge (%)
    #[arg(long)]
    pub product_knowledge: Option<f64>,
    /// Contact success rate (%)
    #[arg(long)]
    pub contact_success_rate: Option<f64>,
    /// Onboarding (%)
    #[arg(long)]
    pub onboarding: Option<f64>,
    /// Reporting (%)
    #[arg(long)]
    pub reporting: Option<f64>,
    /// CRM talk time (seconds)
    #[arg(long)]
    pub talk_time: Option<f64>,
    /// Issue resolution rate (%)
    #[arg(long)]
    pub resolution_rate: Option<f64>,
    /// Average handle time (seconds)
    #[arg(long)]
    pub aht: Option<f64>,
    /// Customer satisfaction (%)
    #[arg(long)]
    pub csat: Option<f64>,
    /// Call volume (calls)
    #[arg(long)]
    pub call_volume: Option<f64>,
}

impl MetricArgs {
    fn to_partial(&self) -> PerMetric<Option<f64>> {
        PerMetric {
            attendance: self.attendance,
            quality_score: self.quality_score,
            product_knowledge: self.product_knowledge,
            contact_success_rate: self.contact_success_rate,
            onboarding: self.onboarding,
            reporting: self.reporting,
            talk_time: self.talk_time,
            resolution_rate: self.resolution_rate,
            aht: self.aht,
            csat: self.csat,
            call_volume: self.call_volume,
        }
    }

    /// Every metric is required for a performance record.
    fn complete(&self) -> Result<MetricValues> {
        let partial = self.to_partial();
        let missing: Vec<String> = partial
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(metric, _)| format!("--{}", metric.as_str().replace('_', "-")))
            .collect();
        if !missing.is_empty() {
            bail!("missing metric values: {}", missing.join(", "));
        }
        Ok(MetricValues::from_fn(|metric| partial.get(metric).unwrap_or_default()))
    }

    fn merged_with_form(&self, form: &[KpiFormField]) -> KpiThresholds {
        let partial = self.to_partial();
        form.iter()
            .map(|field| (field.metric, partial.get(field.metric).unwrap_or(field.value)))
            .collect()
    }
}

fn parse_role(raw: &str) -> std::result::Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role '{}', expected Manager or Agent", raw))
}

pub fn dispatch(cli: Cli, config: &DashboardConfig) -> Result<()> {
    let core = DashboardCore::open(config)?;
    let json = cli.json;

    match cli.command {
        Commands::User {
            command: UserCommands::Add { email, role },
        } => {
            let inserted = core.register_users(&[User {
                email: email.clone(),
                role,
            }])?;
            let email = email.trim();
            if inserted == 0 {
                println!("{} is already registered", email);
            } else {
                println!("Registered {} as {}", email, role.as_str());
            }
            Ok(())
        }
        Commands::Kpis {
            command: KpiCommands::Show(login),
        } => with_session(&core, &login, |session| {
            let form = core.kpi_form(session)?;
            emit(json, &form, || print_kpi_form(&form))
        }),
        Commands::Kpis {
            command: KpiCommands::Set { login, metrics },
        } => with_session(&core, &login, |session| {
            let form = core.kpi_form(session)?;
            let saved = core.save_kpis(session, metrics.merged_with_form(&form))?;
            let form = core.kpi_form(session)?;
            emit(json, &saved, || {
                println!("KPIs saved!");
                print_kpi_form(&form);
            })
        }),
        Commands::Agents(login) => with_session(&core, &login, |session| {
            let agents = core.list_agents(session)?;
            emit(json, &agents, || {
                if agents.is_empty() {
                    println!("No agents registered.");
                }
                for agent in &agents {
                    println!("{}", agent);
                }
            })
        }),
        Commands::Submit(args) => with_session(&core, &args.login, |session| {
            let record = core.submit_performance(
                session,
                SubmitPerformancePayload {
                    agent_email: args.agent.clone(),
                    metrics: args.metrics.complete()?,
                    date: args.date,
                },
            )?;
            emit(json, &record, || {
                println!("Performance data saved! (record {} for {} on {})", record.id, record.agent_email, record.date)
            })
        }),
        Commands::Assessments(login) => with_session(&core, &login, |session| {
            let view = core.team_assessments(session)?;
            emit(json, &view, || print_team_view(&view))
        }),
        Commands::History(login) => with_session(&core, &login, |session| {
            let view = core.my_history(session)?;
            emit(json, &view, || print_history_view(&view))
        }),
    }
}

/// Runs one action inside a login/logout pair.
fn with_session(core: &DashboardCore, login: &LoginArgs, action: impl FnOnce(&Session) -> Result<()>) -> Result<()> {
    let session = core.login(&TrustedEmailProvider::new(), &login.login)?;
    let outcome = action(&session);
    core.logout(session);
    outcome
}

fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render();
    }
    Ok(())
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.iter().map(|header| Cell::new(header).fg(Color::Cyan)).collect::<Vec<_>>());
    table
}

fn print_kpi_form(form: &[KpiFormField]) {
    let mut table = new_table(&["Metric", "Unit", "Pass when", "Threshold", "Source"]);
    for field in form {
        table.add_row(vec![
            Cell::new(&field.label),
            Cell::new(field.unit.as_str()),
            Cell::new(format!("value {} threshold", field.comparison.symbol())),
            Cell::new(format_value(field.metric, field.value)),
            Cell::new(if field.stored { "saved" } else { "form default" }),
        ]);
    }
    println!("{table}");
}

fn print_results(results: &[AssessmentResult]) {
    let mut headers = vec!["Id", "Agent", "Date"];
    headers.extend(Metric::ALL.iter().map(|metric| metric.as_str()));
    headers.push("Score (%)");

    let mut table = new_table(&headers);
    for result in results {
        let mut row = vec![
            Cell::new(result.record.id),
            Cell::new(&result.record.agent_email),
            Cell::new(result.record.date),
        ];
        for (metric, value) in result.record.metrics.iter() {
            let passed = *result.passes.get(metric);
            let color = if passed { Color::Green } else { Color::Red };
            let mark = if passed { "pass" } else { "fail" };
            row.push(Cell::new(format!("{} {}", format_value(metric, *value), mark)).fg(color));
        }
        row.push(Cell::new(format!("{:.2}", result.overall_score)));
        table.add_row(row);
    }
    println!("{table}");
}

fn print_team_view(view: &TeamAssessmentView) {
    println!("Assessment Results");
    if view.results.is_empty() {
        println!("No performance data available.");
        return;
    }
    print_results(&view.results);
    println!();
    println!("Agent Overall Scores");
    print_score_bars(&view.chart);
}

fn print_history_view(view: &AgentHistoryView) {
    println!("Agent Dashboard - {}", view.agent_email);
    if view.results.is_empty() {
        println!("No performance data available.");
        return;
    }
    print_results(&view.results);
    println!();
    println!("Your Score Over Time");
    print_score_points(&view.chart);
}

fn print_score_bars(bars: &[AgentScoreBar]) {
    let mut table = new_table(&["Agent", "Records", "Score (%)", ""]);
    for bar in bars {
        table.add_row(vec![
            Cell::new(&bar.agent_email),
            Cell::new(bar.record_count),
            Cell::new(format!("{:.2}", bar.average_score)),
            Cell::new(score_bar(bar.average_score)),
        ]);
    }
    println!("{table}");
}

fn print_score_points(points: &[ScorePoint]) {
    let mut table = new_table(&["Date", "Record", "Score (%)", ""]);
    for point in points {
        table.add_row(vec![
            Cell::new(point.date),
            Cell::new(point.record_id),
            Cell::new(format!("{:.2}", point.overall_score)),
            Cell::new(score_bar(point.overall_score)),
        ]);
    }
    println!("{table}");
}

fn score_bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH).round() as usize;
    "#".repeat(filled)
}

fn format_value(metric: Metric, value: f64) -> String {
    if metric == Metric::CallVolume {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_submit_with_all_metrics() {
        let cli = Cli::try_parse_from([
            "callcenter-kpi",
            "submit",
            "--as",
            "boss@example.com",
            "--agent",
            "agent@example.com",
            "--date",
            "2024-06-01",
            "--attendance",
            "95",
            "--quality-score",
            "90",
            "--product-knowledge",
            "85",
            "--contact-success-rate",
            "80",
            "--onboarding",
            "90",
            "--reporting",
            "95",
            "--talk-time",
            "300",
            "--resolution-rate",
            "80",
            "--aht",
            "540",
            "--csat",
            "85",
            "--call-volume",
            "52",
        ])
        .expect("parse");

        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        let metrics = args.metrics.complete().expect("complete");
        assert_eq!(metrics.aht, 540.0);
        assert_eq!(metrics.call_volume, 52.0);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn incomplete_submission_names_missing_flags() {
        let args = MetricArgs {
            attendance: Some(90.0),
            ..MetricArgs::default()
        };
        let error = args.complete().expect_err("incomplete");
        let message = error.to_string();
        assert!(message.contains("--quality-score"));
        assert!(message.contains("--call-volume"));
        assert!(!message.contains("--attendance"));
    }

    #[test]
    fn kpi_set_keeps_form_values_for_unspecified_metrics() {
        let form: Vec<KpiFormField> = Metric::ALL
            .into_iter()
            .map(|metric| KpiFormField {
                metric,
                label: metric.label().to_string(),
                unit: metric.unit(),
                comparison: metric.comparison(),
                value: metric.form_default(),
                stored: false,
            })
            .collect();
        let args = MetricArgs {
            aht: Some(480.0),
            ..MetricArgs::default()
        };
        let merged = args.merged_with_form(&form);
        assert_eq!(merged.len(), Metric::COUNT);
        assert_eq!(merged.get(Metric::Aht), Some(480.0));
        assert_eq!(merged.get(Metric::Attendance), Some(95.0));
    }

    #[test]
    fn score_bar_scales_to_width() {
        assert_eq!(score_bar(100.0).len(), 40);
        assert_eq!(score_bar(0.0), "");
        assert_eq!(score_bar(50.0).len(), 20);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Cli::try_parse_from(["callcenter-kpi", "user", "add", "a@example.com", "admin"]).is_err());
    }
}
