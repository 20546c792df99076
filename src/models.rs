use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Manager,
    Agent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::Agent => "Agent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manager" => Some(Self::Manager),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub role: Role,
}

/// Which side of the threshold a metric has to land on to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    /// Both directions are inclusive: a value sitting exactly on the threshold passes.
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::AtLeast => value >= threshold,
            Self::AtMost => value <= threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }
}

/// Largest call volume accepted for a single daily record.
pub const MAX_CALL_VOLUME: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricUnit {
    Percent,
    Seconds,
    Calls,
}

impl MetricUnit {
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            Self::Percent => Some(100.0),
            Self::Calls => Some(MAX_CALL_VOLUME),
            Self::Seconds => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Seconds => "seconds",
            Self::Calls => "calls",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Attendance,
    QualityScore,
    ProductKnowledge,
    ContactSuccessRate,
    Onboarding,
    Reporting,
    TalkTime,
    ResolutionRate,
    Aht,
    Csat,
    CallVolume,
}

impl Metric {
    pub const COUNT: usize = 11;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Attendance,
        Metric::QualityScore,
        Metric::ProductKnowledge,
        Metric::ContactSuccessRate,
        Metric::Onboarding,
        Metric::Reporting,
        Metric::TalkTime,
        Metric::ResolutionRate,
        Metric::Aht,
        Metric::Csat,
        Metric::CallVolume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::QualityScore => "quality_score",
            Self::ProductKnowledge => "product_knowledge",
            Self::ContactSuccessRate => "contact_success_rate",
            Self::Onboarding => "onboarding",
            Self::Reporting => "reporting",
            Self::TalkTime => "talk_time",
            Self::ResolutionRate => "resolution_rate",
            Self::Aht => "aht",
            Self::Csat => "csat",
            Self::CallVolume => "call_volume",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Attendance => "Attendance",
            Self::QualityScore => "Quality Score",
            Self::ProductKnowledge => "Product Knowledge",
            Self::ContactSuccessRate => "Contact Success Rate",
            Self::Onboarding => "Onboarding",
            Self::Reporting => "Reporting",
            Self::TalkTime => "CRM Talk Time",
            Self::ResolutionRate => "Issue Resolution Rate",
            Self::Aht => "Average Handle Time",
            Self::Csat => "Customer Satisfaction",
            Self::CallVolume => "Call Volume",
        }
    }

    pub fn comparison(self) -> Comparison {
        match self {
            Self::Aht => Comparison::AtMost,
            _ => Comparison::AtLeast,
        }
    }

    /// Threshold the assessment falls back to when none is stored.
    pub fn default_threshold(self) -> f64 {
        match self {
            Self::Aht => 600.0,
            _ => 50.0,
        }
    }

    /// Value pre-filled in the KPI form when no threshold is stored.
    pub fn form_default(self) -> f64 {
        match self {
            Self::Attendance => 95.0,
            Self::QualityScore => 90.0,
            Self::ProductKnowledge => 85.0,
            Self::ContactSuccessRate => 80.0,
            Self::Onboarding => 90.0,
            Self::Reporting => 95.0,
            Self::TalkTime => 300.0,
            Self::ResolutionRate => 80.0,
            Self::Aht => 600.0,
            Self::Csat => 85.0,
            Self::CallVolume => 50.0,
        }
    }

    pub fn unit(self) -> MetricUnit {
        match self {
            Self::TalkTime | Self::Aht => MetricUnit::Seconds,
            Self::CallVolume => MetricUnit::Calls,
            _ => MetricUnit::Percent,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per tracked metric, addressed by named field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerMetric<T> {
    pub attendance: T,
    pub quality_score: T,
    pub product_knowledge: T,
    pub contact_success_rate: T,
    pub onboarding: T,
    pub reporting: T,
    pub talk_time: T,
    pub resolution_rate: T,
    pub aht: T,
    pub csat: T,
    pub call_volume: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            attendance: f(Metric::Attendance),
            quality_score: f(Metric::QualityScore),
            product_knowledge: f(Metric::ProductKnowledge),
            contact_success_rate: f(Metric::ContactSuccessRate),
            onboarding: f(Metric::Onboarding),
            reporting: f(Metric::Reporting),
            talk_time: f(Metric::TalkTime),
            resolution_rate: f(Metric::ResolutionRate),
            aht: f(Metric::Aht),
            csat: f(Metric::Csat),
            call_volume: f(Metric::CallVolume),
        }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Attendance => &self.attendance,
            Metric::QualityScore => &self.quality_score,
            Metric::ProductKnowledge => &self.product_knowledge,
            Metric::ContactSuccessRate => &self.contact_success_rate,
            Metric::Onboarding => &self.onboarding,
            Metric::Reporting => &self.reporting,
            Metric::TalkTime => &self.talk_time,
            Metric::ResolutionRate => &self.resolution_rate,
            Metric::Aht => &self.aht,
            Metric::Csat => &self.csat,
            Metric::CallVolume => &self.call_volume,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &T)> + '_ {
        Metric::ALL.into_iter().map(move |metric| (metric, self.get(metric)))
    }
}

pub type MetricValues = PerMetric<f64>;
pub type PassFlags = PerMetric<bool>;

/// Stored thresholds keyed by metric. May be partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpiThresholds(BTreeMap<Metric, f64>);

impl KpiThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn set(&mut self, metric: Metric, threshold: f64) {
        self.0.insert(metric, threshold);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(metric, threshold)| (*metric, *threshold))
    }
}

impl FromIterator<(Metric, f64)> for KpiThresholds {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<MetricValues> for KpiThresholds {
    fn from(values: MetricValues) -> Self {
        values.iter().map(|(metric, value)| (metric, *value)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub id: i64,
    pub agent_email: String,
    pub metrics: MetricValues,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    #[serde(flatten)]
    pub record: PerformanceRecord,
    pub passes: PassFlags,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPerformancePayload {
    pub agent_email: String,
    pub metrics: MetricValues,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiFormField {
    pub metric: Metric,
    pub label: String,
    pub unit: MetricUnit,
    pub comparison: Comparison,
    pub value: f64,
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentScoreBar {
    pub agent_email: String,
    pub average_score: f64,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePoint {
    pub record_id: i64,
    pub date: NaiveDate,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssessmentView {
    pub thresholds: MetricValues,
    pub results: Vec<AssessmentResult>,
    pub chart: Vec<AgentScoreBar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHistoryView {
    pub agent_email: String,
    pub thresholds: MetricValues,
    pub results: Vec<AssessmentResult>,
    pub chart: Vec<ScorePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip_through_parse() {
        for metric in Metric::ALL {
            assert_eq!(Metric::parse(metric.as_str()), Some(metric));
        }
        assert_eq!(Metric::parse("handle_time"), None);
    }

    #[test]
    fn only_aht_is_compared_at_most() {
        let at_most: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|metric| metric.comparison() == Comparison::AtMost)
            .collect();
        assert_eq!(at_most, vec![Metric::Aht]);
        assert_eq!(Metric::Aht.default_threshold(), 600.0);
        assert_eq!(Metric::Csat.default_threshold(), 50.0);
    }

    #[test]
    fn per_metric_fields_line_up_with_metric_keys() {
        let values = MetricValues::from_fn(|metric| metric as usize as f64);
        for (index, metric) in Metric::ALL.into_iter().enumerate() {
            assert_eq!(*values.get(metric), index as f64);
        }

        let json = serde_json::to_value(values).expect("serialize");
        for metric in Metric::ALL {
            assert!(json.get(metric.as_str()).is_some(), "missing {}", metric);
        }
    }

    #[test]
    fn role_parse_accepts_stored_and_lowercase_names() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("agent"), Some(Role::Agent));
        assert_eq!(Role::parse("admin"), None);
    }
}
