use crate::models::{
    AgentScoreBar, AssessmentResult, KpiThresholds, Metric, MetricValues, PassFlags, PerformanceRecord, ScorePoint,
};

/// Thresholds for all eleven metrics, with defaults filled in for anything not stored.
pub fn effective_thresholds(kpis: &KpiThresholds) -> MetricValues {
    MetricValues::from_fn(|metric| kpis.get(metric).unwrap_or_else(|| metric.default_threshold()))
}

/// Metrics with no stored threshold, in canonical order.
pub fn missing_metrics(kpis: &KpiThresholds) -> Vec<Metric> {
    Metric::ALL
        .into_iter()
        .filter(|metric| kpis.get(*metric).is_none())
        .collect()
}

pub fn assess_record(record: &PerformanceRecord, thresholds: &MetricValues) -> AssessmentResult {
    let passes = PassFlags::from_fn(|metric| {
        metric
            .comparison()
            .passes(*record.metrics.get(metric), *thresholds.get(metric))
    });
    let passing = passes.iter().filter(|(_, passed)| **passed).count();

    AssessmentResult {
        record: record.clone(),
        passes,
        overall_score: passing as f64 / Metric::COUNT as f64 * 100.0,
    }
}

/// Assesses every record against the same threshold snapshot, preserving input order.
pub fn assess(records: &[PerformanceRecord], kpis: &KpiThresholds) -> Vec<AssessmentResult> {
    let thresholds = effective_thresholds(kpis);
    records
        .iter()
        .map(|record| assess_record(record, &thresholds))
        .collect()
}

/// Mean overall score per agent, agents in order of first appearance.
pub fn score_by_agent(results: &[AssessmentResult]) -> Vec<AgentScoreBar> {
    let mut bars: Vec<(String, f64, usize)> = Vec::new();
    for result in results {
        let email = &result.record.agent_email;
        match bars.iter_mut().find(|(agent, _, _)| agent == email) {
            Some((_, total, count)) => {
                *total += result.overall_score;
                *count += 1;
            }
            None => bars.push((email.clone(), result.overall_score, 1)),
        }
    }

    bars.into_iter()
        .map(|(agent_email, total, record_count)| AgentScoreBar {
            agent_email,
            average_score: total / record_count as f64,
            record_count,
        })
        .collect()
}

pub fn score_over_time(results: &[AssessmentResult]) -> Vec<ScorePoint> {
    results
        .iter()
        .map(|result| ScorePoint {
            record_id: result.record.id,
            date: result.record.date,
            overall_score: result.overall_score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn record(id: i64, agent: &str, metrics: MetricValues) -> PerformanceRecord {
        PerformanceRecord {
            id,
            agent_email: agent.to_string(),
            metrics,
            date: NaiveDate::from_ymd_opt(2024, 3, id as u32).expect("valid date"),
            created_at: Utc::now(),
        }
    }

    fn scenario_thresholds() -> KpiThresholds {
        [(Metric::Attendance, 95.0), (Metric::Aht, 600.0), (Metric::Csat, 85.0)]
            .into_iter()
            .collect()
    }

    fn scenario_metrics() -> MetricValues {
        MetricValues {
            attendance: 95.0,
            aht: 600.0,
            csat: 85.0,
            ..MetricValues::from_fn(|_| 50.0)
        }
    }

    #[test]
    fn all_metrics_on_threshold_score_one_hundred() {
        let kpis: KpiThresholds = Metric::ALL
            .into_iter()
            .map(|metric| (metric, 70.0))
            .collect();
        let results = assess(&[record(1, "a@example.com", MetricValues::from_fn(|_| 70.0))], &kpis);
        assert_eq!(results[0].overall_score, 100.0);
        assert!(results[0].passes.iter().all(|(_, passed)| *passed));
    }

    #[test]
    fn all_metrics_failing_score_zero() {
        let metrics = MetricValues {
            aht: 601.0,
            ..MetricValues::from_fn(|_| 49.0)
        };
        let results = assess(&[record(1, "a@example.com", metrics)], &KpiThresholds::new());
        assert_eq!(results[0].overall_score, 0.0);
    }

    #[test]
    fn aht_passes_below_and_fails_above_threshold() {
        let kpis = scenario_thresholds();
        let below = MetricValues {
            aht: 420.0,
            ..scenario_metrics()
        };
        let above = MetricValues {
            aht: 720.0,
            ..scenario_metrics()
        };
        let results = assess(&[record(1, "a@example.com", below), record(2, "a@example.com", above)], &kpis);
        assert!(results[0].passes.aht);
        assert!(!results[1].passes.aht);

        let low_csat = MetricValues {
            csat: 40.0,
            ..scenario_metrics()
        };
        let result = assess_record(&record(3, "a@example.com", low_csat), &effective_thresholds(&kpis));
        assert!(!result.passes.csat);
    }

    #[test]
    fn missing_thresholds_fall_back_to_defaults() {
        let kpis = scenario_thresholds();
        let thresholds = effective_thresholds(&kpis);
        assert_eq!(thresholds.attendance, 95.0);
        assert_eq!(thresholds.quality_score, 50.0);
        assert_eq!(thresholds.call_volume, 50.0);
        assert_eq!(thresholds.aht, 600.0);

        let missing = missing_metrics(&kpis);
        assert_eq!(missing.len(), 8);
        assert!(!missing.contains(&Metric::Attendance));
        assert!(missing.contains(&Metric::TalkTime));

        let empty = effective_thresholds(&KpiThresholds::new());
        assert_eq!(empty.aht, 600.0);
        assert_eq!(empty.reporting, 50.0);
    }

    #[test]
    fn scenario_record_on_thresholds_passes_everything() {
        let results = assess(&[record(1, "a@example.com", scenario_metrics())], &scenario_thresholds());
        assert_eq!(results[0].overall_score, 100.0);
    }

    #[test]
    fn scenario_attendance_one_below_scores_ten_of_eleven() {
        let metrics = MetricValues {
            attendance: 94.0,
            ..scenario_metrics()
        };
        let results = assess(&[record(1, "a@example.com", metrics)], &scenario_thresholds());
        assert!(!results[0].passes.attendance);
        assert!((results[0].overall_score - 1000.0 / 11.0).abs() < 1e-9);
        assert!((results[0].overall_score - 90.91).abs() < 0.01);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(assess(&[], &scenario_thresholds()).is_empty());
        assert!(score_by_agent(&[]).is_empty());
        assert!(score_over_time(&[]).is_empty());
    }

    #[test]
    fn assessment_leaves_records_untouched_and_ordered() {
        let records = vec![
            record(1, "a@example.com", scenario_metrics()),
            record(2, "b@example.com", MetricValues::from_fn(|_| 0.0)),
        ];
        let results = assess(&records, &scenario_thresholds());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record, records[0]);
        assert_eq!(results[1].record, records[1]);
    }

    #[test]
    fn bar_series_averages_per_agent_in_first_seen_order() {
        let failing_attendance = MetricValues {
            attendance: 10.0,
            ..scenario_metrics()
        };
        let records = vec![
            record(1, "b@example.com", scenario_metrics()),
            record(2, "a@example.com", scenario_metrics()),
            record(3, "b@example.com", failing_attendance),
        ];
        let bars = score_by_agent(&assess(&records, &scenario_thresholds()));
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].agent_email, "b@example.com");
        assert_eq!(bars[0].record_count, 2);
        let expected = (100.0 + 1000.0 / 11.0) / 2.0;
        assert!((bars[0].average_score - expected).abs() < 1e-9);
        assert_eq!(bars[1].average_score, 100.0);
    }

    #[test]
    fn line_series_follows_record_order() {
        let records = vec![
            record(2, "a@example.com", scenario_metrics()),
            record(1, "a@example.com", MetricValues::from_fn(|_| 0.0)),
        ];
        let points = score_over_time(&assess(&records, &scenario_thresholds()));
        assert_eq!(points.iter().map(|point| point.record_id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(points[0].overall_score, 100.0);
    }
}
