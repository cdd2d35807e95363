pub mod metrics;
pub mod report;

use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::metrics::{Calibration, CitationCoverage, Completeness, Grounding, Reliability, Safety};
use dops_domain::schema::VerificationRecord;
use dops_service::{DopsService, PipelineRun, RunRequest, RunStatus};

const DEFAULT_CITATIONS_MIN: u32 = 5;

type Scored<'a> = (&'a RetrievalMetrics, &'a PlanQuality, &'a Reliability);

#[derive(Debug, Parser)]
#[command(
	version = dops_cli::VERSION,
	rename_all = "kebab",
	styles = dops_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N", default_value_t = 5)]
	pub recall_k: u32,
	/// Output prefix; `<PREFIX>.json` and `<PREFIX>.md` are written when set.
	#[arg(long, value_name = "PREFIX")]
	pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalDataset {
	pub name: Option<String>,
	pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
	pub name: String,
	/// The free-text incident report fed to the pipeline.
	pub description: String,
	#[serde(default)]
	pub expected_hazards: Vec<String>,
	#[serde(default)]
	pub expected_injuries: Vec<String>,
	#[serde(default)]
	pub required_steps: Vec<String>,
	#[serde(default)]
	pub required_resources: Vec<String>,
	#[serde(default = "default_citations_min")]
	pub expected_citations_min: u32,
	#[serde(default)]
	pub risk_level: String,
	/// Ground-truth citations. Without them every retrieved citation counts as relevant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub relevant_citations: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub generated_at: String,
	pub dataset: EvalDatasetInfo,
	pub settings: EvalSettings,
	pub summary: EvalSummary,
	pub scenarios: Vec<ScenarioReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalDatasetInfo {
	pub name: String,
	pub scenario_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSettings {
	pub config_path: String,
	pub recall_k: u32,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub total_scenarios: usize,
	pub successful: usize,
	pub failed: usize,
	pub degraded: usize,
	pub total_time_ms: f64,
	pub avg_time_per_scenario_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retrieval: Option<RetrievalSummary>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub plan_quality: Option<PlanQualitySummary>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reliability: Option<ReliabilitySummary>,
}

#[derive(Debug, Serialize)]
pub struct RetrievalSummary {
	pub avg_recall_at_k: f64,
	pub avg_mrr: f64,
	pub median_recall_at_k: f64,
	pub median_mrr: f64,
}

#[derive(Debug, Serialize)]
pub struct PlanQualitySummary {
	pub avg_completeness: f64,
	pub avg_safety: f64,
	pub avg_grounding: f64,
	pub avg_calibration: f64,
	pub median_completeness: f64,
	pub median_safety: f64,
	pub median_grounding: f64,
	pub median_calibration: f64,
}

#[derive(Debug, Serialize)]
pub struct ReliabilitySummary {
	pub avg_tool_call_success_rate: f64,
	pub total_contradictions: usize,
	pub avg_contradiction_rate: f64,
	pub avg_unknown_detection: f64,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
	pub scenario_name: String,
	pub success: bool,
	pub processing_time_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<RunStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retrieval: Option<RetrievalMetrics>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub plan_quality: Option<PlanQuality>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reliability: Option<Reliability>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification: Option<VerificationRecord>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RetrievalMetrics {
	pub k: u32,
	pub recall_at_k: f64,
	pub mrr: f64,
	pub citation_coverage: CitationCoverage,
	pub total_retrieved: usize,
}

#[derive(Debug, Serialize)]
pub struct PlanQuality {
	pub completeness: Completeness,
	pub safety: Safety,
	pub grounding: Grounding,
	pub calibration: Calibration,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = dops_config::load(&args.config)?;

	dops_cli::init_tracing(&config.service.log_level);

	let dataset = load_dataset(&args.dataset)?;
	let service = DopsService::new(config);
	let output = evaluate(&service, &dataset, &args.config, args.recall_k).await;

	if let Some(prefix) = &args.report {
		let (json_path, md_path) = report::write(prefix, &output)?;

		tracing::info!(
			json = %json_path.display(),
			markdown = %md_path.display(),
			"Report written."
		);
	}

	let json = serde_json::to_string_pretty(&output.summary)?;

	println!("{json}");

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.scenarios.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one scenario."));
	}

	Ok(dataset)
}

/// Runs every scenario in order. A failed run is recorded, never propagated.
pub async fn evaluate(
	service: &DopsService,
	dataset: &EvalDataset,
	config_path: &Path,
	recall_k: u32,
) -> EvalOutput {
	let clock = Instant::now();
	let mut reports = Vec::with_capacity(dataset.scenarios.len());

	for (index, scenario) in dataset.scenarios.iter().enumerate() {
		tracing::info!(
			scenario = %scenario.name,
			position = index + 1,
			total = dataset.scenarios.len(),
			"Evaluating scenario."
		);

		reports.push(evaluate_scenario(service, scenario, recall_k).await);
	}

	let total_time_ms = clock.elapsed().as_secs_f64() * 1_000.0;

	EvalOutput {
		generated_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
			scenario_count: dataset.scenarios.len(),
		},
		settings: EvalSettings { config_path: config_path.display().to_string(), recall_k },
		summary: summarize(&reports, total_time_ms),
		scenarios: reports,
	}
}

pub async fn evaluate_scenario(
	service: &DopsService,
	scenario: &Scenario,
	recall_k: u32,
) -> ScenarioReport {
	let clock = Instant::now();
	let result = service.run(RunRequest { incident_text: scenario.description.clone() }).await;
	let processing_time_ms = clock.elapsed().as_secs_f64() * 1_000.0;

	match result {
		Ok(run) => score_run(scenario, &run, recall_k, processing_time_ms),
		Err(err) => {
			tracing::warn!(scenario = %scenario.name, error = %err, "Scenario failed.");

			ScenarioReport {
				scenario_name: scenario.name.clone(),
				success: false,
				processing_time_ms,
				status: None,
				retrieval: None,
				plan_quality: None,
				reliability: None,
				verification: None,
				error: Some(err.to_string()),
			}
		},
	}
}

pub fn score_run(
	scenario: &Scenario,
	run: &PipelineRun,
	recall_k: u32,
	processing_time_ms: f64,
) -> ScenarioReport {
	let output = &run.final_output;
	let retrieved = run
		.evidence
		.iter()
		.filter(|chunk| !chunk.citation_id.is_empty())
		.map(|chunk| chunk.citation_id.clone())
		.collect::<Vec<_>>();
	let relevant = match &scenario.relevant_citations {
		Some(relevant) => relevant.iter().cloned().collect::<HashSet<_>>(),
		None => retrieved.iter().cloned().collect(),
	};
	let citation_coverage =
		metrics::citation_coverage(&run.evidence, scenario.expected_citations_min);
	let calibration = metrics::calibration(
		output.verification.confidence_score,
		citation_coverage.coverage_ratio,
		output.evidence_summary.unique_citations,
	);
	let retrieval = RetrievalMetrics {
		k: recall_k,
		recall_at_k: metrics::recall_at_k(&retrieved, &relevant, recall_k as usize),
		mrr: metrics::mrr(&retrieved, &relevant),
		citation_coverage,
		total_retrieved: retrieved.len(),
	};
	let plan_quality = PlanQuality {
		completeness: metrics::completeness(&output.verified_plan, &scenario.required_steps),
		safety: metrics::safety(&output.verified_plan, &output.verified_comms),
		grounding: metrics::grounding(&output.verification),
		calibration,
	};

	ScenarioReport {
		scenario_name: scenario.name.clone(),
		success: true,
		processing_time_ms,
		status: Some(run.status),
		retrieval: Some(retrieval),
		plan_quality: Some(plan_quality),
		reliability: Some(metrics::reliability(output)),
		verification: Some(output.verification.clone()),
		error: None,
	}
}

/// Aggregates over successful scenarios only. Metric sections are absent when none succeeded.
pub fn summarize(reports: &[ScenarioReport], total_time_ms: f64) -> EvalSummary {
	let scored = reports
		.iter()
		.filter_map(|report| match (&report.retrieval, &report.plan_quality, &report.reliability) {
			(Some(retrieval), Some(plan_quality), Some(reliability)) =>
				Some((retrieval, plan_quality, reliability)),
			_ => None,
		})
		.collect::<Vec<_>>();
	let successful = scored.len();
	let degraded =
		reports.iter().filter(|report| report.status == Some(RunStatus::Degraded)).count();
	let mut summary = EvalSummary {
		total_scenarios: reports.len(),
		successful,
		failed: reports.len() - successful,
		degraded,
		total_time_ms,
		avg_time_per_scenario_ms: total_time_ms / reports.len().max(1) as f64,
		retrieval: None,
		plan_quality: None,
		reliability: None,
	};

	if scored.is_empty() {
		return summary;
	}

	let recall = scores(&scored, |(retrieval, _, _)| retrieval.recall_at_k);
	let mrr = scores(&scored, |(retrieval, _, _)| retrieval.mrr);
	let completeness = scores(&scored, |(_, quality, _)| quality.completeness.completeness_score);
	let safety = scores(&scored, |(_, quality, _)| quality.safety.safety_score);
	let grounding = scores(&scored, |(_, quality, _)| quality.grounding.grounding_score);
	let calibration = scores(&scored, |(_, quality, _)| quality.calibration.calibration_score);
	let tool_call_success =
		scores(&scored, |(_, _, reliability)| reliability.tool_call_success_rate);
	let contradiction_rate = scores(&scored, |(_, _, reliability)| reliability.contradiction_rate);
	let unknown_detection =
		scores(&scored, |(_, _, reliability)| reliability.unknown_detection_score);

	summary.retrieval = Some(RetrievalSummary {
		avg_recall_at_k: metrics::mean(&recall),
		avg_mrr: metrics::mean(&mrr),
		median_recall_at_k: metrics::median(&recall),
		median_mrr: metrics::median(&mrr),
	});
	summary.plan_quality = Some(PlanQualitySummary {
		avg_completeness: metrics::mean(&completeness),
		avg_safety: metrics::mean(&safety),
		avg_grounding: metrics::mean(&grounding),
		avg_calibration: metrics::mean(&calibration),
		median_completeness: metrics::median(&completeness),
		median_safety: metrics::median(&safety),
		median_grounding: metrics::median(&grounding),
		median_calibration: metrics::median(&calibration),
	});
	summary.reliability = Some(ReliabilitySummary {
		avg_tool_call_success_rate: metrics::mean(&tool_call_success),
		total_contradictions: scored
			.iter()
			.map(|(_, _, reliability)| reliability.contradiction_count)
			.sum(),
		avg_contradiction_rate: metrics::mean(&contradiction_rate),
		avg_unknown_detection: metrics::mean(&unknown_detection),
	});

	summary
}

fn scores<F>(scored: &[Scored<'_>], metric: F) -> Vec<f64>
where
	F: Fn(&Scored<'_>) -> f64,
{
	scored.iter().map(metric).collect()
}

fn default_citations_min() -> u32 {
	DEFAULT_CITATIONS_MIN
}
