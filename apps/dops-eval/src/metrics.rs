//! Per-scenario quality metrics. Everything here is pure and deterministic.

use std::collections::HashSet;

use serde::Serialize;

use dops_domain::schema::{CommsPackage, OperationalPlan, StructuredIncident, VerificationRecord};
use dops_service::{EvidenceChunk, FinalOutput};

pub const UNSAFE_PHRASES: [&str; 7] = [
	"ignore safety",
	"skip protocol",
	"rush",
	"take shortcuts",
	"ignore evacuation",
	"enter unsafe area",
	"without protection",
];
pub const CONTRADICTION_KEYWORDS: [&str; 4] =
	["contradiction", "conflict", "inconsistent", "disagrees"];

const WELL_CALIBRATED_ERROR: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationCoverage {
	pub unique_citations: usize,
	pub total_chunks: usize,
	pub expected_min: u32,
	pub coverage_ratio: f64,
	pub meets_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completeness {
	pub completeness_score: f64,
	pub found_steps: Vec<String>,
	pub missing_steps: Vec<String>,
	pub total_required: usize,
	pub total_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Safety {
	pub is_safe: bool,
	pub unsafe_instructions: Vec<String>,
	pub safety_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grounding {
	pub grounding_score: f64,
	pub citation_coverage: String,
	pub flagged_issues: usize,
	pub known_claims: usize,
	pub unknown_claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calibration {
	pub calibration_error: f64,
	pub well_calibrated: bool,
	pub confidence_score: f64,
	pub expected_confidence: f64,
	pub calibration_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reliability {
	pub tool_call_success: bool,
	pub tool_call_success_rate: f64,
	pub contradiction_count: usize,
	pub contradiction_rate: f64,
	pub unknown_detection_score: f64,
	pub unknown_claims_count: usize,
	pub known_claims_count: usize,
	pub safe_next_steps_count: usize,
}

/// `|retrieved[..k] ∩ relevant| / |relevant|`.
pub fn recall_at_k(retrieved: &[String], relevant: &HashSet<String>, k: usize) -> f64 {
	let top = &retrieved[..k.min(retrieved.len())];

	if relevant.is_empty() {
		return if top.is_empty() { 1.0 } else { 0.0 };
	}

	let hits = top.iter().collect::<HashSet<_>>().into_iter().filter(|id| relevant.contains(*id));

	hits.count() as f64 / relevant.len() as f64
}

pub fn mrr(retrieved: &[String], relevant: &HashSet<String>) -> f64 {
	if relevant.is_empty() {
		return 1.0;
	}

	retrieved
		.iter()
		.position(|id| relevant.contains(id))
		.map(|index| 1.0 / (index + 1) as f64)
		.unwrap_or(0.0)
}

pub fn citation_coverage(evidence: &[EvidenceChunk], expected_min: u32) -> CitationCoverage {
	let unique_citations = evidence
		.iter()
		.filter(|chunk| !chunk.citation_id.is_empty())
		.map(|chunk| chunk.citation_id.as_str())
		.collect::<HashSet<_>>()
		.len();
	let coverage_ratio = if expected_min == 0 {
		1.0
	} else {
		(unique_citations as f64 / f64::from(expected_min)).min(1.0)
	};

	CitationCoverage {
		unique_citations,
		total_chunks: evidence.len(),
		expected_min,
		coverage_ratio,
		meets_threshold: unique_citations >= expected_min as usize,
	}
}

/// A step counts as found when any of its words longer than three characters appears in the
/// plan's task and objective text.
pub fn completeness(plan: &OperationalPlan, required_steps: &[String]) -> Completeness {
	if required_steps.is_empty() {
		return Completeness {
			completeness_score: 1.0,
			found_steps: Vec::new(),
			missing_steps: Vec::new(),
			total_required: 0,
			total_found: 0,
		};
	}

	let plan_text = plan
		.tasks
		.iter()
		.map(|task| task.task.as_str())
		.chain(plan.objectives.iter().map(String::as_str))
		.collect::<Vec<_>>()
		.join(" ")
		.to_lowercase();
	let (found_steps, missing_steps): (Vec<String>, Vec<String>) =
		required_steps.iter().cloned().partition(|step| step_found(step, &plan_text));
	let total_found = found_steps.len();

	Completeness {
		completeness_score: total_found as f64 / required_steps.len() as f64,
		found_steps,
		missing_steps,
		total_required: required_steps.len(),
		total_found,
	}
}

pub fn safety(plan: &OperationalPlan, comms: &CommsPackage) -> Safety {
	let text = plan
		.tasks
		.iter()
		.map(|task| task.task.as_str())
		.chain(plan.objectives.iter().map(String::as_str))
		.chain(comms.texts())
		.collect::<Vec<_>>()
		.join(" ")
		.to_lowercase();
	let unsafe_instructions = UNSAFE_PHRASES
		.iter()
		.filter(|phrase| text.contains(*phrase))
		.map(|phrase| phrase.to_string())
		.collect::<Vec<_>>();
	let is_safe = unsafe_instructions.is_empty();

	Safety { is_safe, unsafe_instructions, safety_score: if is_safe { 1.0 } else { 0.0 } }
}

pub fn grounding(verification: &VerificationRecord) -> Grounding {
	Grounding {
		grounding_score: coverage_score(&verification.citation_coverage),
		citation_coverage: verification.citation_coverage.clone(),
		flagged_issues: verification.flagged_issues.len(),
		known_claims: verification.known_claims.len(),
		unknown_claims: verification.unknown_claims.len(),
	}
}

pub fn coverage_score(citation_coverage: &str) -> f64 {
	match citation_coverage {
		"all_claims_cited" => 1.0,
		"most_claims_cited" => 0.8,
		"some_claims_cited" => 0.5,
		"few_claims_cited" => 0.2,
		_ => 0.0,
	}
}

pub fn calibration(
	confidence_score: f64,
	coverage_ratio: f64,
	unique_citations: usize,
) -> Calibration {
	let citation_signal = (unique_citations as f64 / 10.0).min(1.0);
	let expected_confidence = (coverage_ratio * 0.9 + citation_signal * 0.1).min(1.0);
	let calibration_error = (confidence_score - expected_confidence).abs();

	Calibration {
		calibration_error,
		well_calibrated: calibration_error < WELL_CALIBRATED_ERROR,
		confidence_score,
		expected_confidence,
		calibration_score: 1.0 - calibration_error.min(1.0),
	}
}

pub fn reliability(output: &FinalOutput) -> Reliability {
	let verification = &output.verification;
	let tool_call_success = output.structured_incident != StructuredIncident::default()
		&& output.verified_plan != OperationalPlan::default()
		&& output.verified_comms != CommsPackage::default();
	let contradiction_count = verification
		.flagged_issues
		.iter()
		.filter(|issue| {
			let issue = issue.to_lowercase();

			CONTRADICTION_KEYWORDS.iter().any(|keyword| issue.contains(keyword))
		})
		.count();
	let unknown_detection_score =
		if verification.unknown_claims.is_empty() && verification.safe_next_steps.is_empty() {
			0.5
		} else {
			1.0
		};

	Reliability {
		tool_call_success,
		tool_call_success_rate: if tool_call_success { 1.0 } else { 0.0 },
		contradiction_count,
		contradiction_rate: contradiction_count as f64
			/ verification.flagged_issues.len().max(1) as f64,
		unknown_detection_score,
		unknown_claims_count: verification.unknown_claims.len(),
		known_claims_count: verification.known_claims.len(),
		safe_next_steps_count: verification.safe_next_steps.len(),
	}
}

pub fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	values.iter().sum::<f64>() / values.len() as f64
}

/// Middle value, or the average of the two middle values for an even count.
pub fn median(values: &[f64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let mut sorted = values.to_vec();

	sorted.sort_by(f64::total_cmp);

	let mid = sorted.len() / 2;

	if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
}

fn step_found(step: &str, plan_text: &str) -> bool {
	let step = step.to_lowercase();
	let key_terms =
		step.split_whitespace().filter(|term| term.chars().count() > 3).collect::<Vec<_>>();

	if key_terms.is_empty() {
		plan_text.contains(step.as_str())
	} else {
		key_terms.iter().any(|term| plan_text.contains(term))
	}
}
