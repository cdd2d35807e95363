//! Grounding signals for the verifier and reconciliation of its judgment.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::retrieval::EvidenceChunk;
use dops_domain::{
	risk::RiskFlags,
	schema::{CommsPackage, OperationalPlan, StructuredIncident, VerificationRecord},
};

/// Deterministic facts computed before the verifier is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundingSignals {
	/// Distinct citation ids in order of first appearance.
	pub unique_citation_ids: Vec<String>,
	pub flags: RiskFlags,
}
impl GroundingSignals {
	pub fn compute(
		incident: &StructuredIncident,
		evidence: &[EvidenceChunk],
		incident_text: &str,
	) -> Self {
		Self {
			unique_citation_ids: unique_citation_ids(evidence),
			flags: RiskFlags::assess(incident, incident_text),
		}
	}

	pub fn unique_citations(&self) -> usize {
		self.unique_citation_ids.len()
	}

	pub fn citation_sample(&self, limit: usize) -> &[String] {
		&self.unique_citation_ids[..limit.min(self.unique_citation_ids.len())]
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSummary {
	pub total_chunks: usize,
	pub unique_citations: usize,
	pub citation_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
	pub verified_plan: OperationalPlan,
	pub verified_comms: CommsPackage,
	pub verification: VerificationRecord,
	pub structured_incident: StructuredIncident,
	pub evidence_summary: EvidenceSummary,
}

pub struct Reconciliation<'a> {
	pub judgment: Option<&'a Value>,
	pub incident: &'a StructuredIncident,
	pub evidence: &'a [EvidenceChunk],
	pub plan: &'a OperationalPlan,
	pub comms: &'a CommsPackage,
	pub signals: &'a GroundingSignals,
	pub summary_citation_ids: usize,
}

/// Folds the verifier's judgment into a complete output. Revisions that are not JSON objects
/// leave the original plan or comms in place; every verification field defaults on its own.
pub fn reconcile(args: Reconciliation<'_>) -> FinalOutput {
	let Reconciliation {
		judgment,
		incident,
		evidence,
		plan,
		comms,
		signals,
		summary_citation_ids,
	} = args;
	let revision = |key: &str| {
		judgment.and_then(|judgment| judgment.get(key)).filter(|value| value.is_object())
	};

	FinalOutput {
		verified_plan: revision("verified_plan")
			.map(OperationalPlan::from_value)
			.unwrap_or_else(|| plan.clone()),
		verified_comms: revision("verified_comms")
			.map(CommsPackage::from_value)
			.unwrap_or_else(|| comms.clone()),
		verification: judgment.map(VerificationRecord::from_judgment).unwrap_or_default(),
		structured_incident: incident.clone(),
		evidence_summary: EvidenceSummary {
			total_chunks: evidence.len(),
			unique_citations: signals.unique_citations(),
			citation_ids: signals.citation_sample(summary_citation_ids).to_vec(),
		},
	}
}

pub fn unique_citation_ids(evidence: &[EvidenceChunk]) -> Vec<String> {
	let mut seen = HashSet::new();

	evidence
		.iter()
		.filter(|chunk| seen.insert(chunk.citation_id.as_str()))
		.map(|chunk| chunk.citation_id.clone())
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn chunk(citation_id: &str) -> EvidenceChunk {
		EvidenceChunk {
			citation_id: citation_id.to_string(),
			text: String::new(),
			score: 0.5,
			word_count: 0,
			query: "q".to_string(),
		}
	}

	fn signals(evidence: &[EvidenceChunk]) -> GroundingSignals {
		GroundingSignals::compute(&StructuredIncident::default(), evidence, "")
	}

	#[test]
	fn unique_ids_keep_first_appearance() {
		let evidence = [chunk("b"), chunk("a"), chunk("b"), chunk("c")];

		assert_eq!(unique_citation_ids(&evidence), vec!["b", "a", "c"]);
	}

	#[test]
	fn non_object_revisions_keep_originals() {
		let evidence = [chunk("a"), chunk("a")];
		let signals = signals(&evidence);
		let plan = OperationalPlan::from_value(&json!({ "objectives": ["Ensure life safety"] }));
		let comms = CommsPackage::from_value(&json!({ "public_advisory": "Stay indoors." }));
		let judgment = json!({ "verified_plan": "looks fine", "verified_comms": null });
		let output = reconcile(Reconciliation {
			judgment: Some(&judgment),
			incident: &StructuredIncident::default(),
			evidence: &evidence,
			plan: &plan,
			comms: &comms,
			signals: &signals,
			summary_citation_ids: 20,
		});

		assert_eq!(output.verified_plan, plan);
		assert_eq!(output.verified_comms, comms);
		assert_eq!(output.evidence_summary.total_chunks, 2);
		assert_eq!(output.evidence_summary.unique_citations, 1);
	}

	#[test]
	fn summary_ids_are_capped() {
		let evidence = ["a", "b", "c"].map(chunk);
		let signals = signals(&evidence);
		let output = reconcile(Reconciliation {
			judgment: None,
			incident: &StructuredIncident::default(),
			evidence: &evidence,
			plan: &OperationalPlan::default(),
			comms: &CommsPackage::default(),
			signals: &signals,
			summary_citation_ids: 2,
		});

		assert_eq!(output.evidence_summary.citation_ids, vec!["a", "b"]);
		assert_eq!(output.verification, VerificationRecord::default());
	}
}
