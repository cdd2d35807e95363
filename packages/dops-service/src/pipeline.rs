//! Fixed five-stage run: intake, retrieve, plan, communicate, verify.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	DopsService, Error, Result, prompts,
	retrieval::EvidenceChunk,
	verify::{self, FinalOutput, GroundingSignals, Reconciliation},
};
use dops_corpus::Corpus;
use dops_domain::{
	completion::Completion,
	schema::{CommsPackage, OperationalPlan, StructuredIncident},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Intake,
	Retrieve,
	Plan,
	Communicate,
	Verify,
}
impl Stage {
	pub const ORDER: [Self; 5] =
		[Self::Intake, Self::Retrieve, Self::Plan, Self::Communicate, Self::Verify];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Intake => "intake",
			Self::Retrieve => "retrieve",
			Self::Plan => "plan",
			Self::Communicate => "communicate",
			Self::Verify => "verify",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
	Ok,
	/// The collaborator reply could not be parsed; the stage used canonical defaults.
	Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Success,
	Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
	pub stage: Stage,
	pub outcome: StageOutcome,
	pub elapsed_ms: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
	pub incident_text: String,
}

/// The record threaded through the stages. Each stage writes only its own field.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
	pub incident_text: String,
	pub structured_incident: StructuredIncident,
	pub evidence: Vec<EvidenceChunk>,
	pub plan: OperationalPlan,
	pub comms: CommsPackage,
	pub final_output: FinalOutput,
}
impl PipelineState {
	pub fn new(incident_text: impl Into<String>) -> Self {
		Self { incident_text: incident_text.into(), ..Self::default() }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
	pub run_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	pub corpus_fingerprint: String,
	pub status: RunStatus,
	pub stages: Vec<StageReport>,
	pub structured_incident: StructuredIncident,
	pub evidence: Vec<EvidenceChunk>,
	pub plan: OperationalPlan,
	pub plan_summary: String,
	pub comms: CommsPackage,
	pub final_output: FinalOutput,
}

impl DopsService {
	pub async fn run(&self, req: RunRequest) -> Result<PipelineRun> {
		let incident_text = req.incident_text.trim();

		if incident_text.is_empty() {
			return Err(Error::InvalidRequest {
				message: "incident_text must be non-empty.".to_string(),
			});
		}

		let run_id = Uuid::new_v4();
		let started_at = OffsetDateTime::now_utc();
		let corpus = self.corpus().await?;
		let mut state = PipelineState::new(incident_text);
		let mut stages = Vec::with_capacity(Stage::ORDER.len());

		for stage in Stage::ORDER {
			let clock = Instant::now();
			let (outcome, detail) = match self.run_stage(stage, &mut state, &corpus).await? {
				None => (StageOutcome::Ok, None),
				Some(reason) => {
					tracing::warn!(
						%run_id,
						stage = stage.as_str(),
						%reason,
						"Completion could not be parsed. Using defaults."
					);

					(StageOutcome::Degraded, Some(reason))
				},
			};
			let elapsed_ms = clock.elapsed().as_millis() as u64;

			tracing::info!(%run_id, stage = stage.as_str(), elapsed_ms, "Stage finished.");

			stages.push(StageReport { stage, outcome, elapsed_ms, detail });
		}

		let status = if stages.iter().any(|report| report.outcome == StageOutcome::Degraded) {
			RunStatus::Degraded
		} else {
			RunStatus::Success
		};
		let PipelineState { structured_incident, evidence, plan, comms, final_output, .. } = state;

		tracing::info!(%run_id, ?status, evidence = evidence.len(), "Run finished.");

		Ok(PipelineRun {
			run_id,
			started_at,
			corpus_fingerprint: corpus.fingerprint().to_string(),
			status,
			stages,
			plan_summary: plan.render_summary(),
			structured_incident,
			evidence,
			plan,
			comms,
			final_output,
		})
	}

	/// Returns the parse failure reason when the stage had to fall back to defaults.
	async fn run_stage(
		&self,
		stage: Stage,
		state: &mut PipelineState,
		corpus: &Corpus,
	) -> Result<Option<String>> {
		match stage {
			Stage::Intake => {
				let reply =
					self.complete_json(&prompts::intake_messages(&state.incident_text)).await?;

				Ok(apply(reply, |draft| {
					state.structured_incident = StructuredIncident::from_draft(draft)
				}))
			},
			Stage::Retrieve => {
				state.evidence = self.retrieve_from(corpus, &state.structured_incident).await?;

				Ok(None)
			},
			Stage::Plan => {
				let messages = prompts::plan_messages(
					&state.structured_incident,
					&state.evidence,
					&self.cfg.pipeline,
				);
				let reply = self.complete_json(&messages).await?;

				Ok(apply(reply, |draft| state.plan = OperationalPlan::from_value(draft)))
			},
			Stage::Communicate => {
				let messages = prompts::comms_messages(&state.structured_incident, &state.plan);
				let reply = self.complete_json(&messages).await?;

				Ok(apply(reply, |draft| state.comms = CommsPackage::from_value(draft)))
			},
			Stage::Verify => {
				let signals = GroundingSignals::compute(
					&state.structured_incident,
					&state.evidence,
					&state.incident_text,
				);
				let messages = prompts::verify_messages(
					&state.structured_incident,
					&state.plan,
					&state.comms,
					&signals,
					&self.cfg.pipeline,
				);
				let reply = self.complete_json(&messages).await?;
				let (judgment, degraded) = match reply {
					Completion::Parsed(value) => (Some(value), None),
					Completion::Failed(failure) => (None, Some(failure.reason)),
				};

				state.final_output = verify::reconcile(Reconciliation {
					judgment: judgment.as_ref(),
					incident: &state.structured_incident,
					evidence: &state.evidence,
					plan: &state.plan,
					comms: &state.comms,
					signals: &signals,
					summary_citation_ids: self.cfg.pipeline.summary_citation_ids as usize,
				});

				Ok(degraded)
			},
		}
	}
}

fn apply<F>(reply: Completion, write: F) -> Option<String>
where
	F: FnOnce(&serde_json::Value),
{
	match reply {
		Completion::Parsed(value) => {
			write(&value);

			None
		},
		Completion::Failed(failure) => Some(failure.reason),
	}
}
