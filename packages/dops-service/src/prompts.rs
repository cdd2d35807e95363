use serde_json::Value;

use crate::{retrieval::EvidenceChunk, verify::GroundingSignals};
use dops_config::Pipeline;
use dops_domain::schema::{CommsPackage, OperationalPlan, StructuredIncident};

const COMMS_KEY_TASKS: usize = 5;

const INTAKE_SYSTEM: &str = "You are an emergency response intake specialist. Extract key information from incident reports and structure it.
Return ONLY valid JSON (no markdown, no explanations) with these fields:
- hazards: list of hazards present (always a list, even if empty: [])
- injuries: list of injuries (always a list; use [] if none, not \"none\" or null)
- infrastructure_status: list of infrastructure impacts (always a list)
- weather: current or expected weather conditions (string)
- available_responders: list of available responder types (always a list)
- constraints: list of constraints or limitations (always a list)

All list fields must be arrays, never strings or null.

Example: {\"hazards\": [\"flood\"], \"injuries\": [], \"infrastructure_status\": [\"buildings affected\"], \"weather\": \"rain continuing\", \"available_responders\": [], \"constraints\": []}";

const PLAN_SYSTEM: &str = "You are an emergency response planner. Generate an operational plan based on incident data and evidence from authoritative sources.

Return ONLY valid JSON with these fields:
- objectives: list of operational objectives (prioritized)
- tasks: list of specific tasks with priorities (1=highest, 3=lowest)
- resource_needs: list of resources needed (type, quantity if known, priority)
- assumptions: list of assumptions made
- time_horizon: operational period focus (e.g. \"0-2 hours\", \"2-6 hours\")
- safety_considerations: list of safety concerns

Example: {\"objectives\": [\"Ensure life safety\", \"Establish triage\"], \"tasks\": [{\"task\": \"Set up triage area\", \"priority\": 1}], \"resource_needs\": [{\"type\": \"Medical supplies\", \"priority\": 1}], \"assumptions\": [\"Weather will continue\"], \"time_horizon\": \"0-2 hours\", \"safety_considerations\": [\"Flooding may worsen\"]}";

const COMMS_SYSTEM: &str = "You are a communications specialist for emergency management. Generate clear, accessible messaging for different audiences.

Return ONLY valid JSON with these fields:
- public_advisory: public-facing message (clear, non-technical, actionable)
- internal_coordination: internal message for responder coordination (more technical)
- volunteer_message: message for volunteer coordination (if applicable)
- key_points: list of key points to emphasize (3-5 items)

Example: {\"public_advisory\": \"Residents are advised to...\", \"internal_coordination\": \"Operations briefing: ...\", \"volunteer_message\": \"Volunteers needed for...\", \"key_points\": [\"Safety first\", \"Stay informed\"]}";

const VERIFY_SYSTEM: &str = "You are a verification specialist for emergency operations. Validate operational plans and flag issues.

Return ONLY valid JSON with these fields:
- verified_plan: the operational plan (copy if valid, flag issues if not)
- verified_comms: the communications (copy if valid, flag issues if not)
- citation_coverage: one of \"all_claims_cited\", \"most_claims_cited\", \"some_claims_cited\", \"few_claims_cited\"
- confidence_score: overall confidence (0.0-1.0)
- flagged_issues: list of issues found (e.g. \"missing_citation\", \"low_confidence\", \"contradiction\")
- multi_source_status: for high-risk topics, whether 2+ independent sources exist (\"validated\", \"insufficient_sources\", \"not_applicable\")
- safety_override: \"CALL_911_IMMEDIATELY\" if immediate danger is detected, else null
- known_claims: claims supported by citations
- unknown_claims: claims without sufficient evidence
- safe_next_steps: recommended safe actions even with uncertainty";

pub fn intake_messages(incident_text: &str) -> Vec<Value> {
	messages(INTAKE_SYSTEM, format!("Incident report: {incident_text}"))
}

pub fn plan_messages(
	incident: &StructuredIncident,
	evidence: &[EvidenceChunk],
	pipeline: &Pipeline,
) -> Vec<Value> {
	let excerpt_chars = pipeline.evidence_excerpt_chars as usize;
	let evidence_text = evidence
		.iter()
		.take(pipeline.planner_evidence_chunks as usize)
		.map(|chunk| {
			format!(
				"[Citation: {}]\n{}",
				chunk.citation_id,
				chunk.text.chars().take(excerpt_chars).collect::<String>()
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n");
	let user = format!(
		"Incident Data:\n{}\n\nEvidence from Knowledge Base:\n{evidence_text}\n\nGenerate an operational plan based on this information. Use the evidence to support your recommendations. Prioritize life safety first.",
		incident_summary(incident)
	);

	messages(PLAN_SYSTEM, user)
}

pub fn comms_messages(incident: &StructuredIncident, plan: &OperationalPlan) -> Vec<Value> {
	let user = format!(
		"Incident Data:\nHazards: {}\nInjuries: {}\nInfrastructure: {}\nWeather: {}\n\nOperational Plan:\nObjectives: {}\nKey Tasks: {}\nSafety Considerations: {}\n\nGenerate messaging for public, internal coordination, and volunteers. Use clear, accessible language for public messages. Include actionable guidance.",
		list(&incident.hazards),
		list(&incident.injuries),
		list(&incident.infrastructure_status),
		incident.weather_or_unknown(),
		list(&plan.objectives),
		list(&plan.key_tasks(COMMS_KEY_TASKS)),
		list(&plan.safety_considerations),
	);

	messages(COMMS_SYSTEM, user)
}

pub fn verify_messages(
	incident: &StructuredIncident,
	plan: &OperationalPlan,
	comms: &CommsPackage,
	signals: &GroundingSignals,
	pipeline: &Pipeline,
) -> Vec<Value> {
	let user = format!(
		"Incident Data:\nHazards: {}\nInjuries: {}\nInfrastructure: {}\n\nOperational Plan:\n{}\n\nCommunications:\n{}\n\nEvidence Citations Available: {} unique sources\nUnique Citations: {}\n\nHigh-Risk Topic Detected: {}\nImmediate Danger Detected: {}\n\nValidate the plan and communications.",
		list(&incident.hazards),
		list(&incident.injuries),
		list(&incident.infrastructure_status),
		pretty(plan),
		pretty(comms),
		signals.unique_citations(),
		signals.citation_sample(pipeline.verifier_citation_sample as usize).join(", "),
		signals.flags.high_risk,
		signals.flags.immediate_danger,
	);

	messages(VERIFY_SYSTEM, user)
}

fn incident_summary(incident: &StructuredIncident) -> String {
	format!(
		"Hazards: {}\nInjuries: {}\nInfrastructure Status: {}\nWeather: {}\nAvailable Responders: {}\nConstraints: {}",
		list(&incident.hazards),
		list(&incident.injuries),
		list(&incident.infrastructure_status),
		incident.weather_or_unknown(),
		list(&incident.available_responders),
		list(&incident.constraints),
	)
}

fn messages(system: &str, user: String) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

fn list<S>(items: &[S]) -> String
where
	S: AsRef<str>,
{
	format!("[{}]", items.iter().map(|item| item.as_ref()).collect::<Vec<_>>().join(", "))
}

fn pretty<T>(value: &T) -> String
where
	T: serde::Serialize,
{
	serde_json::to_string_pretty(value).unwrap_or_default()
}
