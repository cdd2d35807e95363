//! Canonical records for everything the text-completion collaborator produces.
//!
//! Drafts arrive as loosely-typed JSON. Each record is coerced exactly once, at ingestion,
//! and every field carries a default so downstream stages never see a missing value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TASK_PRIORITY: u32 = 3;
pub const DEFAULT_TIME_HORIZON: &str = "Not specified";
pub const DEFAULT_CITATION_COVERAGE: &str = "unknown";
pub const DEFAULT_CONFIDENCE_SCORE: f64 = 0.5;
pub const DEFAULT_MULTI_SOURCE_STATUS: &str = "not_applicable";

const NONE_TOKENS: [&str; 4] = ["none", "n/a", "na", ""];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredIncident {
	pub hazards: Vec<String>,
	pub injuries: Vec<String>,
	pub infrastructure_status: Vec<String>,
	pub weather: String,
	pub available_responders: Vec<String>,
	pub constraints: Vec<String>,
}
impl StructuredIncident {
	pub fn from_draft(draft: &Value) -> Self {
		Self {
			hazards: string_list(draft.get("hazards")),
			injuries: string_list(draft.get("injuries")),
			infrastructure_status: string_list(draft.get("infrastructure_status")),
			weather: weather_text(draft.get("weather")),
			available_responders: string_list(draft.get("available_responders")),
			constraints: string_list(draft.get("constraints")),
		}
	}

	/// A lone literal `"none"` entry does not count as an injury report.
	pub fn has_injuries(&self) -> bool {
		match self.injuries.as_slice() {
			[] => false,
			[only] => only != "none",
			_ => true,
		}
	}

	pub fn weather_or_unknown(&self) -> &str {
		if self.weather.is_empty() { "Unknown" } else { &self.weather }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTask {
	pub task: String,
	pub priority: u32,
}
impl PlanTask {
	pub fn from_value(value: &Value) -> Self {
		match value {
			Value::Object(fields) => Self {
				task: fields.get("task").map(value_text).unwrap_or_else(|| value.to_string()),
				priority: priority_of(fields.get("priority")),
			},
			other => Self { task: value_text(other), priority: DEFAULT_TASK_PRIORITY },
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNeed {
	#[serde(rename = "type")]
	pub resource_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quantity: Option<String>,
	pub priority: u32,
}
impl ResourceNeed {
	pub fn from_value(value: &Value) -> Self {
		match value {
			Value::Object(fields) => Self {
				resource_type: fields
					.get("type")
					.map(value_text)
					.unwrap_or_else(|| value.to_string()),
				quantity: present(fields.get("quantity")).map(value_text),
				priority: priority_of(fields.get("priority")),
			},
			other => Self {
				resource_type: value_text(other),
				quantity: None,
				priority: DEFAULT_TASK_PRIORITY,
			},
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalPlan {
	pub objectives: Vec<String>,
	pub tasks: Vec<PlanTask>,
	pub resource_needs: Vec<ResourceNeed>,
	pub assumptions: Vec<String>,
	pub time_horizon: String,
	pub safety_considerations: Vec<String>,
}
impl OperationalPlan {
	pub fn from_value(value: &Value) -> Self {
		let tasks = normalize_to_list(value.get("tasks").unwrap_or(&Value::Null), &[]);
		let resource_needs =
			normalize_to_list(value.get("resource_needs").unwrap_or(&Value::Null), &[]);

		Self {
			objectives: string_list(value.get("objectives")),
			tasks: tasks.iter().map(PlanTask::from_value).collect(),
			resource_needs: resource_needs.iter().map(ResourceNeed::from_value).collect(),
			assumptions: string_list(value.get("assumptions")),
			time_horizon: present(value.get("time_horizon"))
				.map(value_text)
				.filter(|horizon| !horizon.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_TIME_HORIZON.to_string()),
			safety_considerations: string_list(value.get("safety_considerations")),
		}
	}

	pub fn key_tasks(&self, limit: usize) -> Vec<&str> {
		self.tasks.iter().take(limit).map(|task| task.task.as_str()).collect()
	}

	/// Plain-text briefing of the plan. Only priority-1 tasks and resources are listed.
	pub fn render_summary(&self) -> String {
		let top_tasks = self
			.tasks
			.iter()
			.filter(|task| task.priority == 1)
			.map(|task| task.task.as_str())
			.collect::<Vec<_>>();
		let top_resources = self
			.resource_needs
			.iter()
			.filter(|need| need.priority == 1)
			.map(|need| need.resource_type.as_str())
			.collect::<Vec<_>>();

		format!(
			"Operational Plan\n\nTime Horizon: {}\n\nObjectives:\n{}\n\nKey Tasks (Priority 1):\n{}\n\nResource Needs (Priority 1):\n{}\n\nSafety Considerations:\n{}\n\nAssumptions:\n{}\n",
			self.time_horizon,
			bullets(self.objectives.iter().map(String::as_str)),
			bullets(top_tasks),
			bullets(top_resources),
			bullets(self.safety_considerations.iter().map(String::as_str)),
			bullets(self.assumptions.iter().map(String::as_str)),
		)
	}
}
impl Default for OperationalPlan {
	fn default() -> Self {
		Self {
			objectives: Vec::new(),
			tasks: Vec::new(),
			resource_needs: Vec::new(),
			assumptions: Vec::new(),
			time_horizon: DEFAULT_TIME_HORIZON.to_string(),
			safety_considerations: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommsPackage {
	pub public_advisory: String,
	pub internal_coordination: String,
	pub volunteer_message: String,
	pub key_points: Vec<String>,
}
impl CommsPackage {
	pub fn from_value(value: &Value) -> Self {
		Self {
			public_advisory: text_field(value.get("public_advisory")),
			internal_coordination: text_field(value.get("internal_coordination")),
			volunteer_message: text_field(value.get("volunteer_message")),
			key_points: string_list(value.get("key_points")),
		}
	}

	pub fn texts(&self) -> [&str; 3] {
		[&self.public_advisory, &self.internal_coordination, &self.volunteer_message]
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
	pub citation_coverage: String,
	pub confidence_score: f64,
	pub flagged_issues: Vec<String>,
	pub multi_source_status: String,
	pub safety_override: Option<String>,
	pub known_claims: Vec<String>,
	pub unknown_claims: Vec<String>,
	pub safe_next_steps: Vec<String>,
}
impl VerificationRecord {
	/// Reads every field from the verifier's judgment, defaulting each one independently.
	/// Values are taken as given; the confidence score is not clamped.
	pub fn from_judgment(judgment: &Value) -> Self {
		let defaults = Self::default();

		Self {
			citation_coverage: present(judgment.get("citation_coverage"))
				.map(value_text)
				.unwrap_or(defaults.citation_coverage),
			confidence_score: present(judgment.get("confidence_score"))
				.and_then(number_of)
				.unwrap_or(defaults.confidence_score),
			flagged_issues: string_list(judgment.get("flagged_issues")),
			multi_source_status: present(judgment.get("multi_source_status"))
				.map(value_text)
				.unwrap_or(defaults.multi_source_status),
			safety_override: present(judgment.get("safety_override"))
				.map(value_text)
				.filter(|text| !text.trim().is_empty()),
			known_claims: string_list(judgment.get("known_claims")),
			unknown_claims: string_list(judgment.get("unknown_claims")),
			safe_next_steps: string_list(judgment.get("safe_next_steps")),
		}
	}
}
impl Default for VerificationRecord {
	fn default() -> Self {
		Self {
			citation_coverage: DEFAULT_CITATION_COVERAGE.to_string(),
			confidence_score: DEFAULT_CONFIDENCE_SCORE,
			flagged_issues: Vec::new(),
			multi_source_status: DEFAULT_MULTI_SOURCE_STATUS.to_string(),
			safety_override: None,
			known_claims: Vec::new(),
			unknown_claims: Vec::new(),
			safe_next_steps: Vec::new(),
		}
	}
}

/// Coerces a loosely-typed value into a list.
///
/// Lists pass through unchanged, null yields `default`, none-like strings yield an empty
/// list, and any other truthy scalar becomes a singleton. Falsy scalars yield `default`.
pub fn normalize_to_list(value: &Value, default: &[Value]) -> Vec<Value> {
	match value {
		Value::Array(items) => items.clone(),
		Value::Null => default.to_vec(),
		Value::String(text) if is_none_token(text) => Vec::new(),
		other if is_truthy(other) => vec![other.clone()],
		_ => default.to_vec(),
	}
}

/// [`normalize_to_list`] with every item rendered as text.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
	normalize_to_list(value.unwrap_or(&Value::Null), &[]).iter().map(value_text).collect()
}

/// Strings render as themselves; everything else renders as compact JSON.
pub fn value_text(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

fn is_none_token(text: &str) -> bool {
	let token = text.trim().to_lowercase();

	NONE_TOKENS.contains(&token.as_str())
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().map(|number| number != 0.0).unwrap_or(true),
		Value::String(text) => !text.is_empty(),
		Value::Array(items) => !items.is_empty(),
		Value::Object(fields) => !fields.is_empty(),
	}
}

fn present(value: Option<&Value>) -> Option<&Value> {
	value.filter(|value| !value.is_null())
}

fn number_of(value: &Value) -> Option<f64> {
	let number = match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse::<f64>().ok(),
		_ => None,
	};

	number.filter(|number| number.is_finite())
}

fn priority_of(value: Option<&Value>) -> u32 {
	let parsed = match value {
		Some(Value::Number(number)) => number.as_i64().or_else(|| {
			number.as_f64().filter(|raw| raw.is_finite()).map(|raw| raw.round() as i64)
		}),
		Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
		_ => None,
	};

	parsed
		.map(|priority| priority.clamp(1, i64::from(u32::MAX)) as u32)
		.unwrap_or(DEFAULT_TASK_PRIORITY)
}

fn text_field(value: Option<&Value>) -> String {
	present(value).map(value_text).unwrap_or_default()
}

fn weather_text(value: Option<&Value>) -> String {
	match present(value) {
		None => String::new(),
		Some(Value::Array(items)) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
		Some(other) => value_text(other),
	}
}

fn bullets<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
	items.into_iter().map(|item| format!("  - {item}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn none_like_tokens_become_empty() {
		for token in ["none", "None", " N/A ", "na", "NA", ""] {
			assert!(normalize_to_list(&json!(token), &[json!("fallback")]).is_empty(), "{token:?}");
		}
	}

	#[test]
	fn truthy_scalars_become_singletons() {
		assert_eq!(normalize_to_list(&json!("flood"), &[]), vec![json!("flood")]);
		assert_eq!(normalize_to_list(&json!(7), &[]), vec![json!(7)]);
		assert_eq!(normalize_to_list(&json!(true), &[]), vec![json!(true)]);
		assert_eq!(normalize_to_list(&json!({ "a": 1 }), &[]), vec![json!({ "a": 1 })]);
	}

	#[test]
	fn falsy_scalars_and_null_fall_back_to_default() {
		let default = [json!("fallback")];

		assert_eq!(normalize_to_list(&Value::Null, &default), default.to_vec());
		assert_eq!(normalize_to_list(&json!(false), &default), default.to_vec());
		assert_eq!(normalize_to_list(&json!(0), &default), default.to_vec());
		assert_eq!(normalize_to_list(&json!({}), &default), default.to_vec());
	}

	#[test]
	fn lists_pass_through_unchanged() {
		let list = json!(["none", 3, null]);

		assert_eq!(normalize_to_list(&list, &[]), vec![json!("none"), json!(3), Value::Null]);
	}

	#[test]
	fn task_priority_is_coerced() {
		assert_eq!(PlanTask::from_value(&json!({ "task": "a", "priority": "2" })).priority, 2);
		assert_eq!(PlanTask::from_value(&json!({ "task": "a", "priority": 0 })).priority, 1);
		assert_eq!(PlanTask::from_value(&json!({ "task": "a", "priority": "high" })).priority, 3);
		assert_eq!(PlanTask::from_value(&json!({ "task": "a" })).priority, 3);
		assert_eq!(PlanTask::from_value(&json!("Open shelter")).priority, DEFAULT_TASK_PRIORITY);
	}
}
