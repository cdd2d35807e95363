use serde::Serialize;

use crate::schema::StructuredIncident;

pub const HIGH_RISK_KEYWORDS: [&str; 7] =
	["medical", "evacuation", "hazmat", "chemical", "fire", "explosion", "collapse"];
pub const IMMEDIATE_DANGER_KEYWORDS: [&str; 6] = [
	"active shooter",
	"bomb",
	"explosion",
	"structural collapse",
	"critical injury",
	"mass casualty",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskFlags {
	pub high_risk: bool,
	pub immediate_danger: bool,
}
impl RiskFlags {
	/// High risk looks at hazards and injuries; immediate danger looks at the raw report.
	pub fn assess(incident: &StructuredIncident, incident_text: &str) -> Self {
		let items = incident.hazards.iter().chain(incident.injuries.iter()).map(String::as_str);

		Self {
			high_risk: is_high_risk(items),
			immediate_danger: has_immediate_danger(incident_text),
		}
	}
}

pub fn is_high_risk<'a>(items: impl IntoIterator<Item = &'a str>) -> bool {
	items.into_iter().any(|item| contains_any(item, &HIGH_RISK_KEYWORDS))
}

pub fn has_immediate_danger(incident_text: &str) -> bool {
	contains_any(incident_text, &IMMEDIATE_DANGER_KEYWORDS)
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
	let lowered = text.to_lowercase();

	keywords.iter().any(|keyword| lowered.contains(keyword))
}
