//! Canned collaborator replies for the urban flooding incident.

pub const FLOOD_REPORT: &str = "Flood in downtown area. Water level rising. Multiple buildings affected. No injuries reported yet. Rain expected to continue.";

pub const INTAKE_FLOOD: &str = r#"```json
{
	"hazards": ["flood"],
	"injuries": "none",
	"infrastructure_status": ["buildings affected"],
	"weather": "rain continuing",
	"available_responders": [],
	"constraints": []
}
```"#;

pub const PLAN_FLOOD: &str = r#"Here is the plan:
{
	"objectives": ["Ensure life safety", "Monitor water levels"],
	"tasks": [
		{"task": "Establish incident command post", "priority": 1},
		{"task": "Evacuate residents from affected buildings", "priority": 1},
		{"task": "Assess damage to affected buildings", "priority": 2},
	],
	"resource_needs": [{"type": "Rescue boats", "quantity": 4, "priority": 1}, {"type": "Sandbags", "priority": 2}],
	"assumptions": ["Rain will continue for 6 hours"],
	"time_horizon": "0-2 hours",
	"safety_considerations": ["Avoid walking through moving water"]
}"#;

pub const COMMS_FLOOD: &str = r#"{
	"public_advisory": "Residents near downtown should move to higher ground and avoid flooded roads.",
	"internal_coordination": "Operations briefing: command post at city hall; evacuation teams to affected blocks.",
	"volunteer_message": "Volunteers needed at the downtown shelter for check-in.",
	"key_points": ["Move to higher ground", "Avoid flood water"]
}"#;

pub const VERIFY_FLOOD: &str = r#"```json
{
	"citation_coverage": "most_claims_cited",
	"confidence_score": 0.82,
	"flagged_issues": [],
	"multi_source_status": "not_applicable",
	"safety_override": null,
	"known_claims": ["Water level is rising downtown"],
	"unknown_claims": ["Number of residents still in affected buildings"],
	"safe_next_steps": ["Keep residents out of flood water"]
}
```"#;

pub const UNPARSEABLE: &str = "I am unable to produce a plan for this incident.";
