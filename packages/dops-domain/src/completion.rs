use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const FENCED_OBJECT: &str = r"(?s)```(?:json)?\s*(\{.*?\})\s*```";
const BARE_OBJECT: &str = r"(?s)\{.*\}";
const TRAILING_COMMA_OBJECT: &str = r",\s*\}";
const TRAILING_COMMA_ARRAY: &str = r",\s*\]";

/// Outcome of reading a JSON object out of collaborator text.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
	Parsed(Value),
	Failed(ParseFailure),
}
impl Completion {
	pub fn is_parsed(&self) -> bool {
		matches!(self, Self::Parsed(_))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
	pub raw: String,
	pub reason: String,
}

/// Extracts and parses the JSON object in a completion.
///
/// A fenced block wins over the outermost brace span. One repair pass drops trailing
/// commas before giving up.
pub fn parse_completion(raw: &str) -> Completion {
	let content = raw.trim();
	let candidate = extract_object(content).unwrap_or(content);
	let first_error = match parse_object(candidate) {
		Ok(value) => return Completion::Parsed(value),
		Err(reason) => reason,
	};
	let repaired = strip_trailing_commas(candidate);

	if repaired == candidate {
		return Completion::Failed(ParseFailure { raw: raw.to_string(), reason: first_error });
	}

	match parse_object(&repaired) {
		Ok(value) => Completion::Parsed(value),
		Err(_) => Completion::Failed(ParseFailure { raw: raw.to_string(), reason: first_error }),
	}
}

fn extract_object(content: &str) -> Option<&str> {
	let fenced = Regex::new(FENCED_OBJECT)
		.ok()
		.and_then(|re| re.captures(content))
		.and_then(|captures| captures.get(1))
		.map(|found| found.as_str());

	fenced.or_else(|| {
		Regex::new(BARE_OBJECT).ok().and_then(|re| re.find(content)).map(|found| found.as_str())
	})
}

fn parse_object(candidate: &str) -> Result<Value, String> {
	match serde_json::from_str::<Value>(candidate) {
		Ok(value @ Value::Object(_)) => Ok(value),
		Ok(_) => Err("Completion JSON is not an object.".to_string()),
		Err(err) => Err(err.to_string()),
	}
}

fn strip_trailing_commas(candidate: &str) -> String {
	let mut repaired = candidate.to_string();

	for (pattern, replacement) in [(TRAILING_COMMA_OBJECT, "}"), (TRAILING_COMMA_ARRAY, "]")] {
		if let Ok(re) = Regex::new(pattern) {
			repaired = re.replace_all(&repaired, replacement).into_owned();
		}
	}

	repaired
}
