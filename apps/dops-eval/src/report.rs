use std::{
	fmt::Write as _,
	fs,
	path::{Path, PathBuf},
};

use crate::EvalOutput;

/// Writes `<prefix>.json` and `<prefix>.md`, creating parent directories as needed.
pub fn write(prefix: &Path, output: &EvalOutput) -> color_eyre::Result<(PathBuf, PathBuf)> {
	if let Some(parent) = prefix.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		fs::create_dir_all(parent)?;
	}

	let json_path = prefix.with_extension("json");
	let md_path = prefix.with_extension("md");

	fs::write(&json_path, serde_json::to_string_pretty(output)?)?;
	fs::write(&md_path, render_markdown(output))?;

	Ok((json_path, md_path))
}

pub fn render_markdown(output: &EvalOutput) -> String {
	let summary = &output.summary;
	let mut md = String::new();

	let _ = writeln!(md, "# DisasterOps Evaluation Report\n");
	let _ = writeln!(md, "**Generated:** {}", output.generated_at);
	let _ = writeln!(md, "**Dataset:** {}\n", output.dataset.name);
	let _ = writeln!(md, "## Executive Summary\n");
	let _ = writeln!(md, "- **Total Scenarios:** {}", summary.total_scenarios);
	let _ = writeln!(md, "- **Successful:** {}", summary.successful);
	let _ = writeln!(md, "- **Degraded:** {}", summary.degraded);
	let _ = writeln!(md, "- **Failed:** {}", summary.failed);
	let _ = writeln!(md, "- **Total Time:** {:.2}s", summary.total_time_ms / 1_000.0);
	let _ = writeln!(
		md,
		"- **Avg Time per Scenario:** {:.2}s\n",
		summary.avg_time_per_scenario_ms / 1_000.0
	);

	if let Some(retrieval) = &summary.retrieval {
		let k = output.settings.recall_k;

		let _ = writeln!(md, "## Retrieval Metrics\n");
		let _ = writeln!(md, "- **Average Recall@{k}:** {:.3}", retrieval.avg_recall_at_k);
		let _ = writeln!(md, "- **Average MRR:** {:.3}", retrieval.avg_mrr);
		let _ = writeln!(md, "- **Median Recall@{k}:** {:.3}\n", retrieval.median_recall_at_k);
	}
	if let Some(quality) = &summary.plan_quality {
		let _ = writeln!(md, "## Plan Quality Metrics\n");
		let _ = writeln!(md, "- **Average Completeness:** {:.3}", quality.avg_completeness);
		let _ = writeln!(md, "- **Average Safety Score:** {:.3}", quality.avg_safety);
		let _ = writeln!(md, "- **Average Grounding:** {:.3}", quality.avg_grounding);
		let _ = writeln!(md, "- **Average Calibration:** {:.3}\n", quality.avg_calibration);
	}
	if let Some(reliability) = &summary.reliability {
		let _ = writeln!(md, "## Agent Reliability Metrics\n");
		let _ = writeln!(
			md,
			"- **Tool Call Success Rate:** {:.3}",
			reliability.avg_tool_call_success_rate
		);
		let _ = writeln!(md, "- **Total Contradictions:** {}", reliability.total_contradictions);
		let _ = writeln!(
			md,
			"- **Average Unknown Detection:** {:.3}\n",
			reliability.avg_unknown_detection
		);
	}

	let _ = writeln!(md, "## Detailed Results\n");

	for report in &output.scenarios {
		let _ = writeln!(md, "### {}\n", report.scenario_name);

		match (&report.retrieval, &report.plan_quality) {
			(Some(retrieval), Some(quality)) => {
				let status = match report.status {
					Some(dops_service::RunStatus::Degraded) => "Degraded",
					_ => "Success",
				};

				let _ = writeln!(
					md,
					"- **Status:** {status} ({:.2}s)",
					report.processing_time_ms / 1_000.0
				);
				let _ = writeln!(md, "- **Recall@{}:** {:.3}", retrieval.k, retrieval.recall_at_k);
				let _ = writeln!(
					md,
					"- **Completeness:** {:.3}",
					quality.completeness.completeness_score
				);
				let _ = writeln!(
					md,
					"- **Safety:** {}",
					if quality.safety.is_safe { "Safe" } else { "Unsafe" }
				);
				let _ = writeln!(md, "- **Grounding:** {:.3}\n", quality.grounding.grounding_score);
			},
			_ => {
				let _ = writeln!(md, "- **Status:** Failed");
				let _ = writeln!(
					md,
					"- **Error:** {}\n",
					report.error.as_deref().unwrap_or("Unknown")
				);
			},
		}
	}

	md
}
