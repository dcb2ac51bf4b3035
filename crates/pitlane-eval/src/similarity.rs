//! Similarity assertion kinds (`bleu`, `rouge`, `bertscore`, `cosine_similarity`)
//! are deliberately kept out of this engine. Each kind shells out to an
//! external scorer binary, one per kind, overridable via `SimilarityBinaries`
//! and defaulting to `pitlane-similarity-<kind>` on `PATH`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const SCORER_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-kind overrides for the external scorer binary name, keyed by kind
/// (`bleu`, `rouge`, `bertscore`, `cosine_similarity`). Falls back to
/// `pitlane-similarity-<kind>` for any kind with no override.
#[derive(Debug, Clone, Default)]
pub struct SimilarityBinaries {
    overrides: HashMap<String, String>,
}

impl SimilarityBinaries {
    pub fn with_override(mut self, kind: impl Into<String>, binary: impl Into<String>) -> Self {
        self.overrides.insert(kind.into(), binary.into());
        self
    }

    fn binary_for(&self, kind: &str) -> String {
        self.overrides
            .get(kind)
            .cloned()
            .unwrap_or_else(|| format!("pitlane-similarity-{kind}"))
    }
}

/// Run the external scorer for `kind`, passing `actual`/`expected` file paths
/// and an optional named metric variant, and parse its stdout as the raw
/// similarity score. The scorer's contract: print a single floating-point
/// number to stdout (trailing whitespace tolerated).
pub async fn score(
    kind: &str,
    actual: &Path,
    expected: &Path,
    metric: Option<&str>,
    bins: &SimilarityBinaries,
) -> anyhow::Result<f64> {
    let binary = bins.binary_for(kind);
    let mut argv = vec![
        binary,
        "--actual".to_string(),
        actual.to_string_lossy().into_owned(),
        "--expected".to_string(),
        expected.to_string_lossy().into_owned(),
    ];
    if let Some(metric) = metric.or(default_metric(kind)) {
        argv.push("--metric".to_string());
        argv.push(metric.to_string());
    }

    let out = pitlane_process::run_streaming(&argv, Path::new("."), SCORER_TIMEOUT, None).await?;
    anyhow::ensure!(!out.timed_out, "{kind} scorer timed out after {}s", SCORER_TIMEOUT.as_secs());
    anyhow::ensure!(out.exit_code == 0, "{kind} scorer exited with code {}: {}", out.exit_code, out.stderr.trim());

    out.stdout
        .trim()
        .lines()
        .last()
        .unwrap_or("")
        .trim()
        .parse::<f64>()
        .map_err(|e| anyhow::anyhow!("{kind} scorer produced non-numeric output: {e}"))
}

/// `rouge` defaults to `rougeL`, `bertscore` defaults to `f1`; `bleu` and
/// `cosine_similarity` have no named variant.
fn default_metric(kind: &str) -> Option<&'static str> {
    match kind {
        "rouge" => Some("rougeL"),
        "bertscore" => Some("f1"),
        _ => None,
    }
}
