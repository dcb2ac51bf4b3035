use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// `${VAR}` and `${VAR:-default}` — ground truth is the original's
/// `workspace.py::_ENV_RE` = `\$\{([A-Za-z_][A-Za-z_0-9]*)(?::-(.*?))?\}`.
fn env_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z_0-9]*)(?::-(.*?))?\}").unwrap())
}

/// Every `${VAR}` reference in `value` that has no default and is absent from
/// `environ`, formatted as `name -> mcp 'mcp_name': ${VAR}` style callers can
/// join into a single aggregated error.
pub fn missing_vars(value: &str, environ: &HashMap<String, String>) -> Vec<String> {
    env_re()
        .captures_iter(value)
        .filter_map(|cap| {
            let var = cap.get(1).unwrap().as_str();
            let has_default = cap.get(2).is_some();
            if !has_default && !environ.contains_key(var) {
                Some(var.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Expand every `${VAR}`/`${VAR:-default}` reference in `value` against
/// `environ`. Panics are never used: a reference with neither an environment
/// value nor a default is left untouched by the caller's validation pass
/// running first (see `missing_vars`), so by the time `expand` runs the
/// substitution is total.
pub fn expand(value: &str, environ: &HashMap<String, String>) -> String {
    env_re()
        .replace_all(value, |cap: &Captures| {
            let var = cap.get(1).unwrap().as_str();
            if let Some(v) = environ.get(var) {
                v.clone()
            } else if let Some(default) = cap.get(2) {
                default.as_str().to_string()
            } else {
                cap.get(0).unwrap().as_str().to_string()
            }
        })
        .into_owned()
}
