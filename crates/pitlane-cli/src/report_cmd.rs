//! `pitlane report` — re-validate a completed run directory. HTML rendering
//! is out of scope, so this only confirms the run's durable artefacts are
//! present and summarises them.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pitlane_report::RunMeta;

pub fn handle_report(run_dir: &str) -> Result<()> {
    let root = Path::new(run_dir);
    let junit_path = root.join("junit.xml");
    if !junit_path.exists() {
        bail!("{} does not contain a junit.xml; is this a pitlane run directory?", root.display());
    }

    println!("junit.xml: {}", junit_path.display());

    let meta_path = root.join("meta.yaml");
    if meta_path.exists() {
        let raw = std::fs::read_to_string(&meta_path).with_context(|| format!("reading {}", meta_path.display()))?;
        let meta: RunMeta = serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", meta_path.display()))?;
        println!("run:        {}", meta.run_id);
        println!("assistants: {}", meta.assistants.join(", "));
        println!("tasks:      {}", meta.tasks.join(", "));
        if meta.interrupted {
            println!("note:       this run was interrupted before completion");
        }
    }

    println!("HTML rendering is out of scope; the run directory's junit.xml and meta.yaml are the durable record.");
    Ok(())
}
