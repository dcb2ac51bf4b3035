//! `pitlane init` — bootstrap a runnable starter project.

use std::path::Path;

use anyhow::{bail, Context, Result};

const STARTER_EVAL_YAML: &str = r#"assistants:
  claude:
    adapter: claude-code

tasks:
  - name: hello-world
    prompt: "Create a file named hello.py that prints 'Hello, world!' when run."
    workdir: "./fixtures/empty"
    assertions:
      - file_exists: hello.py
      - command_succeeds: "python3 hello.py"
"#;

pub fn handle_init(dir: &str, with_examples: bool) -> Result<()> {
    if with_examples {
        bail!(
            "--with-examples is not implemented: bundled fixture packs are out of scope. \
             Run `pitlane init` without this flag; it writes a runnable empty-fixture starter."
        );
    }

    let root = Path::new(dir);
    std::fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;

    let eval_path = root.join("eval.yaml");
    std::fs::write(&eval_path, STARTER_EVAL_YAML).with_context(|| format!("writing {}", eval_path.display()))?;

    let fixtures_dir = root.join("fixtures").join("empty");
    std::fs::create_dir_all(&fixtures_dir).with_context(|| format!("creating {}", fixtures_dir.display()))?;
    std::fs::write(fixtures_dir.join(".gitkeep"), "").with_context(|| format!("writing {}", fixtures_dir.join(".gitkeep").display()))?;

    println!("Initialized a pitlane project in {}", root.display());
    println!("  {}", eval_path.display());
    println!("  {}", fixtures_dir.display());
    println!("Run `pitlane run eval.yaml` to try it.");

    Ok(())
}
