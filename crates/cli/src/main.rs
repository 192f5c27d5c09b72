//! Crosses input modules with the bundler transforms, writes every edited module next to the
//! others and reports whether each one still decodes and loads.

mod transforms;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;

use spliceasm_codec::{decode, shrink_padded_leb128, DecodeOptions};
use spliceasm_edit::{transform, EditError};
use spliceasm_nodes::Module;
use spliceasm_verify::{verify, Verdict, WasmparserLoader};

use crate::transforms::Transform;

#[derive(Parser)]
#[command(name = "spliceasm")]
#[command(about = "Edit WebAssembly modules in place and check the results")]
struct Cli {
    /// Modules to edit; defaults to every `.wasm` file in the input directory
    files: Vec<PathBuf>,

    #[arg(long, default_value = "wasm-input")]
    input_dir: PathBuf,

    /// Created if missing
    #[arg(long, default_value = "wasm-output")]
    output_dir: PathBuf,

    /// Transforms to run; defaults to all of them
    #[arg(long = "transform", value_enum)]
    transforms: Vec<Transform>,

    /// Rewrite padded LEB128 section headers minimally before editing
    #[arg(long)]
    shrink: bool,

    /// Use verbose output
    #[arg(short, long)]
    verbose: bool,
}

struct Input {
    name: String,
    stem: String,
    bytes: Vec<u8>,
    module: Module,
}

enum Outcome {
    Edited(Verdict),
    Rejected(EditError),
    /// The case never produced an output: its input did not load, its output could not be
    /// written, or its task died.
    Aborted(String),
}

struct CaseResult {
    name: String,
    outcome: Outcome,
}

impl CaseResult {
    fn passed(&self) -> bool {
        matches!(&self.outcome, Outcome::Edited(verdict) if verdict.passed())
    }

    fn report(&self) {
        if self.passed() {
            println!("{:<30} -- PASS", self.name);
            return;
        }
        println!("{:<30} -- FAIL", self.name);
        match &self.outcome {
            Outcome::Edited(verdict) => {
                println!("    wasm-parser error:        {}", display(&verdict.self_decode));
                println!("    native WebAssembly error: {}", display(&verdict.native_load));
            }
            Outcome::Rejected(err) => println!("    edit error:               {err}"),
            Outcome::Aborted(err) => println!("    error:                    {err}"),
        }
    }
}

/// A case still running, or one settled before it could be spawned.
enum Case {
    Running(String, JoinHandle<CaseResult>),
    Settled(CaseResult),
}

impl Case {
    async fn finish(self) -> CaseResult {
        match self {
            Case::Settled(result) => result,
            Case::Running(name, handle) => match handle.await {
                Ok(result) => result,
                Err(err) => CaseResult {
                    name,
                    outcome: Outcome::Aborted(format!("case task failed: {err}")),
                },
            },
        }
    }
}

fn display<E: std::fmt::Display>(err: &Option<E>) -> String {
    err.as_ref().map_or_else(|| "none".to_string(), ToString::to_string)
}

fn case_name(file: &str, which: Transform) -> String {
    format!("{file} -- {which}")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|xs| xs.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn discover(cli: &Cli) -> Result<Vec<PathBuf>> {
    if !cli.files.is_empty() {
        return Ok(cli.files.clone());
    }
    let entries = std::fs::read_dir(&cli.input_dir)
        .with_context(|| format!("reading {}", cli.input_dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|xs| xs == "wasm") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load(path: &Path, shrink: bool) -> Result<Input> {
    let mut bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if shrink {
        bytes = shrink_padded_leb128(&bytes)
            .with_context(|| format!("shrinking {}", path.display()))?;
    }
    // Bodies, data and names are never edited, so they are not decoded.
    let module = decode(&bytes, &DecodeOptions::declarations_only())
        .with_context(|| format!("decoding {}", path.display()))?;
    let stem = path
        .file_stem()
        .map(|xs| xs.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Input {
        name: file_name(path),
        stem,
        bytes,
        module,
    })
}

async fn run_case(input: Arc<Input>, which: Transform, output_dir: Arc<PathBuf>) -> CaseResult {
    let name = case_name(&input.name, which);
    log::info!("running case {name}");

    let edited = {
        let mut rules = which.rules(&input.module);
        transform(&input.bytes, &input.module, &mut rules)
    };
    let outcome = match edited {
        Ok(bytes) => {
            let out = output_dir.join(format!("{}-{}.wasm", input.stem, which));
            match tokio::fs::write(&out, &bytes).await {
                Ok(()) => Outcome::Edited(verify(&WasmparserLoader, &bytes).await),
                Err(err) => Outcome::Aborted(format!("writing {}: {err}", out.display())),
            }
        }
        Err(err) => Outcome::Rejected(err),
    };

    let result = CaseResult { name, outcome };
    log::info!(
        "finished case {}: {}",
        result.name,
        if result.passed() { "pass" } else { "fail" }
    );
    result
}

/// Runs every (file, transform) case. A failure settles only the cases it belongs to.
async fn run(cli: &Cli) -> Result<Vec<CaseResult>> {
    let transforms = if cli.transforms.is_empty() {
        Transform::ALL.to_vec()
    } else {
        cli.transforms.clone()
    };

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let output_dir = Arc::new(cli.output_dir.clone());

    let mut cases = Vec::new();
    for path in discover(cli)? {
        match load(&path, cli.shrink) {
            Ok(input) => {
                let input = Arc::new(input);
                for which in &transforms {
                    let name = case_name(&input.name, *which);
                    let handle = tokio::spawn(run_case(input.clone(), *which, output_dir.clone()));
                    cases.push(Case::Running(name, handle));
                }
            }
            Err(err) => {
                log::warn!("skipping {}: {err:#}", path.display());
                let name = file_name(&path);
                for which in &transforms {
                    cases.push(Case::Settled(CaseResult {
                        name: case_name(&name, *which),
                        outcome: Outcome::Aborted(format!("{err:#}")),
                    }));
                }
            }
        }
    }

    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        results.push(case.finish().await);
    }
    Ok(results)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let results = run(&cli).await?;
    let failed = results.iter().filter(|xs| !xs.passed()).count();
    for result in &results {
        result.report();
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} cases failed", results.len());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    /// A fresh directory under the system temp dir, unique to this test.
    fn scratch(test: &str) -> anyhow::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!("spliceasm-{}-{test}", std::process::id()));
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn cli(input_dir: PathBuf, output_dir: PathBuf) -> Cli {
        Cli {
            files: vec![],
            input_dir,
            output_dir,
            transforms: vec![Transform::RemoveExports, Transform::RemoveStartFunc],
            shrink: false,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn bad_inputs_fail_only_their_own_cases() -> anyhow::Result<()> {
        let root = scratch("bad-inputs")?;
        let input_dir = root.join("in");
        std::fs::create_dir_all(&input_dir)?;
        // Sorts first so its failure happens before the good file is read.
        std::fs::write(input_dir.join("a_bad.wasm"), b"\0asm\x01\0\0\0\x01\x05\x01")?;
        std::fs::write(
            input_dir.join("b_good.wasm"),
            wat::parse_str(r#"(module (func $f) (export "f" (func $f)) (start $f))"#)?,
        )?;

        let output_dir = root.join("out");
        let results = run(&cli(input_dir, output_dir.clone())).await?;

        let summary: Vec<_> = results
            .iter()
            .map(|xs| (xs.name.as_str(), xs.passed()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a_bad.wasm -- remove-exports", false),
                ("a_bad.wasm -- remove-start-func", false),
                ("b_good.wasm -- remove-exports", true),
                ("b_good.wasm -- remove-start-func", true),
            ]
        );
        assert!(matches!(&results[0].outcome, Outcome::Aborted(err) if err.contains("decoding")));
        assert!(output_dir.join("b_good-remove-exports.wasm").exists());
        assert!(!output_dir.join("a_bad-remove-exports.wasm").exists());

        std::fs::remove_dir_all(&root)?;
        Ok(())
    }

    #[tokio::test]
    async fn write_failures_settle_the_case() -> anyhow::Result<()> {
        let root = scratch("write-failures")?;
        let path = root.join("m.wasm");
        std::fs::write(&path, wat::parse_str("(module)")?)?;
        let input = Arc::new(load(&path, false)?);

        // A regular file where the output directory should be.
        let blocked = root.join("blocked");
        std::fs::write(&blocked, b"")?;
        let result = run_case(input.clone(), Transform::RemoveExports, Arc::new(blocked)).await;
        assert_eq!(result.name, "m.wasm -- remove-exports");
        assert!(matches!(&result.outcome, Outcome::Aborted(err) if err.contains("writing")));

        let result = run_case(input, Transform::RemoveExports, Arc::new(root.clone())).await;
        assert!(result.passed());

        std::fs::remove_dir_all(&root)?;
        Ok(())
    }
}
