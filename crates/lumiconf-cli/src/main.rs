//! lumiconf CLI - runs assembly scripts against a product catalog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumiconf_core::assets::ModelVariant;
use lumiconf_core::{
    Catalog, EngineConfig, FileMeshLoader, MemoryMeshLoader, MeshLoader, SceneContainer, TransformMesh,
    calculate_profile_composition,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod script;

use script::{Script, ScriptRunner};

#[derive(Parser)]
#[command(name = "lumiconf")]
#[command(about = "Junction-based lighting assembly runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an assembly script and print the resulting scene as JSON
    Run {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,
        /// Script JSON file
        #[arg(short, long)]
        script: PathBuf,
        /// Engine config JSON file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory with `models/` mesh descriptors
        #[arg(long)]
        models: Option<PathBuf>,
        /// Read `simplified/` descriptors instead of `models/`
        #[arg(long)]
        simplified: bool,
        /// Write the scene snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a catalog and list its products
    Check {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,
    },
    /// Show the piece breakdown of a custom-length profile
    Compose {
        /// Base profile code
        code: String,
        /// Target length in millimetres
        length_mm: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            catalog,
            script,
            config,
            models,
            simplified,
            output,
        } => {
            let variant = if simplified { ModelVariant::Simplified } else { ModelVariant::Full };
            run_script(&catalog, &script, config.as_deref(), models, variant, output.as_deref())?;
        }
        Commands::Check { catalog } => {
            check_catalog(&catalog)?;
        }
        Commands::Compose { code, length_mm } => {
            let composite = calculate_profile_composition(&code, length_mm);
            println!("{}", serde_json::to_string_pretty(&composite)?);
        }
    }

    Ok(())
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let catalog = Catalog::from_json(&json).with_context(|| format!("Invalid catalog {}", path.display()))?;
    log::info!("Loaded {} catalog entries from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn run_script(
    catalog: &Path,
    script: &Path,
    config: Option<&Path>,
    models: Option<PathBuf>,
    variant: ModelVariant,
    output: Option<&Path>,
) -> Result<()> {
    let catalog = Arc::new(load_catalog(catalog)?);
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let json = fs::read_to_string(script).with_context(|| format!("Failed to read {}", script.display()))?;
    let script = Script::from_json(&json).with_context(|| format!("Invalid script {}", script.display()))?;

    let loader: Box<dyn MeshLoader> = match models {
        Some(dir) => Box::new(FileMeshLoader::new(dir, variant)?),
        None => Box::new(MemoryMeshLoader::with_fallback(TransformMesh::new())),
    };

    let mut container = SceneContainer::new(catalog, config);
    let mut runner = ScriptRunner::new(&mut container, loader.as_ref());
    for (index, step) in script.steps.iter().enumerate() {
        runner
            .apply(step)
            .with_context(|| format!("Step {} failed: {:?}", index + 1, step))?;
    }

    let dangling = container.scene().dangling_links();
    if !dangling.is_empty() {
        anyhow::bail!("Scene has {} one-sided links", dangling.len());
    }

    let snapshot = container.snapshot().to_json()?;
    match output {
        Some(path) => {
            fs::write(path, snapshot).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote scene to {}", path.display());
        }
        None => println!("{}", snapshot),
    }
    Ok(())
}

fn check_catalog(path: &Path) -> Result<()> {
    let catalog = load_catalog(path)?;
    let mut problems = 0;
    for code in catalog.codes() {
        let entry = catalog.entry(code)?;
        println!(
            "{:<16} {:<14} juncts={} line_juncts={} power={}W",
            code,
            format!("{:?}", entry.category),
            entry.juncts.len(),
            entry.line_juncts.len(),
            entry.power
        );
        if entry.juncts.is_empty() && entry.line_juncts.is_empty() {
            log::warn!("{} has no junctions and can never be attached", code);
            problems += 1;
        }
        if entry.is_light() && entry.model.is_none() {
            log::warn!("{} is a light without a model, default spacing applies", code);
        }
    }
    println!("{} entries, {} without junctions", catalog.len(), problems);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG: &str = r#"{
        "XNR01L": {
            "juncts": [
                {"group": "xnr", "x": 0, "y": 0, "z": 0, "angle": 270},
                {"group": "xnr", "x": 10, "y": 0, "z": 0, "angle": 90}
            ],
            "power": 10,
            "category": "profile"
        }
    }"#;

    #[test]
    fn test_run_script_writes_snapshot() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        let script = dir.path().join("script.json");
        let output = dir.path().join("scene.json");
        fs::write(&catalog, CATALOG).unwrap();
        fs::write(
            &script,
            r#"{"steps": [
                {"op": "add", "label": "a", "code": "XNR01L"},
                {"op": "add", "label": "b", "code": "XNR01L"},
                {"op": "attach", "to": "a", "object": "b"}
            ]}"#,
        )
        .unwrap();

        run_script(&catalog, &script, None, None, ModelVariant::Full, Some(&output)).unwrap();

        let snapshot: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(snapshot["objects"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["power_budget"].as_f64(), Some(20.0));
    }

    #[test]
    fn test_failing_step_is_reported() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        let script = dir.path().join("script.json");
        fs::write(&catalog, CATALOG).unwrap();
        fs::write(&script, r#"{"steps": [{"op": "rotate", "object": "missing"}]}"#).unwrap();

        let err = run_script(&catalog, &script, None, None, ModelVariant::Full, None).unwrap_err();
        assert!(err.to_string().starts_with("Step 1 failed"));
    }
}
