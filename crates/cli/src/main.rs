//! CLI tool for building validated slide decks from markup manifests.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deck_core::{ContentUnit, ErrorPolicy, Pipeline, PipelineConfig};
use deck_pptx::DeckWriter;
use deck_render::SlideRenderer;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Build a PPTX slide deck from a manifest of slide markup and notes.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deck manifest (JSON: config plus content units)
    input: PathBuf,

    /// Output deck path (default: manifest name with .pptx extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Required slide count; overrides the manifest
    #[arg(short = 'c', long)]
    expected_count: Option<usize>,

    /// Collect every per-slide error instead of stopping at the first
    #[arg(long)]
    collect: bool,

    /// Treat slides without speaker notes as errors
    #[arg(long)]
    require_notes: bool,

    /// Directory image sources are resolved against (default: manifest directory)
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// Print the full build report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One slide's entry in the manifest. The position index may be omitted,
/// in which case list order decides it.
#[derive(Debug, Deserialize)]
struct ManifestUnit {
    #[serde(default)]
    index: Option<usize>,
    markup: String,
    #[serde(default)]
    notes: Option<String>,
}

/// On-disk build manifest.
#[derive(Debug, Deserialize)]
struct DeckManifest {
    #[serde(default)]
    config: PipelineConfig,
    units: Vec<ManifestUnit>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let manifest = load_manifest(&args.input)?;
    let config = merge_config(manifest.config.clone(), &args);
    let units = resolve_units(manifest.units)?;

    let media_root = args
        .media_root
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pptx"));

    let renderer = SlideRenderer::new();
    let writer = DeckWriter::new(&config).with_media_root(media_root);
    let pipeline = Pipeline::new(config, renderer, writer);

    let report = pipeline.run(&units, &output);

    if let Some(artifact) = report.artifact.as_ref().filter(|_| report.is_success()) {
        eprintln!(
            "Built {} slides into {} ({} bytes, {} ms)",
            report.slide_count,
            artifact.path.display(),
            artifact.bytes,
            report.elapsed_ms
        );
        for warning in &report.warnings {
            eprintln!("warning: {}", warning.message);
        }
    } else {
        eprintln!("Build failed with {} error(s):", report.errors.len());
        for error in &report.errors {
            eprintln!("  {}", error.message);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Read and parse the deck manifest.
fn load_manifest(path: &Path) -> Result<DeckManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))
}

/// Apply CLI overrides on top of the manifest configuration.
fn merge_config(mut config: PipelineConfig, args: &Args) -> PipelineConfig {
    if let Some(count) = args.expected_count {
        config.expected_count = Some(count);
    }
    if args.collect {
        config.policy = ErrorPolicy::Collect;
    }
    if args.require_notes {
        config.require_notes = true;
    }
    config
}

/// Turn manifest units into content units with definite positions.
fn resolve_units(units: Vec<ManifestUnit>) -> Result<Vec<ContentUnit>> {
    let mut resolved = Vec::with_capacity(units.len());
    let mut seen = std::collections::HashSet::new();

    for (i, unit) in units.into_iter().enumerate() {
        let index = unit.index.unwrap_or(i + 1);
        if index == 0 {
            bail!("slide positions are 1-based; unit {} declares index 0", i + 1);
        }
        if !seen.insert(index) {
            bail!("duplicate slide index {} in manifest", index);
        }

        let mut content = ContentUnit::new(index, unit.markup);
        content.notes = unit.notes;
        resolved.push(content);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_json() -> &'static str {
        r#"{
            "config": { "expected_count": 2, "policy": "collect" },
            "units": [
                { "markup": "<slide><text x=\"0.1\" y=\"0.1\" w=\"0.8\" h=\"0.2\">One</text></slide>", "notes": "first" },
                { "markup": "<slide><text x=\"0.1\" y=\"0.1\" w=\"0.8\" h=\"0.2\">Two</text></slide>", "notes": "second" }
            ]
        }"#
    }

    #[test]
    fn test_manifest_parses_with_partial_config() {
        let manifest: DeckManifest = serde_json::from_str(manifest_json()).unwrap();
        assert_eq!(manifest.config.expected_count, Some(2));
        assert_eq!(manifest.config.policy, ErrorPolicy::Collect);
        assert_eq!(manifest.units.len(), 2);
    }

    #[test]
    fn test_resolve_units_assigns_list_order() {
        let manifest: DeckManifest = serde_json::from_str(manifest_json()).unwrap();
        let units = resolve_units(manifest.units).unwrap();
        assert_eq!(units[0].index, 1);
        assert_eq!(units[1].index, 2);
        assert_eq!(units[1].notes.as_deref(), Some("second"));
    }

    #[test]
    fn test_resolve_units_rejects_duplicates() {
        let units = vec![
            ManifestUnit {
                index: Some(1),
                markup: "<slide/>".into(),
                notes: None,
            },
            ManifestUnit {
                index: Some(1),
                markup: "<slide/>".into(),
                notes: None,
            },
        ];
        assert!(resolve_units(units).is_err());
    }

    #[test]
    fn test_full_build_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest: DeckManifest = serde_json::from_str(manifest_json()).unwrap();
        let units = resolve_units(manifest.units).unwrap();

        let config = manifest.config;
        let output = dir.path().join("deck.pptx");
        let pipeline = Pipeline::new(
            config.clone(),
            SlideRenderer::new(),
            DeckWriter::new(&config).with_media_root(dir.path()),
        );

        let report = pipeline.run(&units, &output);

        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.slide_count, 2);
        assert!(output.exists());
    }
}
