//! AutoBlueprint - classify discovered software and generate a CloudFormation
//! rehost template sized to the source host.

use anyhow::{Context, Result};
use autoblueprint_generator::classifier::{
    ClassifierConfig, Classifier, OpenAiOracle, SamplingPolicy,
};
use autoblueprint_generator::{
    confidence, parser, sizing, specs, PipelineConfig, PipelineOutcome,
};
use autoblueprint_packager::{build_archive, DataManifest, DEFAULT_MANIFEST_PATH};
use autoblueprint_workload_schema::SizingCatalog;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "autoblueprint")]
#[command(
    author,
    version,
    about = "Turn an OSQuery export into a workload record and a CloudFormation template"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a discovery export and generate workload.json plus a template
    Generate {
        /// OSQuery discovery export (multi-block dump or plain program list)
        #[arg(long, short, default_value = "input/programs.json")]
        input: PathBuf,

        /// Output root; each run gets a timestamped directory
        #[arg(long, short, default_value = "output")]
        out: PathBuf,

        /// Instance catalog (YAML or JSON) replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Handlebars template replacing the built-in one
        #[arg(long)]
        template: Option<PathBuf>,

        /// Render straight from classifier output without a workload record
        #[arg(long)]
        components_only: bool,

        /// Classification API key
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Classification model
        #[arg(long, env = "GPT_MODEL", default_value = "gpt-4")]
        model: String,

        /// Base URL of the OpenAI-compatible API
        #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
        base_url: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Maximum number of programs sent for classification
        #[arg(long, default_value = "50")]
        sample_size: usize,
    },

    /// Render a template from an existing workload.json
    Render {
        /// Workload file path
        #[arg(long, short)]
        workload: PathBuf,

        /// Output template path
        #[arg(long, short, default_value = "autoblueprint_template.yaml")]
        out: PathBuf,

        /// Instance catalog (YAML or JSON) replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Handlebars template replacing the built-in one
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Validate a workload.json and summarize its evidence
    ValidateWorkload {
        /// Workload file path
        #[arg(long, short)]
        workload: PathBuf,

        /// Fail if any component is excluded from the template
        #[arg(long)]
        strict: bool,
    },

    /// Show host specs and sizing for a discovery export without classifying
    Inspect {
        /// OSQuery discovery export
        #[arg(long, short, default_value = "input/programs.json")]
        input: PathBuf,

        /// Instance catalog (YAML or JSON) replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Package site data listed in a data manifest into a tarball
    Package {
        /// Data manifest (JSON or YAML)
        #[arg(long, short, default_value = DEFAULT_MANIFEST_PATH)]
        manifest: PathBuf,

        /// Output archive path
        #[arg(long, short, default_value = "site.tar.gz")]
        out: PathBuf,
    },
}

fn load_catalog(path: Option<&Path>) -> Result<SizingCatalog> {
    match path {
        Some(path) => SizingCatalog::load(path)
            .with_context(|| format!("Failed to load instance catalog {:?}", path)),
        None => Ok(SizingCatalog::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Generate {
            input,
            out,
            catalog,
            template,
            components_only,
            api_key,
            model,
            base_url,
            timeout,
            sample_size,
        } => {
            info!("Generating from {:?}", input);

            let oracle = OpenAiOracle::new(ClassifierConfig {
                api_key,
                model,
                endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
                timeout_secs: timeout,
                ..Default::default()
            })?;
            let classifier = Classifier::new(
                oracle,
                SamplingPolicy {
                    sample_size,
                    ..Default::default()
                },
            );

            let config = PipelineConfig {
                input,
                output_root: out,
                catalog: load_catalog(catalog.as_deref())?,
                template,
                components_only,
            };

            match autoblueprint_generator::run_pipeline(&config, &classifier).await? {
                PipelineOutcome::NothingDetected => {
                    println!("No middleware, runtimes or databases detected; nothing generated.");
                }
                PipelineOutcome::Generated(artifacts) => {
                    println!(
                        "{} components classified, {} in the template.",
                        artifacts.component_count, artifacts.rendered_count
                    );
                    println!("Template saved to: {}", artifacts.template_path.display());
                    if let Some(workload) = artifacts.workload_path {
                        println!("Workload saved to: {}", workload.display());
                    }
                }
            }
        }

        Commands::Render {
            workload,
            out,
            catalog,
            template,
        } => {
            info!("Rendering template from {:?}", workload);
            let catalog = load_catalog(catalog.as_deref())?;
            let rendered = autoblueprint_generator::render_workload_file(
                &workload,
                &out,
                &catalog,
                template.as_deref(),
            )?;
            println!(
                "Template with {} components saved to: {}",
                rendered,
                out.display()
            );
        }

        Commands::ValidateWorkload { workload, strict } => {
            info!("Validating workload: {:?}", workload);

            let record = autoblueprint_generator::read_workload(&workload)?;
            let review = confidence::review_workload(&record);

            println!("Workload: {}", review.workload_id);
            println!(
                "Components: {} ({} eligible for IaC)",
                review.total_components, review.eligible_components
            );
            if !review.without_discovery_evidence.is_empty() {
                println!("Components without discovery evidence:");
                for component in &review.without_discovery_evidence {
                    println!("  - {}", component);
                }
            }
            if !review.below_threshold.is_empty() {
                println!("Components excluded from the template:");
                for component in &review.below_threshold {
                    println!("  - {}", component);
                }
            }
            for warning in &review.warnings {
                println!("Warning: {}", warning);
            }
            println!("Mean confidence: {:.2}", review.mean_confidence);

            if strict && !review.below_threshold.is_empty() {
                anyhow::bail!(
                    "Strict mode: {} components are below the IaC threshold",
                    review.below_threshold.len()
                );
            }
        }

        Commands::Inspect { input, catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let discovery = parser::load_discovery(&input)?;
            let host_spec = discovery
                .dump()
                .map(specs::extract_specs)
                .filter(|s| !s.is_empty());

            match &host_spec {
                Some(spec) => println!("Detected specs: {}", specs::describe(spec)),
                None => println!("No host specs found."),
            }
            println!("Programs discovered: {}", discovery.programs().len());

            let recommendation = sizing::recommend(host_spec.as_ref(), &catalog);
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }

        Commands::Package { manifest, out } => {
            info!("Packaging site data from {:?}", manifest);
            let manifest = DataManifest::load(&manifest)?;
            let summary = build_archive(&manifest, &out)?;

            for missing in &summary.missing {
                println!("Skipped missing include: {}", missing.display());
            }
            println!(
                "Archive with {} files saved to: {}",
                summary.files,
                summary.path.display()
            );
            println!("SHA-256: {}", summary.sha256);
        }
    }

    Ok(())
}
