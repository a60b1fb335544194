use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Parser, Subcommand};
use runpod_image_proxy::extract::extract;
use runpod_image_proxy::runpod::types::{ImagePayload, JobHandle};
use runpod_image_proxy::utils::data_uri::strip_data_uri_prefix;
use runpod_image_proxy::{Config, PollConfig, RunpodClient, VariantRegistry};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "runpodctl", about = "CLI for the RunPod image proxy", version)]
struct Cli {
    /// Override RUNPOD_API_BASE
    #[arg(global = true, long)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a workflow, poll it, and print the canonical image
    Generate {
        /// Workflow variant name (see the server's /api/workflows)
        #[arg(long, default_value = "segment")]
        workflow: String,
        /// Input image file; repeat for variants with two slots
        #[arg(long, value_name = "PATH")]
        image: Vec<PathBuf>,
        /// Prompt text patched into the workflow
        #[arg(long)]
        prompt: String,
        /// Milliseconds between status polls
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Poll attempts before giving up
        #[arg(long, default_value_t = 180)]
        max_attempts: u32,
        /// Write the decoded PNG here instead of printing the data URI
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Fetch the current status of a job
    Status {
        job_id: String,
        /// Pretty-print the raw output payload too
        #[arg(long)]
        pretty: bool,
    },
    /// Submit through the blocking runsync endpoint
    Runsync {
        #[arg(long, default_value = "segment")]
        workflow: String,
        #[arg(long, value_name = "PATH")]
        image: Vec<PathBuf>,
        #[arg(long)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(base) = cli.api_base {
        config.runpod_api_base = base;
    }
    let client = RunpodClient::from_config(&config);
    let registry = VariantRegistry::builtin();

    match cli.command {
        Commands::Generate {
            workflow,
            image,
            prompt,
            interval_ms,
            max_attempts,
            out,
        } => {
            let (graph, images) =
                prepare_workflow(&registry, &config, &workflow, &image, &prompt).await?;
            let handle = client.run(&graph, &images).await?;
            println!("Job submitted: {}", handle.id);
            let poll = PollConfig {
                interval: Duration::from_millis(interval_ms),
                max_attempts,
            };
            let result = client.poll(&handle, poll).await?;
            let canonical = extract(&result)?;
            emit_image(&canonical.into_inner(), out)?;
        }
        Commands::Status { job_id, pretty } => {
            let handle = JobHandle { id: job_id };
            let result = client.status(&handle).await?;
            println!("status: {}", serde_json::to_string(&result.status)?);
            if pretty {
                if let Some(output) = result.output {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
        Commands::Runsync {
            workflow,
            image,
            prompt,
        } => {
            let (graph, images) =
                prepare_workflow(&registry, &config, &workflow, &image, &prompt).await?;
            let result = client.run_sync(&graph, &images).await?;
            let canonical = extract(&result)?;
            emit_image(&canonical.into_inner(), None)?;
        }
    }
    Ok(())
}

/// Load the variant's template and patch it with the prompt and the given
/// image files, encoding each file as an inline base64 payload.
async fn prepare_workflow(
    registry: &VariantRegistry,
    config: &Config,
    variant_name: &str,
    image_paths: &[PathBuf],
    prompt: &str,
) -> Result<(serde_json::Value, Vec<ImagePayload>), Box<dyn std::error::Error>> {
    let variant = registry
        .get(variant_name)
        .ok_or_else(|| format!("unknown workflow '{}'", variant_name))?;
    if image_paths.len() < variant.image_slots() {
        return Err(format!(
            "workflow '{}' needs {} image(s), got {}",
            variant.name,
            variant.image_slots(),
            image_paths.len()
        )
        .into());
    }

    let mut images = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        let bytes = tokio::fs::read(path).await?;
        images.push(ImagePayload {
            name: format!("input-{}.png", uuid::Uuid::new_v4()),
            image: BASE64.encode(&bytes),
        });
    }
    let names: Vec<String> = images.iter().map(|i| i.name.clone()).collect();

    let mut graph = variant.load_template(&config.workflows_dir).await?;
    variant.apply_patches(&mut graph, prompt, &names);
    Ok((graph, images))
}

fn emit_image(data_uri: &str, out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match out {
        Some(path) => {
            let payload = strip_data_uri_prefix(data_uri)?;
            let bytes = BASE64.decode(payload)?;
            std::fs::write(&path, bytes)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", data_uri),
    }
    Ok(())
}
