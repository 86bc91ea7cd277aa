//! CLI for GenEdit - generate and iteratively edit images.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use genedit::{
    ApiClient, EncodedImage, ImageCodec, ImageFile, ImageFormat, ImageService, ImageSize,
    Workflow,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "genedit")]
#[command(about = "Generate an image from a prompt, then refine it with edit prompts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Image service base URL (defaults to $GENEDIT_API_BASE_URL or http://localhost:8000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// Edit a local image with a text prompt
    Edit(EditArgs),

    /// Generate (or load) an image, then apply each edit prompt in turn
    Session(SessionArgs),

    /// List supported output sizes
    Sizes,

    /// Check that the image service is reachable
    Health,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Output size
    #[arg(short, long, value_enum, default_value = "square")]
    size: SizeArg,
}

#[derive(Args)]
struct EditArgs {
    /// Instructions for the edit
    prompt: String,

    /// Image to edit
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct SessionArgs {
    /// Prompt for the initial image (ignored with --input)
    #[arg(default_value = "")]
    prompt: String,

    /// Edit prompts, applied in order to the previous result
    #[arg(short, long = "edit", required = true)]
    edits: Vec<String>,

    /// Start from a local image instead of generating one
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the intermediate and final images are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output size for the initial image
    #[arg(short, long, value_enum, default_value = "square")]
    size: SizeArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizeArg {
    #[value(name = "square", alias = "1024x1024")]
    Square,
    #[value(name = "landscape", alias = "1792x1024")]
    Landscape,
    #[value(name = "portrait", alias = "1024x1792")]
    Portrait,
}

impl From<SizeArg> for ImageSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::Square => ImageSize::Square,
            SizeArg::Landscape => ImageSize::Landscape,
            SizeArg::Portrait => ImageSize::Portrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genedit=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            generate_image(args, cli.base_url, cli.json).await?;
        }
        Commands::Edit(args) => {
            edit_image(args, cli.base_url, cli.json).await?;
        }
        Commands::Session(args) => {
            run_session(args, cli.base_url, cli.json).await?;
        }
        Commands::Sizes => {
            list_sizes(cli.json)?;
        }
        Commands::Health => {
            check_health(cli.base_url, cli.json).await?;
        }
    }

    Ok(())
}

fn build_workflow(base_url: Option<String>) -> anyhow::Result<Workflow<ApiClient>> {
    let mut builder = ApiClient::builder();
    if let Some(url) = base_url {
        builder = builder.base_url(url);
    }
    let client = builder.build()?;
    let codec = ImageCodec::new(client.http_client().clone());
    Ok(Workflow::new(client).with_codec(codec))
}

/// Writes an encoded image to `path`, returning the saved file.
async fn save_image(
    workflow: &Workflow<ApiClient>,
    image: &EncodedImage,
    path: &Path,
) -> anyhow::Result<ImageFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image.png");
    let file = workflow.codec().to_file(image, name).await?;
    file.save(path)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(file)
}

fn report(json_output: bool, kind: &str, path: &Path, file: &ImageFile) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "type": kind,
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": file.size(),
            "mime_type": file.mime_type,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{} image: {} ({} bytes, {})",
            kind,
            path.display(),
            file.size(),
            file.mime_type
        );
    }
    Ok(())
}

async fn generate_image(
    args: GenerateArgs,
    base_url: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let workflow = build_workflow(base_url)?;
    let image = workflow.generate(&args.prompt, args.size.into()).await?;

    let file = save_image(&workflow, &image, &args.output).await?;
    report(json_output, "generated", &args.output, &file)
}

async fn edit_image(
    args: EditArgs,
    base_url: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let workflow = build_workflow(base_url)?;
    let input = ImageFile::from_path(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    workflow.select_local_file(input);
    let image = workflow.edit(&args.prompt).await?;

    let file = save_image(&workflow, &image, &args.output).await?;
    report(json_output, "edited", &args.output, &file)
}

async fn run_session(
    args: SessionArgs,
    base_url: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let workflow = build_workflow(base_url)?;
    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    if let Some(input) = &args.input {
        let file = ImageFile::from_path(input)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?;
        workflow.select_local_file(file);
    } else {
        let image = workflow.generate(&args.prompt, args.size.into()).await?;
        let path = output_path(&args.output_dir, "generated", &image);
        let file = save_image(&workflow, &image, &path).await?;
        report(json_output, "generated", &path, &file)?;
    }

    for (index, prompt) in args.edits.iter().enumerate() {
        if index > 0 {
            workflow.use_edited_as_source();
        }
        let image = workflow.edit(prompt).await?;
        let path = output_path(&args.output_dir, &format!("edit-{}", index + 1), &image);
        let file = save_image(&workflow, &image, &path).await?;
        report(json_output, "edited", &path, &file)?;
    }

    Ok(())
}

/// Picks `<dir>/<stem>.<ext>` with the extension taken from the data URI's MIME type.
fn output_path(dir: &Path, stem: &str, image: &EncodedImage) -> PathBuf {
    let ext = image
        .as_str()
        .strip_prefix("data:")
        .and_then(|rest| rest.split([';', ',']).next())
        .and_then(|mime| mime.strip_prefix("image/"))
        .and_then(ImageFormat::from_extension)
        .map(|f| f.extension())
        .unwrap_or("png");
    dir.join(format!("{stem}.{ext}"))
}

fn list_sizes(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct SizeInfo {
        label: &'static str,
        value: &'static str,
        default: bool,
    }

    let sizes: Vec<SizeInfo> = ImageSize::ALL
        .iter()
        .map(|size| SizeInfo {
            label: size.label(),
            value: size.as_str(),
            default: *size == ImageSize::default(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&sizes)?);
    } else {
        println!("Available sizes:\n");
        for s in &sizes {
            let marker = if s.default { " (default)" } else { "" };
            println!("  {}  {}{}", s.value, s.label, marker);
        }
    }

    Ok(())
}

async fn check_health(base_url: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let workflow = build_workflow(base_url)?;
    let client = workflow.service();
    ImageService::health_check(client).await?;

    if json_output {
        let result = serde_json::json!({
            "status": "ok",
            "base_url": client.base_url(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Image service at {} is healthy", client.base_url());
    }
    Ok(())
}
