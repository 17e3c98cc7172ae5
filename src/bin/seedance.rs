//! CLI for Seedance - AI video studio.

use clap::{Args, Parser, Subcommand, ValueEnum};
use seedance::credits::{AddCredits, CreditLedger, CreditTransactionKind};
use seedance::gallery::{GalleryStore, StatusFilter};
use seedance::pricing::{self, GenerationCostParams};
use seedance::video::{
    GenerationMode, ImageUpload, ReferenceKind, Resolution, VideoGenerationRequest, VideoProvider,
};
use seedance::{Config, Studio};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seedance")]
#[command(about = "Generate videos with Seedance via Evolink, with credit accounting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Charge credits and submit a video generation
    Generate(GenerateArgs),

    /// Query the status of a remote task
    Status {
        /// Evolink task id
        task_id: String,
    },

    /// Upload an image for use as a frame or reference
    Upload {
        /// Path to a JPG, PNG or WebP file
        path: PathBuf,
    },

    /// Show the credit cost of a generation
    Cost(CostArgs),

    /// Manage credits
    #[command(subcommand)]
    Credits(CreditsCommand),

    /// List a user's generations
    Gallery {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Only show generations with this status
        #[arg(short, long, value_enum, default_value = "all")]
        status: StatusArg,
    },

    /// List prompt templates
    Templates {
        /// Category to show
        #[arg(short, long, default_value = "All")]
        category: String,
    },

    /// List subscription plans and credit packages
    Plans,

    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides SEEDANCE_BIND)
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the video
    prompt: String,

    /// User to charge
    #[arg(short, long)]
    user: String,

    /// Video duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Output resolution
    #[arg(short, long, value_enum)]
    resolution: Option<ResolutionArg>,

    /// Aspect ratio (e.g., 16:9)
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Generate an audio track
    #[arg(long)]
    audio: bool,

    /// Model override (e.g., seedance-1.0-pro)
    #[arg(long)]
    model: Option<String>,

    /// Input image URL(s); one for image-to-video, two for first/last frame
    #[arg(short, long)]
    image: Vec<String>,

    /// Face reference image URL(s)
    #[arg(long)]
    face_ref: Vec<String>,

    /// Wait for the video and print its URL
    #[arg(short, long)]
    wait: bool,

    /// Save the finished video here (implies --wait)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CostArgs {
    /// Video duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Output resolution
    #[arg(short, long, value_enum)]
    resolution: Option<ResolutionArg>,

    /// Generate an audio track
    #[arg(long)]
    audio: bool,
}

#[derive(Subcommand)]
enum CreditsCommand {
    /// Show a user's balance
    Balance {
        /// User id
        user: String,
    },

    /// Grant credits to a user
    Grant {
        /// User id
        user: String,

        /// Number of credits
        amount: i64,

        /// Ledger description
        #[arg(long, default_value = "Manual credit grant")]
        description: String,

        /// Days until the credits expire
        #[arg(long)]
        expire_days: Option<u32>,
    },

    /// Show recent credit transactions
    History {
        /// User id
        user: String,

        /// Maximum number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Zero out expired credit grants
    Expire,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "480p")]
    P480,
    #[value(name = "720p")]
    P720,
    #[value(name = "1080p")]
    P1080,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::P480 => Resolution::P480,
            ResolutionArg::P720 => Resolution::P720,
            ResolutionArg::P1080 => Resolution::P1080,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    All,
    Completed,
    Processing,
    Failed,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Completed => StatusFilter::Completed,
            StatusArg::Processing => StatusFilter::Processing,
            StatusArg::Failed => StatusFilter::Failed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seedance=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Generate(args) => generate(&config, args, cli.json).await?,
        Commands::Status { task_id } => {
            let provider = config.evolink_provider()?;
            let status = provider.status(&task_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Task {}: {:?} ({}%)", status.id, status.status, status.progress);
                if let Some(url) = status.video_url {
                    println!("Video: {url}");
                }
                if let Some(err) = status.error {
                    println!("Error: {err}");
                }
            }
        }
        Commands::Upload { path } => upload(&config, path, cli.json).await?,
        Commands::Cost(args) => {
            let cost = pricing::calculate_generation_cost(&GenerationCostParams {
                duration_secs: args.duration,
                resolution: args.resolution.map(Into::into),
                generate_audio: Some(args.audio),
            });
            if cli.json {
                println!("{}", serde_json::json!({ "cost": cost }));
            } else {
                println!("{cost} credits");
            }
        }
        Commands::Credits(cmd) => credits(&config, cmd, cli.json).await?,
        Commands::Gallery { user, status } => {
            let gallery = GalleryStore::open(&config.gallery_path)?;
            let generations = gallery.list(&user, status.into());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&generations)?);
            } else if generations.is_empty() {
                println!("No generations yet.");
            } else {
                for g in generations {
                    println!(
                        "{}  {:<10}  {:>3} credits  {}",
                        g.created_at.format("%Y-%m-%d %H:%M"),
                        format!("{:?}", g.status),
                        g.cost,
                        g.prompt
                    );
                    if let Some(url) = g.video_url {
                        println!("    {url}");
                    }
                }
            }
        }
        Commands::Templates { category } => {
            let templates = seedance::templates::templates_in(&category);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&templates)?);
            } else {
                for t in templates {
                    let cost = t.to_request().cost();
                    println!("{} {} [{}] - {} credits", t.thumbnail, t.title, t.category, cost);
                    println!("    {}", t.description);
                }
            }
        }
        Commands::Plans => list_plans(cli.json)?,
        Commands::Serve { bind } => {
            let studio = open_studio(&config).await?;
            let addr = bind.unwrap_or(config.bind_addr);
            seedance::server::serve(studio, addr).await?;
        }
    }

    Ok(())
}

async fn open_studio(config: &Config) -> anyhow::Result<Studio> {
    let provider = config.evolink_provider()?;
    let ledger = CreditLedger::connect(&config.database_url).await?;
    let gallery = GalleryStore::open(&config.gallery_path)?;
    Ok(Studio::new(Arc::new(provider), ledger, gallery).with_submit_retries(2))
}

async fn generate(config: &Config, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let mode = match args.image.len() {
        0 if !args.face_ref.is_empty() => GenerationMode::ReferenceToVideo,
        0 => GenerationMode::TextToVideo,
        1 => GenerationMode::ImageToVideo,
        2 => GenerationMode::FirstLastFrame,
        n => anyhow::bail!("at most two --image values are supported, got {n}"),
    };

    let mut request = VideoGenerationRequest::new(&args.prompt)
        .with_mode(mode)
        .with_audio(args.audio);
    if let Some(d) = args.duration {
        request = request.with_duration(d);
    }
    if let Some(r) = args.resolution {
        request = request.with_resolution(r.into());
    }
    if let Some(ar) = args.aspect_ratio {
        request = request.with_aspect_ratio(ar);
    }
    if let Some(m) = args.model {
        request = request.with_model(m);
    }
    for url in args.image {
        request = request.with_image(url);
    }
    for url in args.face_ref {
        request = request.with_reference(ReferenceKind::Face, url);
    }

    let studio = open_studio(config).await?;
    let mut generation = studio.generate(&args.user, request).await?;

    if args.wait || args.output.is_some() {
        eprintln!("Waiting for video (this may take a few minutes)...");
        generation = studio
            .wait(&args.user, &generation.id, config.poll_interval, config.poll_timeout)
            .await?;
    }

    if let (Some(path), Some(url)) = (&args.output, &generation.video_url) {
        let data = studio.provider().download(url).await?;
        std::fs::write(path, &data)?;
        eprintln!("Saved {} ({} bytes)", path.display(), data.len());
    }

    let balance = studio.balance(&args.user).await?;
    if json_output {
        let result = serde_json::json!({
            "generation": generation,
            "balance": balance,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generation {}: {:?} ({} credits, {} left)",
            generation.id, generation.status, generation.cost, balance
        );
        if let Some(task_id) = &generation.task_id {
            println!("Task: {task_id}");
        }
        if let Some(url) = &generation.video_url {
            println!("Video: {url}");
        }
        if let Some(err) = &generation.error {
            println!("Error: {err}");
        }
    }

    Ok(())
}

async fn upload(config: &Config, path: PathBuf, json_output: bool) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let Some(mime_type) = ImageUpload::mime_from_extension(&file_name) else {
        anyhow::bail!("Invalid file type. Supported: JPG, PNG, WebP");
    };
    let data = std::fs::read(&path)?;

    let provider = config.evolink_provider()?;
    let file = provider
        .upload_image(&ImageUpload::new(data, mime_type, file_name))
        .await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&file)?);
    } else if file.hosted {
        println!("Uploaded {}: {}", file.file_name, file.url);
    } else {
        println!(
            "Upload failed; use the inline data URI for {} ({} chars)",
            file.file_name,
            file.url.len()
        );
    }
    Ok(())
}

async fn credits(config: &Config, cmd: CreditsCommand, json_output: bool) -> anyhow::Result<()> {
    let ledger = CreditLedger::connect(&config.database_url).await?;

    match cmd {
        CreditsCommand::Balance { user } => {
            let balance = ledger.balance(&user).await?;
            if json_output {
                println!("{}", serde_json::json!({ "user": user, "balance": balance }));
            } else {
                println!("{user}: {balance} credits");
            }
        }
        CreditsCommand::Grant {
            user,
            amount,
            description,
            expire_days,
        } => {
            let mut grant = AddCredits::new(&user, amount, CreditTransactionKind::AdminGrant, description);
            grant.expire_days = expire_days;
            ledger.add_credits(grant).await?;
            let balance = ledger.balance(&user).await?;
            if json_output {
                println!("{}", serde_json::json!({ "user": user, "granted": amount, "balance": balance }));
            } else {
                println!("Granted {amount} credits to {user} (balance {balance})");
            }
        }
        CreditsCommand::History { user, limit } => {
            let history = ledger.transactions(&user, limit).await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for t in history {
                    println!(
                        "{}  {:>6}  {:<20}  {}",
                        t.created_at.format("%Y-%m-%d %H:%M"),
                        t.amount,
                        t.kind,
                        t.description
                    );
                }
            }
        }
        CreditsCommand::Expire => {
            let expired = ledger.expire_credits(chrono::Utc::now()).await?;
            if json_output {
                println!("{}", serde_json::json!({ "expired": expired }));
            } else {
                println!("Expired {expired} credits");
            }
        }
    }
    Ok(())
}

fn list_plans(json_output: bool) -> anyhow::Result<()> {
    let plans = pricing::price_plans();
    let packages = pricing::credit_packages();

    if json_output {
        let result = serde_json::json!({ "plans": plans, "packages": packages });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("PLANS:");
    for plan in &plans {
        let star = if plan.popular { "★" } else { " " };
        let credits = plan
            .credits
            .map(|c| format!("{} credits / {} days", c.amount, c.expire_days))
            .unwrap_or_else(|| "no credits".into());
        println!("  {star} {:<10} {credits}", plan.id);
        for price in &plan.prices {
            let interval = price
                .interval
                .map(|i| format!("{i:?}").to_lowercase())
                .unwrap_or_else(|| "one-time".into());
            println!(
                "      ${:.2} per {interval} (${:.2}/mo)",
                f64::from(price.amount_cents) / 100.0,
                f64::from(price.monthly_equivalent_cents()) / 100.0
            );
        }
    }

    println!("\nCREDIT PACKAGES:");
    for p in &packages {
        let star = if p.popular { "★" } else { " " };
        println!(
            "  {star} {:<13} {:>5} credits  ${:.2}",
            p.id,
            p.amount,
            f64::from(p.price_cents) / 100.0
        );
    }

    println!(
        "\nCOST: {} base, +{} over {}s, +{} for 1080p, +{} with audio",
        pricing::BASE_CREDIT_COST,
        pricing::DURATION_ADDON_COST,
        pricing::BASE_DURATION_SECS,
        pricing::RESOLUTION_ADDON_COST,
        pricing::AUDIO_ADDON_COST
    );
    Ok(())
}
