use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autopost")]
#[command(about = "Autopost CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway (GET / liveness, POST /line/webhook).
    Serve {
        /// Config file path (default: AUTOPOST_CONFIG_PATH or ~/.autopost/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT env, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run one generation call and print the reply text the webhook would send.
    Generate {
        /// Text to summarize into a post
        text: String,

        /// Config file path (default: AUTOPOST_CONFIG_PATH or ~/.autopost/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("autopost {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Generate { text, config }) => {
            if let Err(e) = run_generate(config, text).await {
                log::error!("generate failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        lib::config::resolve_port(&config)
    );
    lib::gateway::run_gateway(config).await
}

async fn run_generate(
    config_path: Option<std::path::PathBuf>,
    text: String,
) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let gemini = lib::llm::GeminiClient::new(
        lib::config::resolve_gemini_api_key(&config),
        config.generation.model.clone(),
        config.generation.api_base.clone(),
    );
    match gemini.generate(text.trim()).await {
        Ok(generated) => {
            println!(
                "{}",
                lib::dispatch::truncate_reply(&generated, lib::dispatch::MAX_REPLY_CHARS)
            );
            Ok(())
        }
        Err(e) => match e.user_message() {
            Some(warning) => {
                println!("{}", warning);
                Ok(())
            }
            None => Err(e.into()),
        },
    }
}
