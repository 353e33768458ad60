use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::weather::WeatherLookup;

#[derive(Parser)]
#[command(name = "weather-bot")]
#[command(about = "QQ guild weather bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a starter config file to fill in with the bot's appid and token.
    Init {
        /// Config file path (default: WEATHER_BOT_CONFIG or ./config.yaml)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Connect to the QQ gateway and answer @-mentions until Ctrl+C.
    Run {
        /// Config file path (default: WEATHER_BOT_CONFIG or ./config.yaml)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Look up the weather once and print the reply text the bot would send.
    Weather {
        /// City name, e.g. 北京
        city: String,

        /// Config file path (default: WEATHER_BOT_CONFIG or ./config.yaml)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("weather-bot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_bot(config).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Weather { city, config }) => {
            if let Err(e) = run_weather(config, &city).await {
                log::error!("weather lookup failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    if lib::init::init_config(&path)? {
        println!("wrote {}; fill in appid and token before `weather-bot run`", path.display());
    } else {
        println!("{} already exists, left unchanged", path.display());
    }
    Ok(())
}

async fn run_bot(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::info!("starting weather bot with config {}", path.display());
    lib::bot::run_bot(config).await
}

/// The weather API needs no bot credentials, so a config without them is fine here.
async fn run_weather(config_path: Option<std::path::PathBuf>, city: &str) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let config = if path.exists() {
        let s = std::fs::read_to_string(&path)?;
        lib::config::parse_config(&s)?
    } else {
        log::debug!("config file not found, using weather defaults: {}", path.display());
        lib::config::Config::default()
    };
    lib::config::validate_timeout(&config)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let ctx = lib::context::BotContext::new(config)?;
    let client = lib::weather::WeatherClient::new(&ctx);
    let record = client.lookup(city).await?;
    println!("{}", lib::dispatcher::format_weather(&record));
    if !record.weather_icon.is_empty() {
        println!("{}", record.weather_icon);
    }
    Ok(())
}
