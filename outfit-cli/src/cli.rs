use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use outfit_core::{
    AnthropicBackend, Config, Credentials, Pipeline, RunMode, SheetsClient, TwilioNotifier, clock,
    pipeline::load_skill, provider::provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "daily-outfit", version, about = "Weather-aware outfit suggestion by SMS")]
pub struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recommend today's outfit, text it and record it.
    Run {
        /// Generate the recommendation but don't send it or record it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the instruction that would be sent to the model.
    Prompt,

    /// Write the default settings file if there isn't one yet.
    Init,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command.unwrap_or(Command::Run { dry_run: false }) {
            Command::Init => init(&config_path),
            Command::Prompt => {
                let app = App::connect(&config_path).await?;
                let pipeline = app.pipeline()?;
                let now = clock::now_in(app.config.timezone()?);
                println!("{}", pipeline.compose(now).await?);
                Ok(())
            }
            Command::Run { dry_run } => {
                let app = App::connect(&config_path).await?;
                let pipeline = app.pipeline()?;
                let now = clock::now_in(app.config.timezone()?);
                let mode = if dry_run { RunMode::DryRun } else { RunMode::Send };

                let report = pipeline.run(now, mode).await?;
                println!("{}", report.recommendation.message);

                if let Some(delivery) = report.delivery {
                    println!();
                    println!("Sent (sid {}, status {})", delivery.sid, delivery.status);
                }
                Ok(())
            }
        }
    }
}

fn init(path: &std::path::Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    Config::default().save_to(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Real collaborators built from settings and environment.
struct App {
    config: Config,
    weather: Box<dyn outfit_core::WeatherProvider>,
    sheets: SheetsClient,
    backend: AnthropicBackend,
    notifier: TwilioNotifier,
}

impl App {
    async fn connect(config_path: &std::path::Path) -> anyhow::Result<Self> {
        let config = Config::load_from(config_path)?.with_env_overrides()?;
        config.validate()?;

        // Secrets are checked up front so a missing one fails before any request.
        let credentials = Credentials::from_env()?;

        let weather = provider_from_config(&config)?;
        let sheets = SheetsClient::connect(&config, &credentials)
            .await
            .context("Failed to open wardrobe spreadsheet")?;
        let backend = AnthropicBackend::from_config(&config, &credentials)?;
        let notifier = TwilioNotifier::from_config(&config, &credentials)?;

        tracing::debug!(config = %config_path.display(), "collaborators ready");

        Ok(Self {
            config,
            weather,
            sheets,
            backend,
            notifier,
        })
    }

    fn pipeline(&self) -> anyhow::Result<Pipeline<'_>> {
        Ok(Pipeline {
            config: &self.config,
            weather: self.weather.as_ref(),
            wardrobe: &self.sheets,
            history: &self.sheets,
            backend: &self.backend,
            notifier: &self.notifier,
            skill: load_skill(&self.config)?,
        })
    }
}
