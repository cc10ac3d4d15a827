//! College football rating CLI
//!
//! Imports game results, calibrates margin-dependent Elo ratings for point
//! spreads or point totals, and prints predictions from the cached models.

use clap::{Parser, Subcommand};
use cfbmodel::{Config, Result};

#[derive(Parser)]
#[command(name = "cfbmodel")]
#[command(about = "NCAA football spread and total predictions", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Calibrate the rating model, reusing the cached result when present
    Calibrate {
        /// Prediction mode: spread or total
        #[arg(long, default_value = "spread")]
        mode: String,
        /// Number of hyperparameter trials (defaults to the config value)
        #[arg(long)]
        steps: Option<usize>,
        /// Ignore and overwrite any cached model
        #[arg(long)]
        retrain: bool,
    },
    /// Predict a game from the calibrated model
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Prediction mode: spread or total
        #[arg(long, default_value = "spread")]
        mode: String,
        /// Game date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Home team's days of rest (derived from the store if omitted)
        #[arg(long)]
        home_rest: Option<i64>,
        /// Away team's days of rest (derived from the store if omitted)
        #[arg(long)]
        away_rest: Option<i64>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import games from a CSV file
    Import {
        /// CSV with columns date,season,week,home,home_pts,away,away_pts
        file: String,
        /// Import every season, not just the store's latest onward
        #[arg(long)]
        full: bool,
    },
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { file, full } => commands::data_import(&config, &file, full),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Calibrate {
            mode,
            steps,
            retrain,
        } => commands::calibrate(&config, &mode, steps, retrain),
        Commands::Predict {
            home,
            away,
            mode,
            date,
            home_rest,
            away_rest,
        } => commands::predict(&config, &mode, &home, &away, date, home_rest, away_rest),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::Path;

    use chrono::NaiveDate;
    use cfbmodel::data::import::{read_games_csv, since_season};
    use cfbmodel::data::Database;
    use cfbmodel::features::TeamTimeline;
    use cfbmodel::model::Melo;
    use cfbmodel::predict::Calibrator;
    use cfbmodel::CfbError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.cache_dir)?;
        println!("Created data/ and {}/ directories", config.data.cache_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'cfbmodel data import games.csv' to load results");
        println!("  3. Run 'cfbmodel calibrate --mode spread' to calibrate the model");
        println!("  4. Run 'cfbmodel predict \"Team A\" \"Team B\"' to make predictions");

        Ok(())
    }

    fn open_database(config: &Config) -> Result<Database> {
        if let Some(parent) = Path::new(&config.data.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Database::open(&config.data.database_path)
    }

    pub fn data_import(config: &Config, file: &str, full: bool) -> Result<()> {
        let mut db = open_database(config)?;

        let mut games = read_games_csv(file)?;
        println!("Read {} games from {}", games.len(), file);

        if !full {
            if let Some(season) = db.last_season()? {
                games = since_season(games, Some(season));
                println!("Updating from season {} ({} games)", season, games.len());
            }
        }

        let inserted = db.insert_games(&games)?;
        println!(
            "Stored {} new games ({} already present)",
            inserted,
            games.len() - inserted
        );

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = open_database(config)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Games:    {}", stats.game_count);
        println!("  Seasons:  {}", stats.season_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    fn melo_calibrator<'a>(config: &Config, db: &'a Database) -> Calibrator<&'a Database, Melo> {
        let plots = Path::new(&config.data.cache_dir).join("plots");
        Calibrator::new(db, Melo::new(config.model.sigma), config).with_reports(plots)
    }

    pub fn calibrate(
        config: &Config,
        mode: &str,
        steps: Option<usize>,
        retrain: bool,
    ) -> Result<()> {
        let db = open_database(config)?;
        let trials = steps.unwrap_or(config.calibration.trials);

        let model = melo_calibrator(config, &db).calibrate(mode, trials, retrain)?;

        println!("Calibrated {} model", model.mode);
        println!("───────────────────────────────");
        println!("  kfactor:    {:.4}", model.hyperparameters.kfactor);
        println!("  home_field: {:.4}", model.hyperparameters.home_field);
        println!("  halflife:   {:.2}", model.hyperparameters.halflife);
        println!("  fatigue:    {:.4}", model.hyperparameters.fatigue);
        println!("  loss (MAE): {:.4}", model.loss);

        Ok(())
    }

    pub fn predict(
        config: &Config,
        mode: &str,
        home: &str,
        away: &str,
        date: Option<String>,
        home_rest: Option<i64>,
        away_rest: Option<i64>,
    ) -> Result<()> {
        let date = match date {
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| CfbError::Parse(format!("bad date '{}': {}", s, e)))?,
            None => chrono::Local::now().date_naive(),
        };

        let db = open_database(config)?;
        let calibrator = melo_calibrator(config, &db);
        if !calibrator.cache().contains(mode.parse()?) {
            log::info!(
                "No cached {} model, calibrating with {} trials first",
                mode,
                config.calibration.trials
            );
        }
        let model = calibrator.calibrate(mode, config.calibration.trials, false)?;

        for team in [home, away] {
            if !model.model.has_team(team) {
                return Err(CfbError::UnknownTeam(team.to_string()));
            }
        }

        let (home_rest, away_rest) = match (home_rest, away_rest) {
            (Some(h), Some(a)) => (h, a),
            (h, a) => {
                let timeline = TeamTimeline::from_games(&db.get_all_games()?);
                (
                    h.unwrap_or_else(|| timeline.rest_days(home, date)),
                    a.unwrap_or_else(|| timeline.rest_days(away, date)),
                )
            }
        };
        let bias = model.bias(home_rest, away_rest);

        let median = model.median(date, home, away, Some(bias));
        let mean = model.mean(date, home, away, Some(bias));

        println!("{} vs {} ({}, {})", home, away, model.mode, date);
        println!("───────────────────────────────");
        println!("  Rest (days):  {} / {}", home_rest, away_rest);
        println!("  Bias:         {:+.3}", bias);
        println!("  Median:       {:+.1}", median);
        println!("  Mean:         {:+.1}", mean);
        println!(
            "  80% interval: {:+.1} to {:+.1}",
            model.quantile(date, home, away, Some(bias), 0.1),
            model.quantile(date, home, away, Some(bias), 0.9)
        );
        if model.mode.commutes() {
            let line = median.round() - 0.5;
            println!(
                "  P(over {:.1}):  {:.1}%",
                line,
                100.0 * model.probability(date, home, away, Some(bias), line)
            );
        } else {
            println!(
                "  P(home win):  {:.1}%",
                100.0 * model.probability(date, home, away, Some(bias), 0.5)
            );
        }

        Ok(())
    }
}
