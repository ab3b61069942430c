//! Iris classifier CLI
//!
//! Serves the measurement form, or runs one-off predictions against the
//! configured model.

use clap::{Parser, Subcommand};
use iris::{Config, Result};

#[derive(Parser)]
#[command(name = "iris")]
#[command(about = "Iris species prediction from flower measurements", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web form (default)
    Serve {
        /// Override the listening port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Predict one flower from the command line
    Predict {
        sepal_length: String,
        sepal_width: String,
        petal_length: String,
        petal_width: String,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Write a default config file
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

fn main() {
    let cli = Cli::parse();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
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
    if let Err(e) = config.apply_env() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    let log_level = if cli.verbose || config.server.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let command = cli.command.unwrap_or(Commands::Serve { port: None });
    let result = match command {
        Commands::Serve { port } => commands::serve(config, port),
        Commands::Predict {
            sepal_length,
            sepal_width,
            petal_length,
            petal_width,
        } => commands::predict(
            &config,
            iris::predict::PredictForm::new(&sepal_length, &sepal_width, &petal_length, &petal_width),
        ),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use iris::model::{self, Predictor};
    use iris::predict::{self, PredictForm};
    use iris::server::{self, AppState};
    use iris::{IrisError, Outcome};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("model")?;
        println!("Created model/ directory");

        println!("\nNext steps:");
        println!("  1. Place a trained model at {}", config.model.path);
        println!("  2. Run 'iris serve' and open http://localhost:{}/", config.server.port);

        Ok(())
    }

    fn load(config: &Config) -> Option<Predictor> {
        model::load_predictor(&config.model.path, &config.model)
    }

    pub fn serve(mut config: Config, port: Option<u16>) -> Result<()> {
        if let Some(port) = port {
            config.server.port = port;
        }

        // Loaded exactly once; a missing model still serves the form
        let predictor = load(&config);
        if predictor.is_none() {
            log::warn!("Serving without a model; predictions will report it unavailable");
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(server::run(&config.server, AppState::new(predictor)))
    }

    pub fn predict(config: &Config, form: PredictForm) -> Result<()> {
        let predictor = load(config);
        let outcome = predict::handle(predictor.as_ref(), &form);

        match &outcome {
            Outcome::Prediction {
                label,
                confidence: Some(c),
            } => println!("{} ({:.1}% confidence)", label, c),
            _ => println!("{}", outcome),
        }
        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let predictor = model::try_load(&config.model.path, &config.model)?;
        let classes = predictor.classes();
        if classes.is_empty() {
            return Err(IrisError::InvalidModel("model has no classes".to_string()));
        }

        println!("Model Info");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.model.path);
        println!("  Kind:          {}", predictor.kind());
        println!("  Classes:       {}", classes.join(", "));
        println!(
            "  Probabilities: {}",
            if predictor.has_probabilities() { "yes" } else { "no" }
        );

        Ok(())
    }
}
