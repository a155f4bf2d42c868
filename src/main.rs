use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use structure_probe::agent::Runner;
use structure_probe::context::RunConfig;
use structure_probe::driver::WebDriverClient;
use structure_probe::model::StructureKind;
use structure_probe::protocol::planner::{CataloguePlanner, Planner, SeedPools};
use structure_probe::protocol::Session;
use structure_probe::report;
use tracing_subscriber::EnvFilter;

/// Quizzes a chat assistant about graphs, trees, linked lists and queues and
/// checks its JSON answers against the expected structure state.
#[derive(Parser)]
#[command(name = "structure-probe", version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WebDriver endpoint, e.g. a running chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Chat page to open
    #[arg(long)]
    chat_url: Option<String>,

    /// Where the CSV export is written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Structures to test (graph, tree, linked_list, queue)
    #[arg(long, value_delimiter = ',')]
    kinds: Option<Vec<StructureKind>>,

    /// RNG seed for reproducible question plans
    #[arg(long)]
    seed: Option<u64>,

    /// Fold accepted operations back into the expected state
    #[arg(long)]
    live_model: bool,

    #[arg(long)]
    max_attempts: Option<u32>,
}

impl Cli {
    fn into_config(self) -> structure_probe::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::new(),
        };
        if let Some(url) = self.webdriver_url {
            config.webdriver_url = url;
        }
        if let Some(url) = self.chat_url {
            config.chat_url = url;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(kinds) = self.kinds {
            config = config.with_kinds(&kinds);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.live_model {
            config = config.enable_live_model();
        }
        if let Some(n) = self.max_attempts {
            config.protocol.max_attempts = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(config: &RunConfig) -> structure_probe::Result<()> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let pools = SeedPools::generate(&mut rng, config.pool_size);
    let plan = CataloguePlanner.generate_plan(&pools, &config.kinds, &mut rng);
    tracing::info!(questions = plan.len(), "question plan ready");

    let driver = WebDriverClient::connect(config)?;
    let mut session = Session::open(driver, config)?;

    let mut runner = Runner::new(config);
    let outcome = runner.run(&mut session, &plan);

    if let Err(e) = session.close() {
        tracing::warn!(error = %e, "failed to close browser session");
    }
    outcome?;

    let path = report::export_csv(&runner.log, &config.output_dir)?;
    println!("\nResponses saved to: {}", path.display());
    report::render_summary(&runner.log, &mut std::io::stdout())?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("structure_probe=info".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = Cli::parse().into_config().and_then(|config| run(&config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}
