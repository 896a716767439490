// Local crates
use crate::{
    git::git::GitCli,
    helpers::{build_info, load_config::Config},
    instrumentation,
    runtime,
    sqlmesh::execution_log::ExecutionCommand,
    synq::{credentials::StaticToken, shipper::SynqTarget},
};

// External crates
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "synq-sqlmesh",
    about = "Small utility to collect SQLMesh metadata information and upload it to Synq",
    version,
    term_width = 100,
    after_help = "\
    EXAMPLES:
        synq-sqlmesh collect metadata.json
        SYNQ_TOKEN=st-... synq-sqlmesh upload --sqlmesh-project-dir ./warehouse
        synq-sqlmesh upload-run run.log --sqlmesh-ui-start=false"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: Overrides,

    /// TOML configuration file. Flags take precedence over its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Settings that override the configuration file.
#[derive(Args, Debug, Default, Clone)]
struct Overrides {
    /// Synq API token
    #[arg(long, env = "SYNQ_TOKEN", hide_env_values = true, global = true)]
    synq_token: Option<String>,

    /// Synq API endpoint URL [default: https://developer.synq.io/]
    #[arg(long, global = true)]
    synq_endpoint: Option<String>,

    /// SQLMesh launcher location [default: sqlmesh]
    #[arg(long = "sqlmesh-cmd", global = true)]
    sqlmesh_cmd: Option<String>,

    /// Location of SQLMesh project directory [default: .]
    #[arg(long, global = true)]
    sqlmesh_project_dir: Option<PathBuf>,

    /// Launch and control SQLMesh UI process automatically [default: true]
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    sqlmesh_ui_start: Option<bool>,

    /// SQLMesh UI host [default: localhost]
    #[arg(long, global = true)]
    sqlmesh_ui_host: Option<String>,

    /// SQLMesh UI port [default: 8080]
    #[arg(long, global = true)]
    sqlmesh_ui_port: Option<u16>,

    /// Collect content of project files [default: false]
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    collect_file_content: Option<bool>,

    /// Comma separated glob patterns of files whose content is collected
    #[arg(long, global = true)]
    file_content_include: Option<String>,

    /// Comma separated glob patterns excluded from content collection
    #[arg(long, global = true)]
    file_content_exclude: Option<String>,
}

impl Overrides {
    fn apply(self, cfg: &mut Config) {
        if let Some(token) = self.synq_token {
            cfg.synq.token = Some(token);
        }
        if let Some(endpoint) = self.synq_endpoint {
            cfg.synq.endpoint = endpoint;
        }
        if let Some(command) = self.sqlmesh_cmd {
            cfg.sqlmesh.command = command;
        }
        if let Some(dir) = self.sqlmesh_project_dir {
            cfg.sqlmesh.project_dir = dir;
        }
        if let Some(start) = self.sqlmesh_ui_start {
            cfg.sqlmesh.ui_start = start;
        }
        if let Some(host) = self.sqlmesh_ui_host {
            cfg.sqlmesh.ui_host = host;
        }
        if let Some(port) = self.sqlmesh_ui_port {
            cfg.sqlmesh.ui_port = port;
        }
        if let Some(collect) = self.collect_file_content {
            cfg.files.collect_content = collect;
        }
        if let Some(include) = self.file_content_include {
            cfg.files.include = include;
        }
        if let Some(exclude) = self.file_content_exclude {
            cfg.files.exclude = exclude;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect metadata information from SQLMesh and store to the file
    Collect {
        /// Destination JSON file
        output: PathBuf,
    },

    /// Collect metadata information from SQLMesh and send to Synq API
    Upload,

    /// Send the log of a `sqlmesh run` to Synq API
    UploadRun {
        /// Captured output of `sqlmesh run`
        log_file: PathBuf,

        /// Store the execution to this file instead of uploading it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send the log of a `sqlmesh audit` to Synq API
    UploadAudit {
        /// Captured output of `sqlmesh audit`
        log_file: PathBuf,

        /// Store the execution to this file instead of uploading it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Validate,

    /// Print the version number of synq-sqlmesh
    Version,
}

/// Entry function for CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let log_dir = config
        .as_ref()
        .ok()
        .and_then(|cfg| cfg.logging.directory.clone());
    let _guard = match instrumentation::tracing::init_tracing(cli.verbose, log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            // No subscriber to report through.
            eprintln!("Error initializing logging: {e:#}");
            return Err(e);
        }
    };

    let result = match config {
        Ok(config) => dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Error executing command");
    }
    result
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load_or_default(cli.config.as_deref())?;
    cli.overrides.clone().apply(&mut cfg);
    Ok(cfg)
}

async fn dispatch(command: Commands, config: Config) -> Result<()> {
    let git = GitCli::new(&config.sqlmesh.project_dir);
    let credentials = StaticToken::new(config.synq.token.clone().unwrap_or_default());

    match command {
        Commands::Collect { output } => {
            runtime::runtime::collect_to_file(&config, &git, &output).await?
        }
        Commands::Upload => runtime::runtime::upload(&config, &git, credentials).await?,
        Commands::UploadRun { log_file, output } => {
            runtime::runtime::upload_execution(
                &config,
                &git,
                credentials,
                ExecutionCommand::Run,
                &log_file,
                output.as_deref(),
            )
            .await?
        }
        Commands::UploadAudit { log_file, output } => {
            runtime::runtime::upload_execution(
                &config,
                &git,
                credentials,
                ExecutionCommand::Audit,
                &log_file,
                output.as_deref(),
            )
            .await?
        }
        Commands::Validate => validate_config(&config)?,
        Commands::Version => show_version(),
    }

    Ok(())
}

//
// ------------------------ Command Implementations ------------------------------
//

/// Print the configuration after flags and environment were applied
fn validate_config(config: &Config) -> Result<()> {
    config.sqlmesh.base_url()?;
    SynqTarget::parse(&config.synq.endpoint)?;
    let mut printable = config.clone();
    if printable.synq.token.is_some() {
        printable.synq.token = Some("<redacted>".into());
    }
    let rendered = toml::to_string_pretty(&printable).context("failed to render configuration")?;
    println!("Configuration valid:\n{rendered}");
    Ok(())
}

fn show_version() {
    println!(
        "{} {} ({})",
        build_info::NAME,
        build_info::VERSION,
        build_info::build_time()
    );
}
