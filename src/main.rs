use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pr_pulse::github::{FetchError, GitHubFetcher, PullRequestSource};
use pr_pulse::notify::{JsonLinesSink, LogSink, Notifier};
use pr_pulse::store::{JsonFileBackend, StatusStore};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve browser events from stdin and emit notifications on stdout (default)
    Run,
    /// Start tracking a pull request page as if a tab had opened it
    Track {
        /// Pull request URL, e.g. https://github.com/owner/repo/pull/123
        url: String,
        /// Tab id to bind the record to
        #[arg(long, default_value_t = 0)]
        tab: i64,
    },
    /// Forget every pull request bound to a tab
    Untrack {
        #[arg(long)]
        tab: i64,
    },
    /// Refresh all tracked pull requests once
    Poll,
    /// List tracked pull requests
    List {
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Open a tracked pull request in the browser by its index number
    Open {
        /// Index number of the PR to open (1-based, as shown in list)
        index: usize,
    },
    /// Store a GitHub token in the system keyring
    Auth,
}

#[derive(Parser, Debug)]
#[command(name = "pr-pulse")]
#[command(about = "Pull request status notifications for the tabs you have open", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/pr-pulse/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<FetchError>() {
        Some(e) if e.is_auth() => EXIT_AUTH,
        _ => EXIT_NETWORK,
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+); an Err
    // only means one is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    pr_pulse::logging::init_logging(cli.verbose);

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match pr_pulse::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = config.validate() {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    if let Commands::Auth = command {
        match pr_pulse::credentials::login(&config.api_base_url).await {
            Ok(login) => {
                println!("Token for {} stored securely in system keyring.", login);
                std::process::exit(EXIT_SUCCESS);
            }
            Err(e) => {
                eprintln!("Authentication failed: {:#}", e);
                std::process::exit(EXIT_AUTH);
            }
        }
    }

    let store_path = config.store_path();
    let store = match StatusStore::open(JsonFileBackend::new(&store_path)) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Status store error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    tracing::debug!(path = %store_path.display(), "opened status store");

    // Commands that only read the store
    match &command {
        Commands::List { tsv } => {
            let records: Vec<_> = match store.get_all() {
                Ok(r) => r.into_values().collect(),
                Err(e) => {
                    eprintln!("Status store error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            let use_colors = pr_pulse::output::should_use_colors();

            if *tsv {
                println!("{}", pr_pulse::output::format_tsv(&records));
            } else if cli.verbose && !records.is_empty() {
                for record in &records {
                    println!("{}", pr_pulse::output::format_record_detail(record, use_colors));
                    println!();
                }
            } else {
                println!("{}", pr_pulse::output::format_status_table(&records, use_colors));
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Open { index } => {
            let records: Vec<_> = store
                .get_all()
                .map(|r| r.into_values().collect())
                .unwrap_or_default();

            // Validate index bounds (1-based)
            if *index < 1 || *index > records.len() {
                eprintln!(
                    "Invalid index {}. Must be between 1 and {}.",
                    index,
                    records.len()
                );
                std::process::exit(EXIT_CONFIG);
            }

            match pr_pulse::browser::open_pull_request(&records[index - 1]) {
                Ok(url) => println!("Opening {} in browser: {}", records[index - 1].short_ref(), url),
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_NETWORK);
                }
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Untrack { tab } => {
            let binder = pr_pulse::tabs::TabBinder::new(
                Arc::new(GitHubFetcher::new(config.api_base_url.clone(), None)),
                store.clone(),
            );
            match binder.on_tab_removed(*tab) {
                Ok(removed) => {
                    println!("Stopped tracking {} pull request(s) for tab {}", removed.len(), tab);
                    std::process::exit(EXIT_SUCCESS);
                }
                Err(e) => {
                    eprintln!("Status store error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        _ => {}
    }

    let token = pr_pulse::credentials::resolve_token().await;
    if token.is_none() {
        if let Commands::Run = command {
            tracing::warn!(
                "No GitHub token found; status updates will fail until {} is set or `pr-pulse auth` is run",
                pr_pulse::credentials::ENV_TOKEN_VAR
            );
        } else {
            eprintln!(
                "No GitHub token found. Set {} or run `pr-pulse auth`.",
                pr_pulse::credentials::ENV_TOKEN_VAR
            );
            std::process::exit(EXIT_AUTH);
        }
    }

    let source: Arc<dyn PullRequestSource> =
        Arc::new(GitHubFetcher::new(config.api_base_url.clone(), token));

    // Poll interval was validated above
    let poll_interval = config
        .poll_interval()
        .unwrap_or_else(|_| std::time::Duration::from_secs(60));

    match command {
        Commands::Run => {
            let services = pr_pulse::host::HostServices {
                store,
                source,
                sink: Arc::new(JsonLinesSink::new(std::io::stdout())),
                max_concurrent_fetches: config.max_concurrent_fetches,
            };
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            if let Err(e) = pr_pulse::host::run_host(input, services, poll_interval).await {
                eprintln!("Host error: {:#}", e);
                std::process::exit(EXIT_NETWORK);
            }
        }
        Commands::Track { url, tab } => {
            let notifier = Notifier::new(Arc::new(LogSink)).spawn(store.subscribe());
            let binder = pr_pulse::tabs::TabBinder::new(source, store.clone());
            let result = binder.on_navigation(tab, &url).await;
            let _ = notifier.shutdown().await;

            match result {
                Ok(Some(change)) => {
                    if let Some(record) = change.new {
                        println!(
                            "Tracking {} ({}) for tab {}",
                            record.short_ref(),
                            record.status,
                            record.tab_id
                        );
                    }
                }
                Ok(None) => {
                    eprintln!("Not a pull request URL: {}", url);
                    std::process::exit(EXIT_CONFIG);
                }
                Err(e) => {
                    eprintln!("Failed to track {}: {:#}", url, e);
                    std::process::exit(exit_code_for(&e));
                }
            }
        }
        Commands::Poll => {
            let notifier = Notifier::new(Arc::new(LogSink)).spawn(store.subscribe());
            let poller = pr_pulse::poll::Poller::new(source, store.clone())
                .with_max_concurrent(config.max_concurrent_fetches);
            let result = poller.poll_once().await;
            let _ = notifier.shutdown().await;

            match result {
                Ok(summary) => {
                    println!(
                        "Checked {}: {} updated, {} not modified, {} failed",
                        summary.checked, summary.updated, summary.not_modified, summary.failed
                    );
                    if summary.checked > 0 && summary.failed == summary.checked {
                        std::process::exit(EXIT_NETWORK);
                    }
                }
                Err(e) => {
                    eprintln!("Poll failed: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::List { .. } | Commands::Open { .. } | Commands::Untrack { .. } | Commands::Auth => {}
    }

    std::process::exit(EXIT_SUCCESS);
}
