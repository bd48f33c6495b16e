use anyhow::Result;
use clap::{Parser, Subcommand};
use content_maint::cli::{self, screen_filter};
use content_maint::database_ops::placeholders::FillerScope;
use content_maint::database_ops::repair::RepairMode;
use content_maint::model::{Language, TranslationStatus};
use content_maint::tracing::{init_tracing, DEFAULT_FILTER};
use content_maint::util::env;
use std::path::PathBuf;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(name = "cm", version, about = "Content maintenance CLI for the multilingual CMS")]
struct Cli {
    /// Optional override for the database URL (defaults to CONTENT_DATABASE_URL / DATABASE_URL)
    #[arg(long, global = true)]
    db_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Per-screen translation coverage and approved-translation violations
    Coverage {
        #[arg(long)]
        screen: Option<String>,
        /// Only screens whose location starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// How many violating items to list
        #[arg(long, default_value_t = 20)]
        show_violations: usize,
    },
    /// Insert missing ru/he/en translations for items on the selected screens
    FixMissing {
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, value_enum, default_value_t = RepairMode::Suggest)]
        mode: RepairMode,
        /// Print the planned writes without touching the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = 30)]
        show: usize,
    },
    /// Upsert one translation by content key
    SetTranslation {
        content_key: String,
        #[arg(long)]
        lang: Language,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "approved", value_parser = ["approved", "draft"])]
        status: String,
    },
    /// Find (and optionally delete) placeholder translations
    Placeholders {
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, value_enum, default_value_t = FillerScope::Generated)]
        scope: FillerScope,
        #[arg(long, default_value_t = false)]
        purge: bool,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = 20)]
        show: usize,
    },
    /// Inspect or edit navigation_mapping rows
    Nav {
        #[command(subcommand)]
        action: NavCommand,
    },
    /// List application contexts with their item counts
    Contexts,
    /// Audit dropdown components, their options and payloads
    Dropdowns {
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Exit with status 1 when any issue is found
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Show what the drill view renders for one screen in one language
    Drill {
        screen_location: String,
        #[arg(long, default_value = "ru")]
        lang: Language,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Export items without any translation to CSV and a translator handoff JSON
    Export {
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value = "missing_translations")]
        file_prefix: String,
    },
    /// Full translation QA report; exits 1 when quality is poor
    Qa {
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Copy translations of identical fields from one key family to another
    CopyTranslations {
        #[arg(long, default_value = "mortgage")]
        from: String,
        #[arg(long, default_value = "credit")]
        to: String,
        /// Comma-separated override of the identical field list
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = 40)]
        show: usize,
    },
    /// Apply SQL data scripts in one transaction and print section counts
    ApplySql {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "3.1")]
        section: String,
        #[arg(long)]
        show_screen: Option<String>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Smoke-test the running content API
    Smoke {
        /// Overrides CONTENT_API_URL
        #[arg(long)]
        base_url: Option<String>,
        #[command(subcommand)]
        check: SmokeCommand,
    },
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum NavCommand {
    /// List mappings, optionally for one parent section
    List {
        #[arg(long)]
        section: Option<String>,
    },
    /// Exchange the screen locations of two entries in a section
    Swap {
        section: String,
        num_a: String,
        num_b: String,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Point one entry at a screen location
    Set {
        section: String,
        num: String,
        screen_location: String,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum SmokeCommand {
    /// Request each drill step and report its actions
    Drill {
        #[arg(long, default_value = "mortgage-refi")]
        content_type: String,
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "refinance_mortgage_1,refinance_mortgage_2,refinance_mortgage_3,refinance_mortgage_4"
        )]
        steps: Vec<String>,
    },
    /// Compare list action counts with drill results
    Mismatches {
        #[arg(long, value_delimiter = ',', default_value = "mortgage,mortgage-refi")]
        content_types: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    env::bootstrap_cli("cm");
    env::preflight_check(
        "cm",
        &[],
        &["CONTENT_DATABASE_URL", "DATABASE_URL", "DB_SSL_INSECURE", "CONTENT_API_URL"],
    )?;

    let args = Cli::parse();
    let database_url = args.db_url;

    match args.command {
        Commands::Coverage { screen, prefix, json, show_violations } => {
            cli::coverage::run(cli::coverage::CoverageConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                json,
                show_violations,
            })
            .await?;
        }
        Commands::FixMissing { screen, prefix, mode, dry_run, show } => {
            cli::repair::run(cli::repair::RepairConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                mode,
                dry_run,
                show,
            })
            .await?;
        }
        Commands::SetTranslation { content_key, lang, value, status } => {
            cli::repair::run_set(cli::repair::SetTranslationConfig {
                database_url,
                content_key,
                language: lang,
                value,
                status: TranslationStatus::from(status.as_str()),
            })
            .await?;
        }
        Commands::Placeholders { screen, prefix, scope, purge, dry_run, show } => {
            cli::placeholders::run(cli::placeholders::PlaceholdersConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                scope,
                purge,
                dry_run,
                show,
            })
            .await?;
        }
        Commands::Nav { action } => {
            let action = match action {
                NavCommand::List { section } => cli::navigation::NavAction::List { parent_section: section },
                NavCommand::Swap { section, num_a, num_b, dry_run } => cli::navigation::NavAction::Swap {
                    parent_section: section,
                    num_a,
                    num_b,
                    dry_run,
                },
                NavCommand::Set { section, num, screen_location, dry_run } => cli::navigation::NavAction::Set {
                    parent_section: section,
                    num,
                    screen_location,
                    dry_run,
                },
            };
            cli::navigation::run(cli::navigation::NavigationConfig { database_url, action }).await?;
        }
        Commands::Contexts => {
            cli::navigation::run(cli::navigation::NavigationConfig {
                database_url,
                action: cli::navigation::NavAction::Contexts,
            })
            .await?;
        }
        Commands::Dropdowns { screen, prefix, json, strict } => {
            let issues = cli::dropdowns::run(cli::dropdowns::DropdownsConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                json,
            })
            .await?;
            if strict && issues > 0 {
                warn!(issues, "dropdown audit found issues");
                std::process::exit(1);
            }
        }
        Commands::Drill { screen_location, lang, json } => {
            cli::drill::run(cli::drill::DrillConfig { database_url, screen_location, language: lang, json }).await?;
        }
        Commands::Export { screen, prefix, out_dir, file_prefix } => {
            cli::export::run(cli::export::ExportConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                out_dir,
                prefix: file_prefix,
            })
            .await?;
        }
        Commands::Qa { screen, prefix, out_dir } => {
            let passes = cli::qa::run(cli::qa::QaConfig {
                database_url,
                filter: screen_filter(screen, prefix),
                out_dir,
            })
            .await?;
            if !passes {
                error!("translation quality below threshold");
                std::process::exit(1);
            }
        }
        Commands::CopyTranslations { from, to, fields, dry_run, show } => {
            cli::copy::run(cli::copy::CopyConfig {
                database_url,
                from_prefix: from,
                to_prefix: to,
                fields,
                dry_run,
                show,
            })
            .await?;
        }
        Commands::ApplySql { files, section, show_screen, dry_run } => {
            cli::script::run(cli::script::ApplySqlConfig { database_url, files, section, show_screen, dry_run })
                .await?;
        }
        Commands::Smoke { base_url, check } => {
            let check = match check {
                SmokeCommand::Drill { content_type, steps } => cli::smoke::SmokeCheck::Drill { content_type, steps },
                SmokeCommand::Mismatches { content_types } => cli::smoke::SmokeCheck::Mismatches { content_types },
            };
            let passed = cli::smoke::run(cli::smoke::SmokeConfig { base_url, check }).await?;
            if !passed {
                error!("content API smoke checks failed");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
