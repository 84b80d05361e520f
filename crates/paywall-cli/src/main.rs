//! paywall: operator tooling for the paywall service.
//!
//! ```text
//! paywall config
//! paywall migrate [--db <legacy.db>] [content-id ...]
//! ```
//!
//! Configuration comes from `$PAYWALL_CONFIG` or `./paywall.toml`. Without
//! `--db`, `migrate` reads `[migration] legacy_db`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use paywall_core::{CallContext, InMemoryTreasury, Paywall, PaywallConfig};
use paywall_db::queries::gating_rules;
use paywall_db::SqliteLegacySource;
use paywall_gating::oracle::StubOracle;
use paywall_types::ContentId;
use tracing::info;

/// A parsed command line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Print the effective configuration.
    Config,
    /// Migrate legacy rules from a SQLite file. No ids means every id the
    /// file holds for the configured source.
    Migrate {
        legacy_db: Option<PathBuf>,
        content_ids: Vec<ContentId>,
    },
}

const USAGE: &str = "usage: paywall config | paywall migrate [--db <legacy.db>] [content-id ...]";

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        Some("config") => Ok(Command::Config),
        Some("migrate") => {
            let mut rest = &args[1..];
            let mut legacy_db = None;
            if rest.first().map(String::as_str) == Some("--db") {
                let Some(path) = rest.get(1) else {
                    bail!("--db needs a path\n{USAGE}");
                };
                legacy_db = Some(PathBuf::from(path));
                rest = &rest[2..];
            }
            let content_ids = rest
                .iter()
                .map(|s| {
                    s.parse::<ContentId>()
                        .with_context(|| format!("invalid content id '{s}'"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(Command::Migrate {
                legacy_db,
                content_ids,
            })
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
        None => bail!("{USAGE}"),
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = PaywallConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("paywall={}", config.logging.log_level).parse()?),
        )
        .init();

    match command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Migrate {
            legacy_db,
            content_ids,
        } => {
            let legacy_db = resolve_legacy_db(legacy_db, &config)?;
            migrate(&config, &legacy_db, content_ids)
        }
    }
}

/// `--db` wins over `[migration] legacy_db`.
fn resolve_legacy_db(
    flag: Option<PathBuf>,
    config: &PaywallConfig,
) -> anyhow::Result<PathBuf> {
    match flag.or_else(|| config.migration.legacy_db.clone()) {
        Some(path) => Ok(path),
        None => bail!("no legacy database: pass --db or set [migration] legacy_db"),
    }
}

fn migrate(
    config: &PaywallConfig,
    legacy_db: &Path,
    content_ids: Vec<ContentId>,
) -> anyhow::Result<()> {
    let Some(source_ref) = config.migration.legacy_source else {
        bail!("[migration] legacy_source is not configured");
    };

    let source = SqliteLegacySource::open(legacy_db)
        .with_context(|| format!("opening {}", legacy_db.display()))?;
    let content_ids = if content_ids.is_empty() {
        source.content_ids(&source_ref)?
    } else {
        content_ids
    };
    info!(source = %source_ref, count = content_ids.len(), "migrating legacy rules");

    let paywall = Paywall::new(
        config,
        Box::new(InMemoryTreasury::new()),
        Box::new(StubOracle::new()),
        Box::new(source),
    )?;

    let ctx = CallContext::new(config.platform.owner, now_tick());
    paywall.start_upgrade(&ctx)?;
    let tally = paywall.migrate_from_legacy(&ctx, &source_ref, &content_ids)?;
    let schema_version = paywall.complete_upgrade(&ctx)?;

    let rules = paywall.gating_rules();
    let mut conn = paywall_db::open(legacy_db)?;
    let exported = gating_rules::export(&mut conn, rules.iter().map(|(id, rule)| (id, rule)))?;
    info!(exported, %schema_version, "migrated rules exported");

    println!("{}", serde_json::to_string_pretty(&tally)?);
    if tally.errors > 0 {
        tracing::warn!(errors = tally.errors, "some legacy rules were not migrated");
    }
    Ok(())
}

/// Wall-clock seconds stand in for the substrate clock.
fn now_tick() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_config() {
        assert_eq!(parse_args(&args(&["config"])).expect("parse"), Command::Config);
    }

    #[test]
    fn test_parse_migrate() {
        assert_eq!(
            parse_args(&args(&["migrate", "--db", "old.db", "1", "42"])).expect("parse"),
            Command::Migrate {
                legacy_db: Some(PathBuf::from("old.db")),
                content_ids: vec![1, 42],
            }
        );
        assert_eq!(
            parse_args(&args(&["migrate", "--db", "old.db"])).expect("parse"),
            Command::Migrate {
                legacy_db: Some(PathBuf::from("old.db")),
                content_ids: Vec::new(),
            }
        );
        assert_eq!(
            parse_args(&args(&["migrate", "7"])).expect("parse"),
            Command::Migrate {
                legacy_db: None,
                content_ids: vec![7],
            }
        );
    }

    #[test]
    fn test_legacy_db_falls_back_to_config() {
        let mut config = PaywallConfig::default();
        assert!(resolve_legacy_db(None, &config).is_err());

        config.migration.legacy_db = Some(PathBuf::from("/var/lib/paywall/legacy.db"));
        assert_eq!(
            resolve_legacy_db(None, &config).expect("config path"),
            PathBuf::from("/var/lib/paywall/legacy.db")
        );
        assert_eq!(
            resolve_legacy_db(Some(PathBuf::from("cli.db")), &config).expect("flag"),
            PathBuf::from("cli.db")
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["migrate", "--db"])).is_err());
        assert!(parse_args(&args(&["migrate", "--db", "old.db", "x"])).is_err());
        assert!(parse_args(&args(&["migrate", "old.db"])).is_err());
        assert!(parse_args(&args(&["serve"])).is_err());
    }
}
