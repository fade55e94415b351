pub mod prompt;
pub mod table;

use std::{ffi::OsString, fmt::Display, io::Write, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::{error::ErrorKind, Parser, ValueEnum};
use prompt::{Prompt, StdinPrompt};
use table::kata_table;
use tracing::{info, level_filters::LevelFilter, warn};

use crate::{
    catalog::{self, github::GithubCatalog, CatalogClient, Kata},
    enrichment::{
        clone::GitCloner, lines::ExtensionLineCounter, partition, EnrichmentConfig, Enricher,
        FailedEnrichment, DEFAULT_CONCURRENCY,
    },
    ledger::{last_completion, needs_confirmation, Ledger, LedgerFile},
    report::{Boundary, CalendarGrid},
    sort::{sort_katas, SortKey},
    utils::{
        clock::{Clock, SystemClock},
        dir::{create_application_default_path, default_ledger_path},
        logging::{enable_logging, CLI_PREFIX},
    },
};

const DEFAULT_REPORT_DAYS: u32 = 90;
const DEFAULT_WIDE_REPORT_DAYS: u32 = 180;
const MAX_REPORT_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "katatrack", version, long_about = None)]
#[command(about = "Practice katas and keep track of what you've done")]
struct Args {
    #[arg(
        long,
        value_name = "PATH",
        help = "Where to keep katas you've done. By default $HOME/gokatas.json"
    )]
    donefile: Option<PathBuf>,
    #[arg(long, value_name = "KATA", help = "You've just done KATA")]
    done: Option<String>,
    #[arg(
        short,
        long,
        help = "Don't ask for confirmation when a kata is done again within 5 minutes"
    )]
    yes: bool,
    #[arg(
        long,
        value_name = "COLUMN",
        default_value_t = SortKey::Name,
        help = "Sort by COLUMN: name, desc, lines, done or last"
    )]
    sortby: SortKey,
    #[arg(short, long, help = "Show clone URLs and topics as well")]
    wide: bool,
    #[arg(short, long, help = "Show a calendar of done katas instead of the table")]
    report: bool,
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(0..=MAX_REPORT_DAYS),
        help = "Days covered by the calendar. 90 by default, 180 together with --wide"
    )]
    days: Option<u32>,
    #[arg(
        long,
        help = "Last day of the calendar. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\""
    )]
    until: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, default_value = "gokatas", help = "GitHub organisation hosting the katas")]
    org: String,
    #[arg(long, default_value = "go", help = "Extension of the files whose lines are counted")]
    ext: String,
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, help = "How many katas are cloned at once")]
    concurrency: usize,
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 120,
        help = "Give up on a kata whose clone and count take longer than this"
    )]
    clone_timeout: u64,
    #[arg(long, help = "Print logs to stderr")]
    log: bool,
}

/// Everything a run needs to know, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_path: PathBuf,
    pub done: Option<String>,
    pub assume_yes: bool,
    pub sort_key: SortKey,
    pub wide: bool,
    pub report: bool,
    pub report_days: u32,
    /// End of the calendar window. Now when absent.
    pub report_until: Option<DateTime<Local>>,
    pub organisation: String,
    pub extension: String,
    pub enrichment: EnrichmentConfig,
}

impl Config {
    #[cfg(test)]
    pub fn new(ledger_path: PathBuf) -> Self {
        Self {
            ledger_path,
            done: None,
            assume_yes: false,
            sort_key: SortKey::Name,
            wide: false,
            report: false,
            report_days: DEFAULT_REPORT_DAYS,
            report_until: None,
            organisation: "gokatas".into(),
            extension: "go".into(),
            enrichment: EnrichmentConfig::default(),
        }
    }

    fn from_args(args: Args, now: DateTime<Local>) -> Result<Self> {
        let ledger_path = match args.donefile {
            Some(path) => path,
            None => default_ledger_path()?,
        };

        let report_until = match args.until {
            Some(until) => match parse_date_string(&until, now, args.date_style.into()) {
                Ok(v) => Some(v),
                Err(e) => return Err(anyhow!("can't make sense of --until {until:?}: {e}")),
            },
            None => None,
        };

        let report_days = args.days.unwrap_or(if args.wide {
            DEFAULT_WIDE_REPORT_DAYS
        } else {
            DEFAULT_REPORT_DAYS
        });

        Ok(Self {
            ledger_path,
            done: args.done,
            assume_yes: args.yes,
            sort_key: args.sortby,
            wide: args.wide,
            report: args.report,
            report_days,
            report_until,
            organisation: args.org,
            extension: args.ext,
            enrichment: EnrichmentConfig {
                concurrency: args.concurrency.max(1),
                task_timeout: Duration::from_secs(args.clone_timeout),
                workspace_root: None,
            },
        })
    }
}

/// One invocation: fetch, optionally record, then print the table or the calendar.
pub struct App {
    catalog: Box<dyn CatalogClient>,
    enricher: Enricher,
    clock: Box<dyn Clock>,
    prompt: Box<dyn Prompt>,
}

impl App {
    pub fn new(
        catalog: Box<dyn CatalogClient>,
        enricher: Enricher,
        clock: Box<dyn Clock>,
        prompt: Box<dyn Prompt>,
    ) -> Self {
        Self {
            catalog,
            enricher,
            clock,
            prompt,
        }
    }

    /// Writes the requested output into `out` and returns the katas that couldn't be enriched.
    pub async fn run(
        &mut self,
        config: &Config,
        out: &mut impl Write,
    ) -> Result<Vec<FailedEnrichment>> {
        let katas = catalog::visible(self.catalog.fetch().await?);
        info!("{} katas in the catalog", katas.len());

        let ledger_file = LedgerFile::new(&config.ledger_path);
        let mut ledger = ledger_file.load().await?;

        if let Some(name) = &config.done {
            self.mark_done(&ledger_file, &mut ledger, &katas, name, config.assume_yes)
                .await?;
        }

        if config.report {
            self.print_report(config, &ledger, katas, out)?;
            return Ok(vec![]);
        }

        let (mut enriched, failed) = partition(self.enricher.enrich_all(katas).await);
        ledger.merge(&mut enriched);
        sort_katas(&mut enriched, config.sort_key);

        let now = self.clock.time();
        kata_table(&enriched, config.wide, &now)
            .write_to(out)
            .context("Failed to print katas")?;
        Ok(failed)
    }

    async fn mark_done(
        &mut self,
        ledger_file: &LedgerFile,
        ledger: &mut Ledger,
        katas: &[Kata],
        name: &str,
        assume_yes: bool,
    ) -> Result<()> {
        let now = self.clock.time();
        let completions = ledger.completions(name);
        if !assume_yes && needs_confirmation(completions, now) {
            let minutes = last_completion(completions)
                .map(|last| (now - last).num_minutes())
                .unwrap_or_default();
            let question = format!("You did {name} {minutes} minutes ago. Record it again?");
            if !self.prompt.confirm(&question)? {
                info!("Not recording {name} again");
                return Ok(());
            }
        }
        ledger_file.record(ledger, katas, name, now).await?;
        Ok(())
    }

    fn print_report(
        &self,
        config: &Config,
        ledger: &Ledger,
        mut katas: Vec<Kata>,
        out: &mut impl Write,
    ) -> Result<()> {
        ledger.merge(&mut katas);
        let now = self.clock.time().with_timezone(&Local);
        let until = config.report_until.unwrap_or(now);
        let boundary = Boundary::lookback(until, config.report_days)?;
        let grid = CalendarGrid::new(&katas, &boundary, &now);
        write!(out, "{grid}").context("Failed to print report")?;
        Ok(())
    }
}

/// Parses the command line. Help and version still print and exit the clap way, every other
/// problem becomes a one-line error.
fn parse_args<I, T>(raw: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(raw).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
        _ => {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            anyhow!("{}", first.trim_start_matches("error: ").trim())
        }
    })
}

pub async fn run_cli() -> Result<()> {
    let args = parse_args(std::env::args_os())?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let log_dir = create_application_default_path()?.join("logs");
    enable_logging(CLI_PREFIX, &log_dir, logging_level, args.log)?;

    let clock = SystemClock;
    let config = Config::from_args(args, clock.time().with_timezone(&Local))?;

    let enricher = Enricher::new(
        Box::new(GitCloner),
        Box::new(ExtensionLineCounter::new(config.extension.clone())),
        config.enrichment.clone(),
    );
    let mut app = App::new(
        Box::new(GithubCatalog::new(&config.organisation)),
        enricher,
        Box::new(clock),
        Box::new(StdinPrompt),
    );

    let failed = app.run(&config, &mut std::io::stdout().lock()).await?;
    for failure in failed {
        warn!("Skipped {}: {}", failure.kata.name, failure.error);
        eprintln!(
            "{}: skipping {}: {}",
            env!("CARGO_PKG_NAME"),
            failure.kata.name,
            failure.error
        );
    }
    Ok(())
}
