mod app;
mod bridge;
mod datekey;
mod help;
mod layout;
mod refresh;
mod render;
mod store;
mod summary;
mod theme;
mod widget;
use crate::app::App;
use crate::bridge::Bridge;
use crate::layout::month_grid;
use crate::refresh::{RefreshSchedule, DEFAULT_INTERVAL};
use crate::render::{updated_label, RenderSink, TextSink};
use crate::store::StoreDir;
use crate::summary::CompactSummary;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use log::LevelFilter;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::io;
use std::num::NonZeroU32;
use std::path::PathBuf;
use time::{macros::format_description, Date, Duration, OffsetDateTime, UtcOffset};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run {
        date: Option<Date>,
        data_dir: PathBuf,
        interval: Duration,
        log_file: Option<PathBuf>,
    },
    Print {
        date: Option<Date>,
        data_dir: PathBuf,
        compact: bool,
        log_file: Option<PathBuf>,
    },
    Bridge {
        data_dir: PathBuf,
        log_file: Option<PathBuf>,
    },
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut date = None;
        let mut data_dir = PathBuf::from(".");
        let mut interval = DEFAULT_INTERVAL;
        let mut log_file = None;
        let mut print = false;
        let mut compact = false;
        let mut bridge = false;
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Short('d') | Arg::Long("data-dir") => {
                    data_dir = PathBuf::from(parser.value()?);
                }
                Arg::Short('i') | Arg::Long("interval") => {
                    let minutes = parser.value()?.parse::<NonZeroU32>()?;
                    interval = Duration::minutes(i64::from(minutes.get()));
                }
                Arg::Short('l') | Arg::Long("log-file") => {
                    log_file = Some(PathBuf::from(parser.value()?));
                }
                Arg::Short('p') | Arg::Long("print") => print = true,
                Arg::Short('c') | Arg::Long("compact") => compact = true,
                Arg::Long("bridge") => bridge = true,
                Arg::Value(value) if date.is_none() => {
                    let value = value.string()?;
                    match Date::parse(&value, format_description!("[year]-[month]-[day]")) {
                        Ok(d) => date = Some(d),
                        Err(e) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: Box::new(e),
                            })
                        }
                    }
                }
                _ => return Err(arg.unexpected()),
            }
        }
        if bridge {
            Ok(Command::Bridge { data_dir, log_file })
        } else if print || compact {
            Ok(Command::Print {
                date,
                data_dir,
                compact,
                log_file,
            })
        } else {
            Ok(Command::Run {
                date,
                data_dir,
                interval,
                log_file,
            })
        }
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run {
                date,
                data_dir,
                interval,
                log_file,
            } => {
                // Anything written to stderr would tear up the screen
                init_logging(log_file, LevelFilter::Off)?;
                let offset = UtcOffset::current_local_offset()
                    .context("failed to determine local time zone")?;
                let now = OffsetDateTime::now_utc().to_offset(offset);
                with_terminal(|mut terminal| {
                    terminal.hide_cursor().context("failed to hide cursor")?;
                    let schedule = RefreshSchedule::new(interval, now);
                    let mut app = App::new(terminal, StoreDir::new(data_dir), schedule, offset);
                    if let Some(date) = date {
                        app = app.pin_date(date);
                    }
                    app.run()?;
                    Ok(())
                })
            }
            Command::Print {
                date,
                data_dir,
                compact,
                log_file,
            } => {
                init_logging(log_file, LevelFilter::Warn)?;
                let now = OffsetDateTime::now_local().context("failed to determine local time")?;
                let today = date.unwrap_or_else(|| now.date());
                let prefs = StoreDir::new(data_dir)
                    .load_events()
                    .context("failed to load event store")?;
                if compact {
                    println!("{}", CompactSummary::new(today, &prefs));
                } else {
                    let grid = month_grid(today, &prefs);
                    TextSink::new(io::stdout().lock())
                        .updated(updated_label(now))
                        .render(&grid)
                        .context("failed to write calendar")?;
                }
                Ok(())
            }
            Command::Bridge { data_dir, log_file } => {
                init_logging(log_file, LevelFilter::Warn)?;
                let input = io::read_to_string(io::stdin()).context("failed to read request")?;
                let response =
                    Bridge::new(StoreDir::new(data_dir)).handle_json(&input, OffsetDateTime::now_utc());
                println!(
                    "{}",
                    serde_json::to_string(&response).context("failed to encode response")?
                );
                Ok(())
            }
            Command::Help => {
                println!("Usage: plancal [OPTIONS] [YYYY-MM-DD]");
                println!();
                println!("Month-view planner calendar fed by a shared event store");
                println!();
                println!("Options:");
                println!("  -d, --data-dir DIR      Directory holding the event store [default: .]");
                println!("  -i, --interval MINUTES  Refresh the grid this often [default: 15]");
                println!("  -p, --print             Print the month grid once and exit");
                println!("  -c, --compact           Print the compact summary once and exit");
                println!("      --bridge            Handle one JSON request from stdin and exit");
                println!("  -l, --log-file FILE     Append log messages to FILE");
                println!("  -h, --help              Display this help message and exit");
                println!("  -V, --version           Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

/// Set up `env_logger`.  `RUST_LOG` always wins; otherwise logging to a file
/// defaults to `info` and logging to stderr to `default_level`.
fn init_logging(log_file: Option<PathBuf>, default_level: LevelFilter) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .filter_level(LevelFilter::Info)
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(default_level);
        }
    }
    builder
        .parse_default_env()
        .try_init()
        .context("failed to initialize logging")?;
    Ok(())
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}
