mod calendar;
mod cards;
mod config;
mod drag;
mod events;
mod layout;
mod memo;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::calendar::upcoming;
use crate::config::load_config;
use crate::events::{date_key, parse_date_key, EventStore};
use crate::layout::LayoutStore;
use crate::memo::Memo;
use crate::storage::{resolve_state_dir, FileStore};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "deskdash", about = "Terminal-first personal dashboard")]
struct Cli {
    #[arg(long)]
    state_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Dashboard,
    EditEvent {
        #[arg(long)]
        date: String,
        #[arg(long)]
        title: String,
    },
    RemoveEvent {
        #[arg(long)]
        date: String,
    },
    Events,
    Upcoming {
        #[arg(long)]
        limit: Option<usize>,
    },
    Layout,
    ResetLayout,
    Memo {
        #[arg(long)]
        set: Option<String>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut store = FileStore::new(resolve_state_dir(cli.state_dir));
    let (config, config_warning) = load_config(store.dir());
    report_warning(config_warning);

    match cli.command.unwrap_or(Command::Dashboard) {
        Command::Dashboard => run_dashboard(&mut store, &config)?,
        Command::EditEvent { date, title } => {
            let key = date_key(parse_date_arg(&date)?);
            let mut events = EventStore::load(&store);
            report_warning(events.take_warning());
            let removed = title.trim().is_empty();
            events.edit(&mut store, &key, Some(title.as_str()));
            report_warning(events.take_warning());
            if removed {
                println!("removed event for {key}");
            } else {
                println!("saved event for {key}");
            }
        }
        Command::RemoveEvent { date } => {
            let key = date_key(parse_date_arg(&date)?);
            let mut events = EventStore::load(&store);
            report_warning(events.take_warning());
            events.edit(&mut store, &key, None);
            report_warning(events.take_warning());
            println!("removed event for {key}");
        }
        Command::Events => {
            let mut events = EventStore::load(&store);
            report_warning(events.take_warning());
            if events.all().is_empty() {
                println!("no events recorded");
            } else {
                for (key, titles) in events.all() {
                    for title in titles {
                        println!("{key} {title}");
                    }
                }
            }
        }
        Command::Upcoming { limit } => {
            let mut events = EventStore::load(&store);
            report_warning(events.take_warning());
            let today = Local::now().date_naive();
            let rows = upcoming(&events, today, limit.unwrap_or(config.upcoming_limit));
            if rows.is_empty() {
                println!("no upcoming events");
            } else {
                for entry in rows {
                    println!("{} {}", entry.date_key, entry.title);
                }
            }
        }
        Command::Layout => {
            let mut layout = LayoutStore::load(&store);
            report_warning(layout.take_warning());
            for (id, card) in layout.snapshot() {
                println!(
                    "{id:<16} {:>4},{:<3} {:>6} x {:<6} {}",
                    card.x,
                    card.y,
                    card.width,
                    card.height,
                    if card.visible() { "visible" } else { "hidden" }
                );
            }
        }
        Command::ResetLayout => {
            let mut layout = LayoutStore::load(&store);
            report_warning(layout.take_warning());
            layout.apply_defaults(&mut store);
            report_warning(layout.take_warning());
            println!("layout reset to defaults");
        }
        Command::Memo { set } => {
            let mut memo = Memo::load(&store);
            match set {
                Some(text) => {
                    let status = memo.save(&mut store, text)?;
                    println!("{status}");
                }
                None => {
                    if memo.text().is_empty() {
                        println!("(empty memo)");
                    } else {
                        println!("{}", memo.text());
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, Box<dyn Error>> {
    parse_date_key(raw)
        .ok_or_else(|| format!("invalid date {raw:?}, expected YYYY-MM-DD").into())
}

fn report_warning(warning: Option<String>) {
    if let Some(warning) = warning {
        eprintln!("warning: {warning}");
    }
}
