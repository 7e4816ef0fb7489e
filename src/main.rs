use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use tab_switcher_lib::modules::memory::{MemoryBrowser, SessionSnapshot};
use tab_switcher_lib::modules::sources::SuggestionSource;
use tab_switcher_lib::state::{SwitcherView, TabChange};
use tab_switcher_lib::{init_logging, Result, Settings, TabSwitcher};

/// Keyboard tab switcher over a saved browser session.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Session snapshot (windows, tabs, bookmarks, suggestions) as JSON.
    #[arg(long)]
    session: PathBuf,

    /// Settings file; defaults apply when missing.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Enable search suggestions regardless of the settings file.
    #[arg(long)]
    suggestions: bool,

    /// Write the effective settings back to --settings.
    #[arg(long, requires = "settings")]
    write_settings: bool,
}

enum Input {
    Line(Option<String>),
    Pumped(bool),
}

const HELP: &str = "commands: kw [text] | n | p | go | close | rm <id> | title <id> <text> | json | q";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut settings = cli
        .settings
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();
    if cli.suggestions {
        settings.suggestions_enabled = true;
    }
    if let (true, Some(path)) = (cli.write_settings, cli.settings.as_deref()) {
        settings.save(path)?;
    }

    let session = SessionSnapshot::load(&cli.session)?;
    info!(
        "[Main] Loaded {} windows from {}",
        session.windows.len(),
        cli.session.display()
    );
    let browser = Arc::new(MemoryBrowser::new(session));
    let mut switcher = TabSwitcher::new(
        browser.clone(),
        Some(browser.clone() as Arc<dyn SuggestionSource>),
        browser.clone(),
        settings,
    );

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            handled = switcher.pump() => Input::Pumped(handled.is_some()),
        };
        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) => {
                if !run_command(&mut switcher, &browser, line.trim()).await? {
                    break;
                }
            }
            Input::Pumped(false) => break,
            Input::Pumped(true) => {}
        }
        print_view(&switcher.view());
    }
    Ok(())
}

/// Returns false when the user asked to quit.
async fn run_command(switcher: &mut TabSwitcher, browser: &MemoryBrowser, line: &str) -> Result<bool> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "q" | "quit" => return Ok(false),
        "kw" => switcher.set_keyword(rest),
        "n" | "next" => {
            switcher.next();
        }
        "p" | "prev" => {
            switcher.previous();
        }
        "go" => match switcher.activate_selected().await {
            Ok(activation) => println!("-> {:?}", activation),
            Err(e) => warn!("[Main] Activation failed: {}", e),
        },
        "close" => {
            let closed = switcher.close_selected().await?;
            debug!("[Main] Closed {:?}", closed);
        }
        "rm" => match rest.trim().parse() {
            Ok(id) => switcher.close_tab(id).await?,
            Err(_) => println!("{}", HELP),
        },
        "title" => {
            let (id, title) = rest.split_once(' ').unwrap_or((rest, ""));
            match id.parse() {
                Ok(id) => {
                    let change = TabChange {
                        title: Some(title.to_string()),
                        ..TabChange::default()
                    };
                    if let Err(e) = browser.update_tab(id, change) {
                        warn!("[Main] {}", e);
                    }
                }
                Err(_) => println!("{}", HELP),
            }
        }
        "json" => println!("{}", serde_json::to_string_pretty(&switcher.view())?),
        "" => {}
        _ => println!("{}", HELP),
    }
    Ok(true)
}

fn print_view(view: &SwitcherView) {
    println!("--- {:?} (v{})", view.keyword, view.version);
    for section in &view.sections {
        println!("[{:?}]", section.kind);
        for row in &section.rows {
            let marker = if row.selected { '>' } else { ' ' };
            println!(
                "{} {}{} {}",
                marker,
                "  ".repeat(row.depth),
                row.title,
                row.url
            );
        }
    }
}
