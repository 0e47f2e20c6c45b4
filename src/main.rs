// rpcstub: Annotated C declaration extractor with an IR inspector

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use rpcstub::config::Configuration;
use rpcstub::parser::Parser;
use rpcstub::ui::{App, UnitEntry};

/// Markers recognized when no configuration file is given
const DEFAULT_MARKERS: [&str; 2] = ["rpc", "SERIALIZE"];

struct Options {
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    print: bool,
}

fn usage(program_name: &str) -> ! {
    eprintln!("Usage: {} <file.c>... [--config <file.toml>] [--print]", program_name);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file.toml>   Annotation markers, include paths and policies");
    eprintln!("  --print                Print a summary instead of opening the inspector");
    eprintln!();
    eprintln!("Without --config the markers are: {}", DEFAULT_MARKERS.join(", "));
    process::exit(1);
}

fn parse_args(args: &[String]) -> Options {
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("rpcstub");
    let mut options = Options {
        files: Vec::new(),
        config: None,
        print: false,
    };

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--print" => options.print = true,
            "--config" => match rest.next() {
                Some(path) => options.config = Some(PathBuf::from(path)),
                None => {
                    eprintln!("Error: --config needs a file");
                    usage(program_name);
                }
            },
            "-h" | "--help" => usage(program_name),
            flag if flag.starts_with("--") => {
                eprintln!("Error: unknown option '{}'", flag);
                usage(program_name);
            }
            file => options.files.push(PathBuf::from(file)),
        }
    }

    if options.files.is_empty() {
        eprintln!("Error: No input file provided");
        eprintln!();
        usage(program_name);
    }
    options
}

fn load_configuration(path: Option<&Path>) -> Result<Configuration, rpcstub::Error> {
    match path {
        Some(path) => Ok(Configuration::load(path)?),
        None => Ok(Configuration::new(DEFAULT_MARKERS)),
    }
}

fn print_summary(parser: &Parser) {
    for entry in UnitEntry::collect(parser) {
        let annotations = if entry.annotations.is_empty() {
            String::new()
        } else {
            format!("  {}", entry.annotations.join(" "))
        };
        println!("{:<12} {:<32} {}{}", entry.kind, entry.name, entry.location, annotations);
    }

    let errors = parser.errors();
    if !errors.is_empty() {
        println!();
        println!("{} error(s):", errors.len());
        for err in errors {
            println!("  {}", err);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args);

    let config = match load_configuration(options.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let mut parser = match Parser::new(config) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    for file in &options.files {
        match parser.parse(file) {
            Ok(report) => {
                if !options.print {
                    eprintln!(
                        "Parsed {}: {} declarations, {} errors",
                        file.display(),
                        report.declaration_count(),
                        report.errors.len()
                    );
                }
            }
            Err(e) => {
                eprintln!("Parse error: {}", e);
                process::exit(1);
            }
        }
    }

    if options.print {
        print_summary(&parser);
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&parser);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
