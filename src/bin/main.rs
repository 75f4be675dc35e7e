use crossterm::style::Stylize;
use dict_core::persistence::save_to_disk;
use dict_core::{DictEntry, EngineConfig, TrieEngine};
use std::io::{stdin, stdout, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_SNAPSHOT_PATH: &str = "dictionary.bin";

fn main() -> ExitCode {
    let config = match parse_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("usage: dict_engine [--config FILE] [--snapshot FILE] [DICTIONARY]");
            return ExitCode::from(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = match config.open_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("Segmentation dictionary. Type 'help' for commands, 'exit' to quit.");
    println!("---------------------------------------------------------------");
    print_stats(&engine);

    let snapshot_path = config
        .snapshot_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));

    let mut out = stdout();
    prompt(&mut out);
    for line in stdin().lock().lines() {
        let input = match line {
            Ok(input) => input,
            Err(e) => {
                eprintln!("{} {}", "[ERROR]".red().bold(), e);
                return ExitCode::FAILURE;
            }
        };
        let (cmd, arg) = match input.trim().split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (input.trim(), ""),
        };

        match cmd {
            "" => {}
            "exit" | "quit" => break,
            "help" => print_help(),
            "stats" => print_stats(&engine),
            "find" => match engine.find_str(arg) {
                Some(entry) => print_entry(entry),
                None => println!("{}", "no match".dark_grey()),
            },
            "prefix" => match engine.find_prefix_str(arg) {
                Some(entry) => print_entry(entry),
                None => println!("{}", "no match".dark_grey()),
            },
            "all" => {
                let matches = engine.find_all_prefixes_str(arg);
                if matches.is_empty() {
                    println!("{}", "no matches".dark_grey());
                }
                for (end, entry) in matches {
                    print!("  [{}] ", end);
                    print_entry(entry);
                }
            }
            "weight" => println!("{:.6}", engine.get_weight_str(arg)),
            "save" => {
                let path = if arg.is_empty() {
                    snapshot_path.clone()
                } else {
                    PathBuf::from(arg)
                };
                match save_to_disk(&engine, &path) {
                    Ok(()) => println!("Snapshot saved to '{}'", path.display()),
                    Err(e) => eprintln!("{} {}", "[ERROR]".red().bold(), e),
                }
            }
            other => println!("unknown command '{}', try 'help'", other),
        }
        prompt(&mut out);
    }

    ExitCode::SUCCESS
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<EngineConfig, String> {
    let mut config_path = None;
    let mut snapshot = None;
    let mut dictionary = None;
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().ok_or("--config needs a file")?),
            "--snapshot" => snapshot = Some(args.next().ok_or("--snapshot needs a file")?),
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => dictionary = Some(arg),
        }
    }

    let mut config = match config_path {
        Some(path) => EngineConfig::from_path(&path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    if let Some(path) = dictionary {
        config.dictionary_path = Some(PathBuf::from(path));
    }
    if let Some(path) = snapshot {
        config.snapshot_path = Some(PathBuf::from(path));
    }
    if config.dictionary_path.is_none() && config.snapshot_path.is_none() {
        return Err("no dictionary given".to_string());
    }
    Ok(config)
}

fn print_entry(entry: &DictEntry) {
    println!(
        "{} count={} tag={} weight={:.6}",
        entry.word_string().bold().green(),
        entry.raw_count,
        entry.tag.as_deref().unwrap_or("-"),
        entry.weight
    );
}

fn print_stats(engine: &TrieEngine) {
    println!(
        "entries: {}  nodes: {}  total count: {}  min weight: {:.6}",
        engine.len(),
        engine.node_count(),
        engine.get_total_count(),
        engine.get_min_weight()
    );
}

fn print_help() {
    println!("  find WORD     exact match");
    println!("  prefix TEXT   longest dictionary word starting TEXT");
    println!("  all TEXT      every dictionary word starting TEXT");
    println!("  weight WORD   log-probability weight (minimum if unknown)");
    println!("  stats         dictionary totals");
    println!("  save [FILE]   write a compiled snapshot");
    println!("  exit          quit");
}

fn prompt(out: &mut impl Write) {
    print!("\n> ");
    let _ = out.flush();
}
