//! FTFY command-line driver.
//!
//! Records are printed to stdout as JSON lines, errors to stderr.

use std::path::Path;

use ftfy_eval::{stdout_sink, EvalMode};

fn main() {
    ftfyc::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" | "annotate" => {
            if args.len() < 4 {
                eprintln!("Usage: ftfy {command} <ast.json> <source>");
                std::process::exit(1);
            }
            let mode = EvalMode::from_command(command).unwrap_or_default();
            let result = ftfyc::run_files(
                mode,
                Path::new(&args[2]),
                Path::new(&args[3]),
                stdout_sink(),
            );
            if let Err(err) = result {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("ftfy {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("FTFY interpreter");
    println!();
    println!("Usage: ftfy <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <ast.json> <source>       Evaluate a program, printing its records");
    println!("  annotate <ast.json> <source>  Evaluate, recording a value for every line");
    println!("  help                          Show this message");
    println!("  version                       Show version information");
    println!();
    println!("<ast.json> is the parser's output for <source>.");
    println!("Set FTFY_LOG (e.g. FTFY_LOG=ftfy_eval=debug) to log to stderr.");
}
