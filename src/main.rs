//! Dyre CLI - compiles Dyre query text into SQL against a catalog.
//!
//! Run with `<catalog.json> <endpoint> <query-text> [--order-by <text>]
//! [--limit <n>]` to compile a single query and print its SQL (or a
//! diagnostic, on stderr). Run with no arguments for an interactive REPL
//! that loads the catalog once and repeatedly reads `endpoint | query`
//! lines.

use std::io::{self, BufRead, Write};

use dyre::catalog::{self, Service};
use dyre::compile::compile;
use dyre::error::Error;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        if args.len() < 4 {
            eprintln!("usage: dyre-compile <catalog.json> <endpoint> <query-text> [--order-by <text>] [--limit <n>]");
            std::process::exit(2);
        }
        let mut order_by_src = None;
        let mut limit_n = None;
        let mut rest = &args[4..];
        while let Some(flag) = rest.first() {
            match flag.as_str() {
                "--order-by" => {
                    let Some(value) = rest.get(1) else {
                        eprintln!("--order-by requires a value");
                        std::process::exit(2);
                    };
                    order_by_src = Some(value.as_str());
                    rest = &rest[2..];
                }
                "--limit" => {
                    let Some(value) = rest.get(1) else {
                        eprintln!("--limit requires a value");
                        std::process::exit(2);
                    };
                    let Ok(n) = value.parse::<i64>() else {
                        eprintln!("--limit value must be an integer, got '{value}'");
                        std::process::exit(2);
                    };
                    limit_n = Some(n);
                    rest = &rest[2..];
                }
                other => {
                    eprintln!("unrecognized flag '{other}'");
                    std::process::exit(2);
                }
            }
        }
        run_one(&args[1], &args[2], &args[3], order_by_src, limit_n);
    } else {
        run_repl();
    }
}

fn load_catalog(path: &str) -> Option<Service> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error reading catalog '{path}': {e}");
            return None;
        }
    };
    match catalog::load(&text) {
        Ok(service) => Some(service),
        Err(e) => {
            eprintln!("error loading catalog: {e}");
            None
        }
    }
}

fn run_one(catalog_path: &str, endpoint: &str, query_src: &str, order_by_src: Option<&str>, limit_n: Option<i64>) {
    let Some(service) = load_catalog(catalog_path) else {
        std::process::exit(1);
    };

    match compile(&service, endpoint, query_src, None) {
        Ok(mut compiled) => {
            if let Some(order_by_src) = order_by_src {
                if let Err(e) = dyre::compile::order_by(&service, endpoint, &mut compiled, order_by_src) {
                    print_error(order_by_src, &e);
                    std::process::exit(1);
                }
            }
            if let Some(n) = limit_n {
                dyre::compile::limit(&mut compiled, n);
            }
            println!("{}", compiled.sql);
        }
        Err(e) => {
            print_error(query_src, &e);
            std::process::exit(1);
        }
    }
}

fn run_repl() {
    println!("Dyre compiler v{}", env!("CARGO_PKG_VERSION"));
    print!("catalog path: ");
    io::stdout().flush().unwrap();

    let stdin = io::stdin();
    let mut path = String::new();
    if stdin.lock().read_line(&mut path).unwrap_or(0) == 0 {
        return;
    }
    let Some(service) = load_catalog(path.trim()) else {
        return;
    };

    println!("Enter 'endpoint | query' lines (Ctrl+D to exit):\n");
    let mut stdout = io::stdout();

    loop {
        print!("dyre> ");
        stdout.flush().unwrap();

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {
                let line = input.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }
                let Some((endpoint, query_src)) = line.split_once('|') else {
                    eprintln!("expected 'endpoint | query'");
                    continue;
                };
                match compile(&service, endpoint.trim(), query_src.trim(), None) {
                    Ok(compiled) => println!("{}", compiled.sql),
                    Err(e) => print_error(query_src.trim(), &e),
                }
                println!();
            }
            Err(e) => {
                eprintln!("error reading input: {e}");
                break;
            }
        }
    }
}

fn print_error(src: &str, error: &Error) {
    eprintln!("Error: {error}");
    if let Some(span) = error.span() {
        let line_start = src[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = src[span.start..]
            .find('\n')
            .map(|i| span.start + i)
            .unwrap_or(src.len());
        let line = &src[line_start..line_end];
        let col = span.start - line_start;

        eprintln!("  |");
        eprintln!("  | {line}");
        eprintln!("  | {}^", " ".repeat(col));
    }
}
