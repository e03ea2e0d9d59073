use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sqlscope::model::find_chunk_at;
use rust_sqlscope::parser::{parse_script_file, read_script, tokenize};
use rust_sqlscope::{analyze_scripts, AnalyzeOptions, ParseOptions};

#[derive(Parser)]
#[command(name = "rust-sqlscope")]
#[command(author, version, about = "Partial-tolerant T-SQL tokenizer and scope analyzer")]
struct Cli {
    /// Enable verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a script
    Tokens {
        /// Path to the .sql file
        file: PathBuf,

        /// Print JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parse scripts into statement chunks
    Chunks {
        /// .sql files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show the statement and clause containing a cursor position
    Context {
        /// Path to the .sql file
        file: PathBuf,

        /// 1-based line
        #[arg(short, long)]
        line: usize,

        /// 1-based column
        #[arg(short, long)]
        col: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Tokens { file, json } => {
            let text = read_script(&file)?;
            let tokens = tokenize(&text);
            if json {
                print_json(&tokens)?;
            } else {
                for token in &tokens {
                    println!(
                        "{}:{}\t{:?}\t{}",
                        token.line, token.col, token.token_type, token.text
                    );
                }
            }
        }
        Commands::Chunks {
            paths,
            recursive,
            json,
        } => {
            let options = AnalyzeOptions {
                paths,
                recursive,
                options: ParseOptions::default(),
                verbose: cli.verbose,
            };
            let analyses = analyze_scripts(&options)?;
            if json {
                print_json(&analyses)?;
            } else {
                for analysis in &analyses {
                    println!("{}", analysis.path.display());
                    for chunk in &analysis.chunks {
                        let tables: Vec<&str> =
                            chunk.tables.iter().map(|t| t.visible_name()).collect();
                        println!(
                            "  {}:{}-{}:{}\tbatch {}\t{}\t[{}]",
                            chunk.start_line,
                            chunk.start_col,
                            chunk.end_line,
                            chunk.end_col,
                            chunk.go_batch_index,
                            chunk.statement_type.as_str(),
                            tables.join(", ")
                        );
                    }
                }
            }
        }
        Commands::Context { file, line, col } => {
            let analysis = parse_script_file(&file, &ParseOptions::default())?;
            match find_chunk_at(&analysis.chunks, line, col) {
                Some(chunk) => {
                    println!(
                        "{} at {}:{}",
                        chunk.statement_type.as_str(),
                        chunk.start_line,
                        chunk.start_col
                    );
                    println!("clause: {}", chunk.clause_at(line, col).unwrap_or("-"));
                    print_json(chunk)?;
                }
                None => println!("No statement at {}:{}", line, col),
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
