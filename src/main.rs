use std::env;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser, Subcommand};
use console::style;

use mdtree::{batch, config, logging};
use mdtree_parser::Converter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Parser configuration file. Defaults to mdtree.yml in the working directory if present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides it.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert markdown files, or stdin when no path is given, to serialized node trees.
    Parse {
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        pretty: bool,
        /// Write outputs under this directory instead of next to the inputs.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = env::current_dir()?;
    let config = config::resolve(cli.config.as_deref(), &cwd)
        .context("Error loading parser configuration:")?;
    let converter = Converter::new(config).context("Invalid parser configuration:")?;

    match cli.command {
        Commands::Parse {
            paths,
            pretty,
            out_dir,
        } => {
            if paths.is_empty() {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                println!("{}", mdtree::render(&converter, &text, pretty)?);
                return Ok(());
            }

            let jobs = batch::collect_jobs(&paths, out_dir.as_deref())?;
            let (converted, errs) = batch::convert_all(&converter, &jobs, pretty);

            for err in &errs {
                eprintln!("{} {:?}", style("error:").red().bold(), err);
            }
            if !errs.is_empty() {
                return Err(anyhow!("{} of {} documents failed", errs.len(), jobs.len()));
            }

            println!("🌟 Converted {converted} documents.");
            Ok(())
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(converter.config())?);
            Ok(())
        }
    }
}
