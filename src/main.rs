use clap::{Parser, Subcommand};
use console::style;

use karakuri::{Globals, Mode, data, deploy, site, watch};

#[derive(Parser, Debug)]
#[clap(name = "karakuri", version, about = "Asset pipeline for static websites")]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Build once, then watch sources and serve with live reload
    Dev,
    /// Build the site once and exit
    Build,
    /// Sync the build directory to the remote host
    Deploy,
    /// Run the named tasks in order
    Task {
        /// Registered task names
        #[clap(required = true)]
        names: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = site::config();

    // Site data is parsed once per process, before any task runs. A
    // malformed document aborts every command, deploy included.
    let data = data::load(&config.data_file())?;
    let pipeline = site::pipeline(&config);

    match args.command.unwrap_or(Command::Dev) {
        Command::Dev => {
            eprintln!(
                "Running {} in {} mode.",
                style("Karakuri").red(),
                style("watch").blue(),
            );
            watch::watch(&pipeline, config, data)?;
        }
        Command::Build => {
            eprintln!(
                "Running {} in {} mode.",
                style("Karakuri").red(),
                style("build").blue(),
            );
            let globals = Globals {
                mode: Mode::Build,
                port: None,
                config,
                data,
            };
            pipeline.build(&globals)?;
        }
        Command::Deploy => {
            deploy::deploy(&config)?;
        }
        Command::Task { names } => {
            let globals = Globals {
                mode: Mode::Build,
                port: None,
                config,
                data,
            };
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            pipeline.run_sequential(&names, &globals)?;
        }
    }

    Ok(())
}
