use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::info;

mod error;

use error::{convert_io_error, convert_ir_error, CliError};
use tangle_net::{compile, dump, parse_net, CompiledRules, Engine, Memory};

#[derive(Parser, Debug)]
#[command(name = "tangle")]
#[command(about = "Interaction net rewriting machine", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Reduce a net to quiescence
    Run {
        /// Rule DSL file
        #[arg(short, long, value_name = "FILE")]
        rules: PathBuf,
        /// Net file to reduce
        #[arg(value_name = "NET")]
        net: PathBuf,
        /// Maximum number of generations
        #[arg(short = 'n', long, value_name = "STEPS")]
        max_steps: Option<usize>,
    },

    /// Load a net and print it without reducing
    Show {
        /// Rule DSL file
        #[arg(short, long, value_name = "FILE")]
        rules: PathBuf,
        /// Net file to display
        #[arg(value_name = "NET")]
        net: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Command::Run {
            rules,
            net,
            max_steps,
        } => {
            let (compiled, mem) = load(&rules, &net)?;
            let mut engine = Engine::new(mem, &compiled);
            engine.scan_all();
            let generations = engine.run(max_steps);
            info!(
                "{} generations, {} rewrites",
                generations,
                engine.rewrites()
            );
            println!("{}", dump(engine.memory(), compiled.registry()));
            println!(
                "quiescent: {} | generations: {} | rewrites: {}",
                engine.is_quiescent(),
                generations,
                engine.rewrites()
            );
            Ok(())
        }
        Command::Show { rules, net } => {
            let (compiled, mem) = load(&rules, &net)?;
            println!("{}", dump(&mem, compiled.registry()));
            Ok(())
        }
    }
}

/// Compiles the rule file and loads the net file against its registry.
fn load(rules: &PathBuf, net: &PathBuf) -> miette::Result<(CompiledRules, Memory)> {
    let dsl = fs::read_to_string(rules).map_err(|e| convert_io_error(e, rules.clone()))?;
    let statements = tangle_ir::parse(&dsl).map_err(|e| convert_ir_error(e, &dsl))?;
    let compiled = compile(&statements).map_err(CliError::from)?;

    let net_src = fs::read_to_string(net).map_err(|e| convert_io_error(e, net.clone()))?;
    let mem = parse_net(&net_src, compiled.registry()).map_err(CliError::from)?;
    info!(
        "loaded {} kinds, {} memory words",
        compiled.registry().len(),
        mem.len_words()
    );
    Ok((compiled, mem))
}
