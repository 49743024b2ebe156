//! Ferric VM CLI.
//!
//! Entry point for the VM. Parses CLI arguments and delegates to the
//! Runtime for execution.

use clap::Parser as ClapParser;
use vm_cli::{Cli, CliError, Runtime};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(entry) = cli.entry else {
        // Default: show usage
        println!("Ferric VM v0.1.0");
        println!();
        println!("Usage:");
        println!("  ferric-vm <CLASS.METHOD>               Invoke a static method");
        println!("  ferric-vm -c <DIR> <CLASS.METHOD>      With a classpath directory");
        println!();
        println!("Run 'ferric-vm --help' for more options.");
        return;
    };

    let classpath = cli.classpath.iter().map(Into::into).collect();
    let mut runtime =
        Runtime::new(classpath, cli.heap_capacity).with_print_bytecode(cli.print_bytecode);

    match runtime.run_entry(&entry) {
        Ok(result) => {
            println!("{}", result);
        }
        Err(CliError::Vm(e)) => {
            eprintln!("VM error: {}", e);
            std::process::exit(1);
        }
        Err(CliError::Io(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(CliError::BadEntryPoint(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }

    if cli.print_gc_stats {
        let stats = runtime.gc_stats();
        println!(
            "gc: {} collections, {} live objects of {} capacity",
            stats.collections, stats.live, stats.capacity
        );
    }
}
