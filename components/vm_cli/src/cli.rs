//! Command-line argument definitions.

use clap::Parser;

/// Command-line arguments for the VM.
#[derive(Parser, Debug)]
#[command(
    name = "ferric-vm",
    version,
    about = "Ferric managed-runtime virtual machine"
)]
pub struct Cli {
    /// Fully-qualified zero-argument static method to invoke,
    /// e.g. `demo.Main.run`
    pub entry: Option<String>,

    /// Classpath directory holding JSON class descriptors (repeatable)
    #[arg(long = "classpath", short = 'c', default_value = ".")]
    pub classpath: Vec<String>,

    /// Heap capacity, in objects
    #[arg(long)]
    pub heap_capacity: Option<usize>,

    /// Disassemble the entry class's methods before running
    #[arg(long)]
    pub print_bytecode: bool,

    /// Print collection statistics after the entry method returns
    #[arg(long)]
    pub print_gc_stats: bool,
}
