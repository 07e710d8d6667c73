pub mod tx;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ledger-chaincode")]
#[command(about = "Points ledger chaincode with a local state store", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "ledger.toml")]
    pub config: String,

    /// Print responses as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Seed two accounts with the initial balance
    Init {
        account_a: String,
        account_b: String,
    },
    /// Run a mutating function (transfer, init)
    Invoke {
        function: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run a read-only function (read)
    Query {
        function: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run a file of transactions, one per line: `init <a> <b>` or `<invoke|query> <function> [args...]`
    Run {
        script: String,
        /// Keep going after a failed transaction
        #[arg(long)]
        keep_going: bool,
    },
}
