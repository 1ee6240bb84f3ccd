use std::ffi::OsString;

use clap::{ArgEnum, Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct CLIArguments {
    #[clap(subcommand)]
    pub command: CLICommand,
}

#[derive(Subcommand)]
pub enum CLICommand {
    /// List all available mutation operators.
    ///
    /// If a config is provided, this command will also
    /// show whether the operator is enabled or not.
    /// By default, jvmut will try to load a jvmut.toml file from the current directory
    ListOperators {
        /// Load jvmut.toml configuration file from the provided path
        #[clap(short, long)]
        config: Option<String>,
    },

    /// Build the signature catalog used by call substitution.
    ///
    /// Every run starts a new generation that fully replaces the
    /// catalog stored at the output path.
    BuildCatalog {
        /// Load jvmut.toml configuration file from the provided path
        #[clap(short, long)]
        config: Option<String>,

        /// Catalog file to write, defaults to the path in the configuration
        #[clap(short, long)]
        output: Option<String>,

        /// Class unit files (JSON) to scan
        #[clap(required = true)]
        units: Vec<String>,
    },

    /// Discover and list all mutation sites.
    ListMutants {
        /// Load jvmut.toml configuration file from the provided path
        #[clap(short, long)]
        config: Option<String>,

        /// Report output format
        #[clap(short, long, arg_enum, default_value_t=Output::Console)]
        report: Output,

        /// Class unit files (JSON) to traverse
        #[clap(required = true)]
        units: Vec<String>,
    },

    /// Produce a single mutant.
    ///
    /// The mutant is selected by its position in the list printed by
    /// `list-mutants` and written as a class unit file.
    Mutate {
        /// Load jvmut.toml configuration file from the provided path
        #[clap(short, long)]
        config: Option<String>,

        /// Index of the mutation site
        #[clap(short = 'n', long)]
        index: usize,

        /// Output path for the mutated class unit, defaults to stdout
        #[clap(short, long)]
        output: Option<String>,

        /// Class unit file (JSON) to mutate
        unit: String,
    },

    /// Create new configuration file.
    NewConfig {
        /// Path to the new configuration file
        path: Option<String>,
    },
}

#[derive(ArgEnum, Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Console,
    Json,
}

impl CLIArguments {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn parse_args_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::parse_from(itr)
    }
}
