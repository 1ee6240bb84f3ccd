pub mod bytecode;
pub mod catalog;
pub mod classunit;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod mutation;
pub mod operator;
pub mod output;
pub mod policy;
pub mod reporter;
pub mod stack;
pub mod templates;

/// File names used when no path is given on the command line.
pub mod defaults {
    pub const CONFIG_FILE: &str = "jvmut.toml";
    pub const CATALOG_FILE: &str = "jvmut-catalog.json";
}
