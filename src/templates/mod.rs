/// Configuration written by `jvmut new-config`.
pub const DEFAULT_CONFIG: &str = include_str!("jvmut.toml");
