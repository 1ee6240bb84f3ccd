use std::path::Path;

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct EngineConfig {
    /// Worker threads used during discovery, defaults to the number of CPUs.
    pub threads: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OperatorConfig {
    /// Operator and group names, see `jvmut list-operators`.
    #[serde(default = "default_operators")]
    pub enabled: Vec<String>,
}

fn default_operators() -> Vec<String> {
    vec!["all".into()]
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_operators(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilterConfig {
    pub allowed_classes: Option<Vec<String>>,
    pub allowed_methods: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportConfig {
    path_rewrite: Option<(String, String)>,
}

impl ReportConfig {
    /// Regex and replacement applied to source file paths in reports.
    pub fn path_rewrite(&self) -> Option<(String, String)> {
        self.path_rewrite.clone()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub operators: OperatorConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    pub fn parse_str(s: &str) -> Result<Self> {
        Self::parse(s, Path::new("."))
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFoundError(path.display().to_string()));
        }

        let s = std::fs::read_to_string(path)?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));

        Self::parse(&s, parent)
    }

    fn parse(s: &str, location: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;

        // The catalog path is relative to the directory of the
        // configuration file, not to the working directory.
        if let Some(catalog_path) = &config.catalog.path {
            let catalog_path = Path::new(catalog_path);
            if catalog_path.is_relative() {
                config.catalog.path = Some(location.join(catalog_path).display().to_string());
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn filters() -> Result<()> {
        let filter: FilterConfig = toml::from_str(
            r#"
        allowed_classes = ["^com/example/", "^org/"]
        allowed_methods = ["compute", "total"]
    "#,
        )?;

        assert_eq!(
            filter.allowed_classes,
            Some(vec![String::from("^com/example/"), String::from("^org/")])
        );
        assert_eq!(
            filter.allowed_methods,
            Some(vec![String::from("compute"), String::from("total")])
        );
        Ok(())
    }

    #[test]
    fn empty_config() -> Result<()> {
        let config = Config::parse_str("")?;
        assert_eq!(config.operators.enabled, vec!["all".to_owned()]);
        assert_eq!(config.engine.threads, None);
        assert!(config.catalog.path.is_none());
        assert!(config.report.path_rewrite().is_none());
        Ok(())
    }

    #[test]
    fn invalid_config() {
        let err = Config::parse_str("[engine]\nthreads = \"many\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn engine_config() -> Result<()> {
        let engine: EngineConfig = toml::from_str("threads = 4")?;
        assert_eq!(engine.threads, Some(4));
        Ok(())
    }

    #[test]
    fn operator_config() -> Result<()> {
        let config = Config::parse_str(
            r#"
            [operators]
            enabled = ["aor", "call_replace_name"]
        "#,
        )?;
        assert_eq!(config.operators.enabled, vec!["aor", "call_replace_name"]);
        Ok(())
    }

    #[test]
    fn report_config() -> Result<()> {
        let config = Config::parse_str(
            r#"
            [report]
            path_rewrite = ["^com/", "src/main/java/com/"]
        "#,
        )?;
        assert_eq!(
            config.report.path_rewrite(),
            Some(("^com/".into(), "src/main/java/com/".into()))
        );
        Ok(())
    }

    #[test]
    fn parse_file_catalog_path_fix() -> Result<()> {
        let config = Config::parse_file("testdata/calculator/jvmut.toml")?;
        assert_eq!(
            config.catalog.path.as_deref(),
            Some("testdata/calculator/catalog.json")
        );
        Ok(())
    }

    #[test]
    fn parse_str_catalog_path_fix() -> Result<()> {
        let s = std::fs::read_to_string("testdata/calculator/jvmut.toml")?;
        let config = Config::parse_str(&s)?;
        assert_eq!(config.catalog.path.as_deref(), Some("./catalog.json"));
        Ok(())
    }

    #[test]
    fn missing_file() {
        let err = Config::parse_file("testdata/does_not_exist.toml").unwrap_err();
        assert!(matches!(err, Error::FileNotFoundError(_)));
    }
}
