use crate::{config::Config, error::Result};

use regex::Regex;

#[derive(Debug, Clone)]
pub struct MutationPolicyBuilder {
    allowed_classes: RegexListBuilder,
    allowed_methods: RegexListBuilder,
}

/// Decides which classes and methods are traversed.
///
/// An empty allow-list admits everything.
#[derive(Debug)]
pub struct MutationPolicy {
    allowed_classes: RegexList,
    allowed_methods: RegexList,
}

impl MutationPolicyBuilder {
    pub fn new() -> Self {
        Self {
            allowed_classes: RegexListBuilder::new(),
            allowed_methods: RegexListBuilder::new(),
        }
    }

    pub fn allow_class<T: AsRef<str>>(self, name: T) -> Self {
        Self {
            allowed_classes: self.allowed_classes.push(name),
            ..self
        }
    }

    pub fn allow_method<T: AsRef<str>>(self, name: T) -> Self {
        Self {
            allowed_methods: self.allowed_methods.push(name),
            ..self
        }
    }

    pub fn build(self) -> Result<MutationPolicy> {
        Ok(MutationPolicy {
            allowed_classes: self.allowed_classes.build()?,
            allowed_methods: self.allowed_methods.build()?,
        })
    }
}

impl Default for MutationPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationPolicy {
    pub fn allow_all() -> Self {
        Self {
            allowed_classes: RegexList::default(),
            allowed_methods: RegexList::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = MutationPolicyBuilder::new();

        if let Some(allowed_classes) = &config.filter.allowed_classes {
            for class in allowed_classes {
                builder = builder.allow_class(class);
            }
        }

        if let Some(allowed_methods) = &config.filter.allowed_methods {
            for method in allowed_methods {
                builder = builder.allow_method(method);
            }
        }

        builder.build()
    }

    pub fn check_class<T: AsRef<str>>(&self, name: T) -> bool {
        self.allowed_classes.admits(name)
    }

    pub fn check_method<T: AsRef<str>>(&self, name: T) -> bool {
        self.allowed_methods.admits(name)
    }
}

#[derive(Debug, Clone)]
struct RegexListBuilder {
    regexes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct RegexList {
    regexes: Vec<Regex>,
}

impl RegexListBuilder {
    fn new() -> Self {
        Self {
            regexes: Vec::new(),
        }
    }

    fn push<T: AsRef<str>>(mut self, pattern: T) -> Self {
        self.regexes.push(String::from(pattern.as_ref()));
        self
    }

    fn build(self) -> Result<RegexList> {
        let mut allowlist = Vec::new();

        for allowed in self.regexes {
            let regex = Regex::new(&allowed)?;
            allowlist.push(regex);
        }

        Ok(RegexList { regexes: allowlist })
    }
}

impl RegexList {
    fn any<T: AsRef<str>>(&self, name: T) -> bool {
        self.regexes
            .iter()
            .any(|regex| regex.is_match(name.as_ref()))
    }

    fn admits<T: AsRef<str>>(&self, name: T) -> bool {
        self.regexes.is_empty() || self.any(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::error::Error;

    #[test]
    fn build_regexlist_trivial() -> Result<()> {
        let regex_list = RegexListBuilder::new().push("test").build()?;

        assert!(regex_list.any("test"));
        assert!(regex_list.any("invatestlid"));
        assert!(!regex_list.any("invalid"));

        Ok(())
    }

    #[test]
    fn build_regexlist_multiple_regex() -> Result<()> {
        let list = RegexListBuilder::new()
            .push("^test_")
            .push("another")
            .build()?;

        assert!(list.any("test_func1"));
        assert!(list.any("test_func2"));
        assert!(list.any("another"));

        Ok(())
    }

    #[test]
    fn empty_list_admits_everything() {
        let policy = MutationPolicy::allow_all();
        assert!(policy.check_class("com/example/Calculator"));
        assert!(policy.check_method("<init>"));
    }

    #[test]
    fn build_mutation_policy() -> Result<()> {
        let policy = MutationPolicyBuilder::new()
            .allow_method("^test_")
            .allow_class("^com/example/")
            .build()?;

        assert!(policy.check_method("test_func1"));
        assert!(!policy.check_method("compute"));
        assert!(policy.check_class("com/example/Calculator"));
        assert!(!policy.check_class("org/other/Calculator"));

        Ok(())
    }

    #[test]
    fn invalid_regex() {
        let err = MutationPolicyBuilder::new().allow_class("(").build().unwrap_err();
        assert!(matches!(err, Error::Regex { .. }));
    }

    #[test]
    fn policy_from_config() -> Result<()> {
        let config = Config {
            filter: FilterConfig {
                allowed_methods: Some(vec!["^total$".into()]),
                allowed_classes: None,
            },
            ..Default::default()
        };

        let policy = MutationPolicy::from_config(&config)?;

        assert!(policy.check_method("total"));
        assert!(!policy.check_method("totals"));
        assert!(policy.check_class("anything"));

        Ok(())
    }
}
