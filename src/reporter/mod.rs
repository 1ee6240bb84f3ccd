pub mod cli;
pub mod json;
mod rewriter;

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use anyhow::Result;
use serde::Serialize;

use crate::config::ReportConfig;
use crate::context::MutationSite;

use self::rewriter::PathRewriter;

/// Pseudo file name for sites of classes without source information.
pub const UNKNOWN_FILE: &str = "<unknown>";

type LineNumberSiteMap<'a> = BTreeMap<u32, Vec<&'a MutationSite>>;
type FileSiteMap<'a> = BTreeMap<String, LineNumberSiteMap<'a>>;

fn path_rewriter(config: &ReportConfig) -> Result<Option<PathRewriter>> {
    config
        .path_rewrite()
        .map(|(regex, replacement)| PathRewriter::new(regex, replacement))
        .transpose()
}

fn site_file(site: &MutationSite, path_rewriter: Option<&PathRewriter>) -> Option<String> {
    site.location.file.as_deref().map(|file| match path_rewriter {
        Some(path_rewriter) => path_rewriter.rewrite(file),
        None => file.into(),
    })
}

/// Group sites by source file and line; sites without a line come first.
fn map_sites_to_files<'a>(
    sites: &'a [MutationSite],
    path_rewriter: Option<&PathRewriter>,
) -> FileSiteMap<'a> {
    let mut file_mapping = BTreeMap::new();
    for site in sites {
        let file = site_file(site, path_rewriter).unwrap_or_else(|| UNKNOWN_FILE.into());

        file_mapping
            .entry(file)
            .or_insert_with(BTreeMap::new)
            .entry(site.location.line.unwrap_or(0))
            .or_insert_with(Vec::new)
            .push(site);
    }
    file_mapping
}

fn read_lines<P>(filename: P) -> Result<Lines<BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(BufReader::new(file).lines())
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SiteSummary {
    pub total: usize,
    pub methods: usize,
    pub per_category: BTreeMap<String, usize>,
    pub per_operator: BTreeMap<String, usize>,
}

pub fn summarize(sites: &[MutationSite]) -> SiteSummary {
    let mut per_category = BTreeMap::new();
    let mut per_operator = BTreeMap::new();
    let mut methods = std::collections::BTreeSet::new();

    for site in sites {
        *per_category
            .entry(site.category.tag().to_owned())
            .or_insert(0) += 1;
        *per_operator.entry(site.id.operator.clone()).or_insert(0) += 1;
        methods.insert(&site.id.method);
    }

    SiteSummary {
        total: sites.len(),
        methods: methods.len(),
        per_category,
        per_operator,
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_by_file_and_line() {
        let sites = calculator_sites("\"aor_isub\", \"crcr_add_one\"");
        let config = report_config();
        let rewriter = path_rewriter(&config.report).unwrap();
        let files = map_sites_to_files(&sites, rewriter.as_ref());

        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec!["testdata/calculator/src/com/example/Calculator.java"]
        );
        let lines = &files["testdata/calculator/src/com/example/Calculator.java"];
        assert_eq!(lines.keys().copied().collect::<Vec<_>>(), vec![6, 10, 14, 18, 25, 29, 33]);
        assert_eq!(lines[&14].len(), 2);
        assert_eq!(lines[&29].len(), 2);
    }

    #[test]
    fn sites_without_file() {
        let mut sites = calculator_sites("\"aor_isub\"");
        for site in &mut sites {
            site.location.file = None;
        }
        let files = map_sites_to_files(&sites, None);
        assert_eq!(files.keys().collect::<Vec<_>>(), vec![UNKNOWN_FILE]);
    }

    #[test]
    fn summary() {
        let sites = calculator_sites("\"aor_isub\", \"aod\", \"ror_ifeq\"");
        let summary = summarize(&sites);

        // 5 int additions/multiplications, 7 arithmetic instructions, 2 branches
        assert_eq!(summary.total, 5 + 14 + 2);
        assert_eq!(summary.methods, 7);
        assert_eq!(summary.per_category["SUBST"], 7);
        assert_eq!(summary.per_category["OPERAND"], 14);
        assert_eq!(summary.per_operator["aod_first"], 7);
    }
}
