use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{config::ReportConfig, context::MutationSite, operator::Category, output};

use super::{rewriter::PathRewriter, SiteSummary};

#[derive(Serialize, Deserialize)]
pub struct JSONSite {
    pub ordinal: usize,
    pub fingerprint: String,
    pub operator: String,
    pub category: Category,
    pub class: String,
    pub method: String,
    pub instruction_index: usize,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub description: String,
}

#[derive(Serialize)]
pub struct JSONReport {
    pub units: Vec<String>,
    pub sites: Vec<JSONSite>,
    pub summary: SiteSummary,
}

pub struct JSONReporter {
    path_rewriter: Option<PathRewriter>,
    units: Vec<String>,
}

impl JSONReporter {
    pub fn new(config: &ReportConfig, units: &[String]) -> Result<Self> {
        Ok(Self {
            path_rewriter: super::path_rewriter(config)?,
            units: units.to_vec(),
        })
    }

    pub fn report(&self, sites: &[MutationSite]) -> Result<()> {
        let report = JSONReport {
            units: self.units.clone(),
            sites: self.map_to_json_sites(sites),
            summary: super::summarize(sites),
        };

        let s = serde_json::to_string_pretty(&report)?;

        output::output_string(s);

        Ok(())
    }

    fn map_to_json_sites(&self, sites: &[MutationSite]) -> Vec<JSONSite> {
        sites
            .iter()
            .map(|site| JSONSite {
                ordinal: site.ordinal,
                fingerprint: site.id.fingerprint(),
                operator: site.id.operator.clone(),
                category: site.category,
                class: site.id.method.owner.clone(),
                method: format!("{}{}", site.id.method.name, site.id.method.descriptor),
                instruction_index: site.id.instruction_index,
                file: super::site_file(site, self.path_rewriter.as_ref()),
                line: site.location.line,
                description: site.description.clone(),
            })
            .collect()
    }
}
