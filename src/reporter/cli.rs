use colored::*;

use super::{rewriter::PathRewriter, SiteSummary, UNKNOWN_FILE};
use crate::config::ReportConfig;
use crate::context::MutationSite;
use crate::operator::Category;
use crate::output;

use anyhow::{bail, Result};

pub struct CLIReporter {
    path_rewriter: Option<PathRewriter>,
}

impl From<Category> for ColoredString {
    fn from(category: Category) -> Self {
        let tag = category.tag();
        match category {
            Category::OperatorSubstitution => tag.blue(),
            Category::OperandElimination => tag.magenta(),
            Category::ConstantPerturbation => tag.cyan(),
            Category::UnaryStep | Category::NegationInsertion => tag.yellow(),
            Category::CallSubstitution => tag.green(),
        }
    }
}

impl CLIReporter {
    pub fn new(config: &ReportConfig) -> Result<Self> {
        Ok(CLIReporter {
            path_rewriter: super::path_rewriter(config)?,
        })
    }

    fn summary(&self, sites: &[MutationSite]) {
        let SiteSummary {
            total,
            methods,
            per_category,
            ..
        } = super::summarize(sites);

        for (tag, count) in per_category {
            log::info!("{0:15} {1}", tag, count);
        }
        log::info!("{0:15} {1} in {2} methods", "Total", total, methods);
    }

    fn enumerate_sites(&self, sites: &[MutationSite]) {
        let file_map = super::map_sites_to_files(sites, self.path_rewriter.as_ref());

        for (file, line_map) in file_map {
            for (line_nr, sites) in line_map {
                let line_in_file = if file == UNKNOWN_FILE || line_nr == 0 {
                    String::new()
                } else {
                    match Self::get_line_from_file(&file, line_nr) {
                        Ok(line) => line,
                        Err(e) => {
                            log::debug!("Could not read from file: {:?}", e);
                            String::new()
                        }
                    }
                };

                for site in sites {
                    self.print_site(&file, line_nr, site, &line_in_file);
                }
            }
        }
    }

    fn print_site(&self, file: &str, line_nr: u32, site: &MutationSite, line_in_file: &str) {
        let mut file_line = String::from(file);
        if line_nr > 0 {
            file_line += &format!(":{line_nr}");
        }

        let tag: ColoredString = site.category.into();
        let fingerprint = site.id.fingerprint();

        output::output_string(format!(
            "{file_line} ({method}):\n{tag} #{ordinal} [{short}] {operator}: {description}\n{line_in_file}\n",
            method = site.id.method,
            ordinal = site.ordinal,
            short = &fingerprint[..8],
            operator = site.id.operator,
            description = site.description,
        ));
    }

    fn get_line_from_file(file: &str, line_nr: u32) -> Result<String> {
        for (nr, line) in super::read_lines(file)?.enumerate() {
            let line = line?;

            // Line numbers start at 1
            if nr as u32 + 1 == line_nr {
                return Ok(line);
            }
        }

        bail!("Could not read line {line_nr} from file {file}");
    }

    pub fn report(&self, sites: &[MutationSite]) -> Result<()> {
        self.enumerate_sites(sites);
        self.summary(sites);
        Ok(())
    }
}
