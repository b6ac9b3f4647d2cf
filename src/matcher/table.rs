//! Reference table of listed companies, read from CSV by header name.

use std::path::Path;

use anyhow::{bail, Context, Result};

pub const COL_COMPANY: &str = "Company Name";
pub const COL_ISIN: &str = "CD_ISIN No";
pub const COL_NSE: &str = "CD_NSE Symbol";
pub const COL_BSE: &str = "CD_BSE Code";
pub const COL_INDUSTRY: &str = "CD_Industry1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub company_name: String,
    pub isin: String,
    pub nse_symbol: String,
    pub bse_code: String,
    pub industry: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    pub fn from_rows(rows: Vec<ReferenceRow>) -> Self {
        Self { rows }
    }

    /// Load from a CSV file. Missing optional columns read as empty strings;
    /// a missing company-name column is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("open reference table {}", path.display()))?;
        Self::from_reader(rdr).with_context(|| format!("read reference table {}", path.display()))
    }

    pub fn from_csv_str(data: &str) -> Result<Self> {
        let rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        Self::from_reader(rdr)
    }

    fn from_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let headers = rdr.headers()?.clone();
        let col = |name: &str| headers.iter().position(|h| h.trim_start_matches('\u{feff}') == name);

        let Some(company_idx) = col(COL_COMPANY) else {
            bail!("column '{COL_COMPANY}' not found");
        };
        let isin_idx = col(COL_ISIN);
        let nse_idx = col(COL_NSE);
        let bse_idx = col(COL_BSE);
        let industry_idx = col(COL_INDUSTRY);

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let field = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string()
            };
            let company_name = field(Some(company_idx));
            if company_name.is_empty() {
                continue;
            }
            rows.push(ReferenceRow {
                company_name,
                isin: field(isin_idx),
                nse_symbol: field(nse_idx),
                bse_code: field(bse_idx),
                industry: field(industry_idx),
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
