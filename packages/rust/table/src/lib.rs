//! Tabular I/O for ceofinder: the CSV row source and result writer.
//!
//! A [`Table`] is loaded once per run, preserves every original column and
//! the row order, and exposes [`CompanyRecord`]s to the run controller. The
//! six result columns (`ceo_name`, `ceo_title`, `ceo_email`, `ceo_linkedin`,
//! `confidence`, `source`) are appended to the header when the input does
//! not already carry them; all other cells are never altered.

use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info};

use ceofinder_shared::{Candidate, CeoFinderError, CompanyRecord, Result};

/// Result columns managed by enrichment, in output order.
pub const RESULT_COLUMNS: [&str; 6] = [
    "ceo_name",
    "ceo_title",
    "ceo_email",
    "ceo_linkedin",
    "confidence",
    "source",
];

/// Header keywords for the company-name column.
const COMPANY_TERMS: [&str; 5] = ["company", "business", "organization", "firm", "name"];

/// Header keywords for the website column.
const WEBSITE_TERMS: [&str; 5] = ["website", "web", "url", "domain", "site"];

// ---------------------------------------------------------------------------
// Column detection
// ---------------------------------------------------------------------------

/// Indices of recognized columns within the (extended) header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub company: usize,
    pub website: Option<usize>,
    pub company_linkedin: Option<usize>,
    pub ceo_name: usize,
    pub ceo_title: usize,
    pub ceo_email: usize,
    pub ceo_linkedin: usize,
    pub confidence: usize,
    pub source: usize,
}

fn detect_columns(headers: &[String]) -> Option<ColumnMap> {
    let lowered: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let is_result = |h: &str| RESULT_COLUMNS.contains(&h);

    let company = lowered.iter().position(|h| {
        !is_result(h) && COMPANY_TERMS.iter().any(|term| h.contains(term))
    })?;

    let website = lowered.iter().position(|h| {
        !is_result(h) && WEBSITE_TERMS.iter().any(|term| h.contains(term))
    });

    let company_linkedin = lowered
        .iter()
        .position(|h| !is_result(h) && h.contains("linkedin"));

    let result_idx = |name: &str| lowered.iter().position(|h| h == name);

    Some(ColumnMap {
        company,
        website,
        company_linkedin,
        // Result columns are guaranteed present: the loader extends the
        // header before detection runs.
        ceo_name: result_idx("ceo_name")?,
        ceo_title: result_idx("ceo_title")?,
        ceo_email: result_idx("ceo_email")?,
        ceo_linkedin: result_idx("ceo_linkedin")?,
        confidence: result_idx("confidence")?,
        source: result_idx("source")?,
    })
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An in-memory company table: headers, rows, and the detected column map.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: ColumnMap,
}

impl Table {
    /// Parse a table from any CSV reader.
    ///
    /// Fails with [`CeoFinderError::Input`] when the file has no data rows
    /// or no recognizable company-name column — both abort before a run
    /// starts.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() {
            return Err(CeoFinderError::input("input file has no header row"));
        }

        // Extend the header with any missing result columns so every row
        // has a cell to write into.
        let lowered: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        for name in RESULT_COLUMNS {
            if !lowered.iter().any(|h| h == name) {
                headers.push(name.to_string());
            }
        }
        let width = headers.len();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(CeoFinderError::input("input file has no data rows"));
        }

        let columns = detect_columns(&headers)
            .ok_or_else(|| CeoFinderError::input("could not find a company name column"))?;

        debug!(
            rows = rows.len(),
            company_col = %headers[columns.company],
            website_col = columns.website.map(|i| headers[i].as_str()).unwrap_or("-"),
            "table loaded"
        );

        Ok(Self {
            headers,
            rows,
            columns,
        })
    }

    /// Parse a table from a CSV file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| CeoFinderError::io(path, e))?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row][col].as_str()
    }

    fn optional_cell(&self, row: usize, col: Option<usize>) -> Option<String> {
        col.map(|c| self.cell(row, c))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    /// Build the [`CompanyRecord`] for one row. Identity is the row position.
    pub fn record(&self, row_index: usize) -> CompanyRecord {
        let cols = &self.columns;
        let non_empty = |col: usize| {
            let value = self.cell(row_index, col).trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        CompanyRecord {
            row_index,
            company: self.cell(row_index, cols.company).trim().to_string(),
            ceo_name: non_empty(cols.ceo_name),
            ceo_title: non_empty(cols.ceo_title),
            ceo_email: non_empty(cols.ceo_email),
            ceo_linkedin: non_empty(cols.ceo_linkedin),
            website: self.optional_cell(row_index, cols.website),
            company_linkedin: self.optional_cell(row_index, cols.company_linkedin),
            confidence: non_empty(cols.confidence),
            source: non_empty(cols.source),
            passthrough: self.rows[row_index].clone(),
        }
    }

    /// All records in table order.
    pub fn records(&self) -> Vec<CompanyRecord> {
        (0..self.rows.len()).map(|i| self.record(i)).collect()
    }

    /// Write an accepted candidate into a row's result cells. Only the six
    /// result columns are touched.
    pub fn apply_candidate(&mut self, row_index: usize, candidate: &Candidate, source: &str) {
        let cols = self.columns.clone();
        let row = &mut self.rows[row_index];
        row[cols.ceo_name] = candidate.name.clone();
        row[cols.ceo_title] = candidate.title.clone().unwrap_or_default();
        row[cols.ceo_email] = candidate.email.clone().unwrap_or_default();
        if let Some(linkedin) = &candidate.linkedin {
            row[cols.ceo_linkedin] = linkedin.clone();
        }
        row[cols.confidence] = candidate.confidence.clone().unwrap_or_default();
        row[cols.source] = source.to_string();
    }

    /// Mark a row as attempted-but-unresolved without clearing any
    /// pre-existing CEO value.
    pub fn mark_not_found(&mut self, row_index: usize, reason: &str) {
        let cols = self.columns.clone();
        let row = &mut self.rows[row_index];
        if row[cols.ceo_name].trim().is_empty() {
            row[cols.source] = reason.to_string();
        }
    }

    /// Copy result cells from a previous run's output into rows that do
    /// not have a CEO yet, matched by company name. Lets an interrupted
    /// run pick up where its checkpoint left off.
    pub fn merge_previous(&mut self, previous: &Table) -> usize {
        let mut merged = 0;
        let by_company: std::collections::HashMap<String, usize> = previous
            .records()
            .iter()
            .filter(|r| r.has_ceo())
            .map(|r| (r.company.to_lowercase(), r.row_index))
            .collect();

        for row_index in 0..self.rows.len() {
            let record = self.record(row_index);
            if record.has_ceo() {
                continue;
            }
            let Some(&prev_index) = by_company.get(&record.company.to_lowercase()) else {
                continue;
            };
            let prev = previous.record(prev_index);
            if let Some(name) = prev.ceo_name {
                let candidate = Candidate {
                    name,
                    title: prev.ceo_title,
                    email: prev.ceo_email,
                    linkedin: prev.ceo_linkedin,
                    confidence: prev.confidence,
                };
                let source = prev.source.unwrap_or_else(|| "previous_run".to_string());
                self.apply_candidate(row_index, &candidate, &source);
                merged += 1;
            }
        }
        debug!(merged, "merged rows from previous output");
        merged
    }

    /// Serialize the table to any writer, preserving row order and every
    /// untouched cell.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer
            .flush()
            .map_err(|e| CeoFinderError::Csv(e.to_string()))?;
        Ok(())
    }

    /// Persist the table to a CSV file. Used for checkpoints and the final
    /// write; the whole file is rewritten each time.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| CeoFinderError::io(path, e))?;
        self.write_to(file)?;
        info!(path = %path.display(), rows = self.rows.len(), "table saved");
        Ok(())
    }
}
