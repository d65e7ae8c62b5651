//! Merging region tables and writing pipeline outputs

use std::fs;
use std::path::Path;
use streamprep_core::io::write_table;
use streamprep_core::{Error, FeatureTable, Result, CRS};
use tracing::info;

/// Concatenate tables in order into one table tagged with `crs`.
///
/// Tables without a CRS take `crs`; a table tagged with a different CRS is a
/// `CrsMismatch`. An empty list is an `EmptyMergeSet`.
pub fn merge_tables(tables: Vec<FeatureTable>, crs: &CRS) -> Result<FeatureTable> {
    if tables.is_empty() {
        return Err(Error::EmptyMergeSet);
    }

    if let Some(other) = tables
        .iter()
        .filter_map(FeatureTable::crs)
        .find(|c| !c.is_equivalent(crs))
    {
        return Err(Error::CrsMismatch(other.identifier(), crs.identifier()));
    }

    let total = tables.iter().map(FeatureTable::len).sum();
    let mut merged = FeatureTable::with_crs(crs.clone());
    merged.features.reserve(total);
    for table in tables {
        merged.append(table);
    }
    Ok(merged)
}

/// Write a finished table, creating the parent directory if needed
pub fn write_output(table: &FeatureTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_table(table, path)?;
    info!("Wrote {} records to {}", table.len(), path.display());
    Ok(())
}
