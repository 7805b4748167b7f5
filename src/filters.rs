// ABOUTME: Include/exclude table selection for a migration run
// ABOUTME: Narrows the catalog's table list without changing its order

use anyhow::{bail, Result};

/// Represents table selection rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl TableFilter {
    /// Creates a filter from CLI or config file values
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            bail!("Cannot use both --include-tables and --exclude-tables");
        }

        for table in include_tables.iter().chain(exclude_tables.iter()).flatten() {
            crate::utils::validate_identifier(table)?;
        }

        Ok(Self {
            include_tables,
            exclude_tables,
        })
    }

    /// Creates an empty filter (copy everything)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none() && self.exclude_tables.is_none()
    }

    /// Determines if a table should be copied
    pub fn should_copy_table(&self, table_name: &str) -> bool {
        if let Some(ref include) = self.include_tables {
            if !include.iter().any(|t| t == table_name) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude_tables {
            if exclude.iter().any(|t| t == table_name) {
                return false;
            }
        }

        true
    }

    /// Keep the selected tables, preserving catalog order
    ///
    /// Included names missing from the source are warned about. An active
    /// filter that selects nothing is an error.
    pub fn apply(&self, tables: Vec<String>) -> Result<Vec<String>> {
        if let Some(ref include) = self.include_tables {
            for name in include {
                if !tables.contains(name) {
                    tracing::warn!("Included table '{}' does not exist in the source", name);
                }
            }
        }

        let selected: Vec<String> = tables
            .into_iter()
            .filter(|table| {
                let keep = self.should_copy_table(table);
                if !keep {
                    tracing::debug!("Skipping table '{}' (filtered out)", table);
                }
                keep
            })
            .collect();

        if selected.is_empty() && !self.is_empty() {
            bail!("No tables selected for migration. Check your filters.");
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Vec<String> {
        ["entry", "entry_tag", "tag", "user"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = TableFilter::empty();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(tables()).unwrap(), tables());
    }

    #[test]
    fn test_empty_filter_allows_empty_source() {
        assert!(TableFilter::empty().apply(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_include_keeps_catalog_order() {
        let filter = TableFilter::new(
            Some(vec!["tag".to_string(), "entry".to_string()]),
            None,
        )
        .unwrap();

        assert_eq!(filter.apply(tables()).unwrap(), vec!["entry", "tag"]);
    }

    #[test]
    fn test_exclude_removes_tables() {
        let filter = TableFilter::new(None, Some(vec!["user".to_string()])).unwrap();

        assert!(!filter.should_copy_table("user"));
        assert!(filter.should_copy_table("entry"));
        assert_eq!(
            filter.apply(tables()).unwrap(),
            vec!["entry", "entry_tag", "tag"]
        );
    }

    #[test]
    fn test_include_and_exclude_are_mutually_exclusive() {
        let result = TableFilter::new(
            Some(vec!["entry".to_string()]),
            Some(vec!["tag".to_string()]),
        );
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Cannot use both"));
    }

    #[test]
    fn test_filter_selecting_nothing_is_an_error() {
        let filter = TableFilter::new(Some(vec!["missing".to_string()]), None).unwrap();
        assert!(filter.apply(tables()).is_err());
    }

    #[test]
    fn test_filter_rejects_invalid_table_names() {
        assert!(TableFilter::new(Some(vec!["".to_string()]), None).is_err());
        assert!(TableFilter::new(None, Some(vec!["bad\nname".to_string()])).is_err());
    }
}
