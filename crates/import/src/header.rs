use thiserror::Error;

use crate::cell::Cell;

/// Field names promoted from a header row, one per column index. Blank
/// header cells get synthetic `col_<index>` names. Duplicate names are
/// tolerated; lookups are positional (first hit wins).
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMap {
    names: Vec<String>,
}

impl HeaderMap {
    pub fn promote(row: &[Cell]) -> HeaderMap {
        let names = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let s = cell.as_text();
                if s.is_empty() {
                    format!("col_{i}")
                } else {
                    s
                }
            })
            .collect();
        HeaderMap { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// First column whose name equals `name` case-insensitively.
    pub fn position_exact(&self, name: &str) -> Option<usize> {
        let want = name.trim().to_lowercase();
        self.names
            .iter()
            .position(|n| n.trim().to_lowercase() == want)
    }

    /// First column whose name contains `needle` case-insensitively.
    pub fn position_containing(&self, needle: &str) -> Option<usize> {
        let want = needle.trim().to_lowercase();
        self.names
            .iter()
            .position(|n| n.to_lowercase().contains(&want))
    }

    /// True for synthetic `col_<i>` placeholder names.
    pub fn is_placeholder(&self, index: usize) -> bool {
        self.names
            .get(index)
            .is_some_and(|n| *n == format!("col_{index}"))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum HeaderError {
    #[error("sheet has no rows to promote as headers")]
    EmptyGrid,
}

/// A located header row plus the strategy that found it, for diagnostics.
#[derive(Debug, Clone)]
pub struct HeaderLocation {
    pub row_index: usize,
    pub headers: HeaderMap,
    pub strategy: &'static str,
}

/// Finds the row that plausibly holds column headers. Strategies are tried
/// in order, each returning a definite hit or nothing:
///
/// 1. `keyword-scan` — first row (within `scan_limit`) with at least
///    `min_populated` non-empty cells whose lower-cased text contains at
///    least one token from *every* required group.
/// 2. `first-populated-row` — the nominal header row was blank or never
///    matched; promote the first row with any content.
/// 3. `row-zero` — last resort.
///
/// Fallbacks are logged; only an entirely empty grid fails.
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    pub scan_limit: usize,
    pub min_populated: usize,
}

impl Default for HeaderLocator {
    fn default() -> Self {
        HeaderLocator {
            scan_limit: 500,
            min_populated: 3,
        }
    }
}

impl HeaderLocator {
    pub fn locate(
        &self,
        grid: &[Vec<Cell>],
        token_groups: &[&[&str]],
    ) -> Result<HeaderLocation, HeaderError> {
        if grid.is_empty() {
            return Err(HeaderError::EmptyGrid);
        }

        if let Some(row_index) = self.keyword_scan(grid, token_groups) {
            return Ok(HeaderLocation {
                row_index,
                headers: HeaderMap::promote(&grid[row_index]),
                strategy: "keyword-scan",
            });
        }

        if let Some(row_index) = first_populated_row(grid) {
            tracing::warn!(
                row = row_index,
                "no header row matched keyword groups, promoting first populated row"
            );
            return Ok(HeaderLocation {
                row_index,
                headers: HeaderMap::promote(&grid[row_index]),
                strategy: "first-populated-row",
            });
        }

        tracing::warn!("sheet has no populated rows, promoting row 0");
        Ok(HeaderLocation {
            row_index: 0,
            headers: HeaderMap::promote(&grid[0]),
            strategy: "row-zero",
        })
    }

    fn keyword_scan(&self, grid: &[Vec<Cell>], token_groups: &[&[&str]]) -> Option<usize> {
        if token_groups.is_empty() {
            return None;
        }
        for (r, row) in grid.iter().take(self.scan_limit).enumerate() {
            let texts: Vec<String> = row.iter().map(|c| c.as_text().to_lowercase()).collect();
            let populated = texts.iter().filter(|t| !t.is_empty()).count();
            if populated < self.min_populated {
                continue;
            }
            let all_groups_hit = token_groups.iter().all(|group| {
                group
                    .iter()
                    .any(|tok| texts.iter().any(|t| t.contains(*tok)))
            });
            if all_groups_hit {
                return Some(r);
            }
        }
        None
    }
}

fn first_populated_row(grid: &[Vec<Cell>]) -> Option<usize> {
    grid.iter().position(|row| row.iter().any(|c| !c.is_empty()))
}
