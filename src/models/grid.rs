use std::collections::BTreeMap;

/// One comparison row: a normalized label and its cells keyed by column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub label: String,
    pub cells: BTreeMap<usize, String>,
}

/// Canonical label → column → text table built from a comparison payload.
///
/// Rows keep payload order. Inserting an existing label replaces its cells in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<GridRow>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, cells: BTreeMap<usize, String>) {
        match self.rows.iter_mut().find(|row| row.label == label) {
            Some(row) => row.cells = cells,
            None => self.rows.push(GridRow { label, cells }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &GridRow> {
        self.rows.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.label.as_str())
    }

    pub fn cell(&self, label: &str, column: usize) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.label == label)
            .and_then(|row| row.cells.get(&column))
            .map(String::as_str)
    }

    /// Number of columns in the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }
}

/// Product display names, index-aligned with [`Grid`] columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    names: Vec<String>,
}

impl ColumnSet {
    /// Pads `names` with "Model N" placeholders up to the grid width.
    pub fn from_names(mut names: Vec<String>, grid: &Grid) -> Self {
        for index in names.len()..grid.width() {
            names.push(format!("Model {}", index + 1));
        }
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.names.get(column).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, name)| (i, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cells(values: &[&str]) -> BTreeMap<usize, String> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.to_string()))
            .collect()
    }

    #[test]
    fn duplicate_label_replaces_cells_in_place() {
        let mut grid = Grid::new();
        grid.insert("chip".into(), cells(&["M1"]));
        grid.insert("weight".into(), cells(&["444 g"]));
        grid.insert("chip".into(), cells(&["M4", "M3"]));

        assert_eq!(grid.len(), 2);
        assert_eq!(grid.labels().collect::<Vec<_>>(), vec!["chip", "weight"]);
        assert_eq!(grid.cell("chip", 1), Some("M3"));
        assert_eq!(grid.width(), 2);
    }

    #[test]
    fn placeholders_fill_up_to_widest_row() {
        let mut grid = Grid::new();
        grid.insert("chip".into(), cells(&["M4", "M3", "A16"]));

        let columns = ColumnSet::from_names(vec!["iPad Pro".into()], &grid);
        let names: Vec<_> = columns.iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["iPad Pro", "Model 2", "Model 3"]);
    }

    #[test]
    fn empty_grid_has_no_placeholders() {
        let columns = ColumnSet::from_names(Vec::new(), &Grid::new());
        assert!(columns.is_empty());
    }
}
