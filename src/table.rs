/// In-memory snapshot of one uploaded source document. Headers are
/// normalized at construction (byte-order marks and surrounding whitespace
/// stripped) so extractors can look columns up by their documented names.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.replace('\u{feff}', "").trim().to_string())
            .collect();
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |idx| Row { table: self, idx })
    }
}

/// Borrowed view of one table row with by-name cell access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    idx: usize,
}

impl<'a> Row<'a> {
    /// Cell value by column name. Returns `None` when the column does not
    /// exist in this snapshot or the cell is blank, so callers treat both
    /// the same way: as missing data.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let col = self.table.column(name)?;
        let value = self.table.rows[self.idx].get(col)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}
