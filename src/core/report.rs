//! Human-readable availability report

use crate::config::TimeWindow;
use crate::core::query::QueryAccumulator;
use crate::core::reconcile::ReconciliationResult;

/// Table cell; numbers are right-aligned, text left-aligned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as i64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n)
    }
}

/// Render rows as a bordered grid; an empty row set renders as nothing
pub fn grid_table(rows: &[Vec<Cell>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.render().chars().count());
        }
    }

    let border: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+";

    let mut lines = vec![border.clone()];
    for row in rows {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i);
            let text = cell.map(Cell::render).unwrap_or_default();
            let padded = match cell {
                Some(Cell::Number(_)) => format!("{:>width$}", text, width = width),
                _ => format!("{:<width$}", text, width = width),
            };
            line.push_str(&format!("| {} ", padded));
        }
        line.push('|');
        lines.push(line);
        lines.push(border.clone());
    }
    lines.join("\n")
}

/// Availability summary of one scrape
pub struct AvailabilityReport<'a> {
    pub window: &'a TimeWindow,
    pub index_url: &'a str,
    pub accumulator: &'a QueryAccumulator,
    pub result: &'a ReconciliationResult,
}

impl<'a> AvailabilityReport<'a> {
    pub fn new(
        window: &'a TimeWindow,
        index_url: &'a str,
        accumulator: &'a QueryAccumulator,
        result: &'a ReconciliationResult,
    ) -> Self {
        Self {
            window,
            index_url,
            accumulator,
            result,
        }
    }

    pub fn stats_rows(&self) -> Vec<Vec<Cell>> {
        let mut rows = vec![
            vec!["total on apihub".into(), self.accumulator.len().into()],
            vec!["missing products".into(), self.result.missing.len().into()],
        ];
        if let Some(expected) = self.result.total_expected {
            rows.push(vec!["declared by apihub".into(), Cell::Number(expected as i64)]);
        }
        rows
    }

    pub fn track_rows(&self) -> Vec<Vec<Cell>> {
        self.accumulator
            .track_counts()
            .into_iter()
            .map(|(track, count)| vec![track.into(), count.into()])
            .collect()
    }

    pub fn missing_rows(&self) -> Vec<Vec<Cell>> {
        self.result
            .missing
            .iter()
            .map(|id| vec!["missing".into(), id.as_str().into()])
            .collect()
    }

    pub fn render(&self) -> String {
        let mut msg = format!("Global data availability for {}:\n", self.window);
        msg += &grid_table(&self.stats_rows());

        msg += "\n\nApiHub (ODATA) product count by track:\n";
        msg += &grid_table(&self.track_rows());

        msg += "\n\nMissing products:\n";
        msg += &grid_table(&self.missing_rows());
        msg += &format!(
            "\nMissing {} in {} out of {} in ApiHub (ODATA)\n\n",
            self.result.missing.len(),
            self.index_url,
            self.accumulator.len()
        );
        msg
    }
}
