//! Table formatting and output utilities

use crate::error::Result;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style},
    Table, Tabled,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Raw,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

/// Table formatter with color support
pub struct TableFormatter {
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    /// Create a formatted table from data
    pub fn format_table<T: Tabled + Serialize>(&self, data: &[T]) -> Result<String> {
        if data.is_empty() && self.format != OutputFormat::Json {
            return Ok("No data to display".to_string());
        }

        match self.format {
            OutputFormat::Table => Ok(self.format_as_table(data)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Raw => {
                let mut table = Table::new(data);
                table.with(Style::empty());
                Ok(table.to_string())
            }
        }
    }

    fn format_as_table<T: Tabled>(&self, data: &[T]) -> String {
        let mut table = Table::new(data);

        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .with(Padding::new(1, 1, 0, 0));

        if !self.no_color {
            table.with(Modify::new(Rows::first()).with(Color::FG_BLUE));
        }

        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        #[tabled(rename = "Name")]
        name: String,
    }

    #[test]
    fn test_table_formatting() {
        let rows = vec![Row {
            name: "db-password".to_string(),
        }];
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let out = formatter.format_table(&rows).unwrap();
        assert!(out.contains("Name"));
        assert!(out.contains("db-password"));

        let formatter = TableFormatter::new(OutputFormat::Json, true);
        let out = formatter.format_table(&rows).unwrap();
        assert!(out.contains("\"name\": \"db-password\""));
    }

    #[test]
    fn test_empty_table() {
        let rows: Vec<Row> = Vec::new();
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        assert_eq!(formatter.format_table(&rows).unwrap(), "No data to display");
    }
}
