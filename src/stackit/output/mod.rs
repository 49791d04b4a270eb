//! # Output
//!
//! Leaves hand their decoded response to [`Renderer::render`] together with a
//! single table-building callback. The renderer picks the representation from
//! the `--output-format` in force:
//!
//! - `json`: the record, pretty printed with two-space indentation
//! - `yaml`: the same record as YAML (see [`yaml`])
//! - `pretty`: the table built by the callback, paged when wider than the
//!   terminal
//! - `none`: nothing on stdout
//!
//! Mutations without a table use [`Renderer::outcome`], which prints the
//! one-line result message instead of a table.

pub mod pager;
pub mod table;
pub mod yaml;

use crate::error::Result;
use crate::print::Printer;
use crate::signal::CancelToken;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pretty,
    Json,
    Yaml,
    None,
}

impl OutputFormat {
    pub const VALUES: &'static [&'static str] = &["pretty", "json", "yaml", "none"];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::None => "none",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "none" => Ok(OutputFormat::None),
            _ => Err(format!(
                "value {s:?} is not one of {}",
                OutputFormat::VALUES.join(", ")
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub struct Renderer<'a> {
    printer: &'a Printer,
    cancel: &'a CancelToken,
    format: OutputFormat,
}

impl<'a> Renderer<'a> {
    pub fn new(printer: &'a Printer, cancel: &'a CancelToken, format: OutputFormat) -> Self {
        Self {
            printer,
            cancel,
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Emits `record` in the selected format. `build` is only called for the
    /// pretty format.
    pub fn render<T, F>(&self, record: &T, build: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&mut Table) -> Result<()>,
    {
        match self.format {
            OutputFormat::Json => self.printer.output(&to_json(record)?),
            OutputFormat::Yaml => self.printer.output(&yaml::to_yaml(record)?),
            OutputFormat::Pretty => {
                let mut table = Table::new();
                build(&mut table)?;
                self.table(&table);
            }
            OutputFormat::None => {}
        }
        Ok(())
    }

    pub fn table(&self, table: &Table) {
        if table.is_empty() {
            return;
        }
        let text = table.render();
        if pager::needs_pager(self.printer, &text) {
            pager::display(self.printer, self.cancel, &text);
        } else {
            self.printer.output(&text);
        }
    }

    /// Result line of a mutation.
    ///
    /// Pretty prints the message on stdout. With json/yaml the response record
    /// takes its place; json/yaml without a record and `none` send the
    /// message to stderr.
    pub fn outcome<T: Serialize + ?Sized>(&self, record: Option<&T>, message: &str) -> Result<()> {
        match (self.format, record) {
            (OutputFormat::Json, Some(record)) => self.printer.output(&to_json(record)?),
            (OutputFormat::Yaml, Some(record)) => self.printer.output(&yaml::to_yaml(record)?),
            (OutputFormat::Pretty, _) => self.printer.output(message),
            _ => self.printer.info(message),
        }
        Ok(())
    }

    /// Message for an empty listing, on stderr so stdout stays parseable.
    pub fn empty(&self, message: &str) {
        self.printer.info(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells;
    use crate::print::testing::printer;
    use serde_json::json;

    fn record() -> serde_json::Value {
        json!({"id": "abc", "labels": {"a": "1"}, "targets": ["x", "y"]})
    }

    fn render_with(format: OutputFormat) -> (String, String) {
        let (p, out, err) = printer("");
        let cancel = CancelToken::new();
        let renderer = Renderer::new(&p, &cancel, format);
        renderer
            .render(&record(), |table| {
                table.set_header(&["ID"]);
                table.add_row(cells!["abc"]);
                Ok(())
            })
            .unwrap();
        (out.contents(), err.contents())
    }

    #[test]
    fn test_json_uses_two_space_indent() {
        let (out, _) = render_with(OutputFormat::Json);
        assert!(out.starts_with("{\n  \"id\": \"abc\""));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn test_json_and_yaml_decode_to_same_document() {
        let (json_out, _) = render_with(OutputFormat::Json);
        let (yaml_out, _) = render_with(OutputFormat::Yaml);
        let from_json: serde_json::Value = serde_json::from_str(&json_out).unwrap();
        let from_yaml: serde_json::Value = serde_yaml::from_str(&yaml_out).unwrap();
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn test_pretty_calls_table_builder() {
        let (out, _) = render_with(OutputFormat::Pretty);
        assert!(out.contains(" abc"));
    }

    #[test]
    fn test_none_prints_nothing() {
        let (out, err) = render_with(OutputFormat::None);
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_outcome_routing() {
        let cancel = CancelToken::new();
        let rec = json!({"instanceId": "abc"});

        let (p, out, err) = printer("");
        Renderer::new(&p, &cancel, OutputFormat::Pretty)
            .outcome(Some(&rec), "Created instance")
            .unwrap();
        assert_eq!(out.contents(), "Created instance\n");
        assert!(err.contents().is_empty());

        let (p, out, err) = printer("");
        Renderer::new(&p, &cancel, OutputFormat::Json)
            .outcome(Some(&rec), "Created instance")
            .unwrap();
        assert!(out.contents().contains("\"instanceId\": \"abc\""));
        assert!(err.contents().is_empty());

        let (p, out, err) = printer("");
        Renderer::new(&p, &cancel, OutputFormat::None)
            .outcome(Some(&rec), "Created instance")
            .unwrap();
        assert!(out.contents().is_empty());
        assert_eq!(err.contents(), "Created instance\n");

        let (p, out, err) = printer("");
        Renderer::new(&p, &cancel, OutputFormat::Yaml)
            .outcome::<()>(None, "Deleted instance")
            .unwrap();
        assert!(out.contents().is_empty());
        assert_eq!(err.contents(), "Deleted instance\n");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
