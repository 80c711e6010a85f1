//! Reading template rows from a file or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use recurrence_engine::{templates_from_rows, EventTemplate, TemplateRow};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// JSON array of event rows; "-" reads stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,
}

impl InputArgs {
    pub fn read_text(&self) -> Result<String> {
        if self.input.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        } else {
            fs::read_to_string(&self.input)
                .with_context(|| format!("failed to read {}", self.input.display()))
        }
    }

    /// Read and validate templates. Rows that fail to deserialize or validate
    /// are skipped with a warning.
    pub fn load_templates(&self) -> Result<Vec<EventTemplate>> {
        parse_templates(&self.read_text()?)
    }
}

pub fn parse_templates(text: &str) -> Result<Vec<EventTemplate>> {
    let value: Value = serde_json::from_str(text).context("input is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("input must be a JSON array of event rows");
    };

    let rows: Vec<TemplateRow> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(row) => Some(row),
            Err(error) => {
                warn!(index, %error, "skipping unreadable row");
                None
            }
        })
        .collect();

    let templates = templates_from_rows(&rows);
    debug!(rows = rows.len(), templates = templates.len(), "loaded input");
    Ok(templates)
}
