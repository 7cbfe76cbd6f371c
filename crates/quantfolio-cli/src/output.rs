use serde_json::Value;

use crate::error::CliError;

/// One command's result: machine data plus human-readable lines.
#[derive(Debug)]
pub struct CommandOutput {
    pub data: Value,
    pub lines: Vec<String>,
}

impl CommandOutput {
    pub fn new(data: Value, lines: Vec<String>) -> Self {
        Self { data, lines }
    }
}

pub fn render(output: &CommandOutput, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(&output.data)?);
    } else {
        for line in &output.lines {
            println!("{line}");
        }
    }
    Ok(())
}
