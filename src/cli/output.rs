use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Prints `value` for the machine formats; returns false for `Human` so
    /// the caller renders its own text.
    pub fn emit<T: Serialize>(&self, value: &T) -> Result<bool> {
        match self {
            OutputFormat::Human => Ok(false),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
                Ok(true)
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(value)?);
                Ok(true)
            }
        }
    }
}
