//! To describe dump of the refined embedding

use serde::{Deserialize, Serialize};

use std::str::FromStr;

/// csv (one line per node) or bson (graphembed like dump)
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Format {
    CSV,
    BSON,
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Format::CSV),
            "bson" => Ok(Format::BSON),
            _ => {
                log::error!("unrecognized output format : {}", s);
                Err(anyhow::anyhow!("unrecognized output format {:?}, expected csv or bson", s))
            }
        }
    }
} // end of impl FromStr for Format

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Output {
    /// describe output format
    fmt: Format,
    /// name of output file
    output_name: String,
}

impl Output {
    /// if output_name is None, default output_name will be "embedding" with the extension of the format.
    pub fn new(fmt: Format, output_name: &Option<String>) -> Self {
        let ext = match fmt {
            Format::CSV => ".csv",
            Format::BSON => ".bson",
        };
        let output_name = match output_name {
            Some(name) => {
                let mut fname = name.clone();
                if !fname.ends_with(ext) {
                    fname.push_str(ext);
                }
                fname
            }
            None => {
                let mut fname = String::from("embedding");
                fname.push_str(ext);
                fname
            }
        };
        Output { fmt, output_name }
    }
    /// get ouput format
    pub fn get_fmt(&self) -> Format {
        self.fmt
    }

    /// get output_name
    pub fn get_output_name(&self) -> &String {
        &self.output_name
    }
} // end of Output

impl Default for Output {
    fn default() -> Self {
        Output {
            fmt: Format::CSV,
            output_name: String::from("embedding.csv"),
        }
    }
}

// end of mod tests
