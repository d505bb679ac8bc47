//! The memory initialization format.
//!
//! ```json
//! {
//!   "calories": {
//!     "data": [1000, 2000, 3000],
//!     "format": { "numeric_type": "bitnum", "is_signed": false, "width": 32 }
//!   }
//! }
//! ```
//! The same format is used when dumping memories after a run.
use crate::errors::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io, path::Path};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Bitnum,
    #[serde(alias = "fixed_point")]
    Fixed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub numeric_type: NumericType,
    pub is_signed: bool,
    pub width: u32,
}

impl FormatInfo {
    /// Unsigned bit vectors of the given width.
    pub fn bitnum(width: u32) -> Self {
        Self {
            numeric_type: NumericType::Bitnum,
            is_signed: false,
            width,
        }
    }

    /// Only unsigned bit vectors can be loaded.
    pub(crate) fn check(&self, memory: &str) -> SimResult<()> {
        if self.numeric_type != NumericType::Bitnum {
            return Err(SimError::UnsupportedFormat {
                memory: memory.to_string(),
                msg: "only bitnum data is supported".to_string(),
            }
            .into());
        }
        if self.is_signed {
            return Err(SimError::UnsupportedFormat {
                memory: memory.to_string(),
                msg: "signed data is not supported".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub data: Vec<u64>,
    pub format: FormatInfo,
}

/// Initial (or final) contents of the external memories of a design, keyed
/// by memory name.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct MemoryData(pub BTreeMap<String, MemoryEntry>);

impl MemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add unsigned `data` of the given `width` for the memory `name`.
    pub fn insert<S: ToString>(&mut self, name: S, data: Vec<u64>, width: u32) {
        self.0.insert(
            name.to_string(),
            MemoryEntry {
                data,
                format: FormatInfo::bitnum(width),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&MemoryEntry> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemoryEntry)> {
        self.0.iter()
    }

    pub fn from_reader<R: io::Read>(reader: R) -> SimResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> SimResult<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_file() {
        let json = r#"{
            "answer": {
                "data": [0],
                "format": { "numeric_type": "bitnum", "is_signed": false, "width": 32 }
            },
            "weights": {
                "data": [1, 2],
                "format": { "numeric_type": "fixed_point", "is_signed": true, "width": 16 }
            }
        }"#;
        let data = MemoryData::from_reader(json.as_bytes()).unwrap();
        let answer = data.get("answer").unwrap();
        assert_eq!(answer.data, vec![0]);
        assert!(answer.format.check("answer").is_ok());
        let weights = data.get("weights").unwrap();
        assert_eq!(weights.format.numeric_type, NumericType::Fixed);
        assert!(weights.format.check("weights").is_err());
    }

    #[test]
    fn dump_uses_input_format() {
        let mut data = MemoryData::new();
        data.insert("count", vec![3], 32);
        let mut buf = vec![];
        data.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"bitnum\""));
        assert_eq!(MemoryData::from_reader(text.as_bytes()).unwrap(), data);
    }
}
