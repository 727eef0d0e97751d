//! # Export Metadata
//!
//! What the remote module makes available, as reported by the `Init` response.

use serde::Deserialize;
use serde::Serialize;

/// A named item exported by the remote module.
///
/// Wire format: `{"type":"Memory","name":"memory","memorySize":65536}` or
/// `{"type":"Function","name":"run"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmExport {
    pub name: String,
    #[serde(flatten)]
    pub kind: ExportKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExportKind {
    Function,
    Memory {
        /// Size of the memory in bytes at the time the module was initialized.
        #[serde(rename = "memorySize")]
        memory_size: u64,
    },
    Global,
    Table,
}

impl WasmExport {
    pub fn function(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: ExportKind::Function }
    }

    pub fn memory(name: impl Into<String>, memory_size: u64) -> Self {
        Self { name: name.into(), kind: ExportKind::Memory { memory_size } }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "Function"),
            Self::Memory { .. } => write!(f, "Memory"),
            Self::Global => write!(f, "Global"),
            Self::Table => write!(f, "Table"),
        }
    }
}
