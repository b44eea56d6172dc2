use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use execwatch_common::{COUNTER_TABLE, COUNT_PROGRAM, HELLO_PROGRAM};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Logs a fixed message on every occurrence.
    Hello,
    /// Counts occurrences per user ID in a kernel table.
    Count,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Hello => "hello",
            ProbeKind::Count => "count",
        }
    }

    pub fn artifact(&self) -> ProbeArtifact {
        match self {
            ProbeKind::Hello => ProbeArtifact {
                program: HELLO_PROGRAM,
                table: None,
                needs_logger: true,
            },
            ProbeKind::Count => ProbeArtifact {
                program: COUNT_PROGRAM,
                table: Some(COUNTER_TABLE),
                needs_logger: false,
            },
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hello" => Ok(ProbeKind::Hello),
            "count" => Ok(ProbeKind::Count),
            other => bail!("unknown probe kind `{}`, expected `hello` or `count`", other),
        }
    }
}

/// The compiled program selected for a run and the table it owns, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeArtifact {
    pub program: &'static str,
    pub table: Option<&'static str>,
    /// Kernel log forwarding is the program's only output.
    pub needs_logger: bool,
}
