//! Fixed organ identities and canonical ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six organs every report covers.
///
/// Declaration order is the canonical report order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Organ {
    Liver,
    Gallbladder,
    Pancreas,
    Spleen,
    Kidney,
    Aorta,
}

impl Organ {
    /// Canonical report order
    pub const CANONICAL: [Organ; 6] = [
        Organ::Liver,
        Organ::Gallbladder,
        Organ::Pancreas,
        Organ::Spleen,
        Organ::Kidney,
        Organ::Aorta,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Organ::Liver => "liver",
            Organ::Gallbladder => "gallbladder",
            Organ::Pancreas => "pancreas",
            Organ::Spleen => "spleen",
            Organ::Kidney => "kidney",
            Organ::Aorta => "aorta",
        }
    }

    /// Label used as the line prefix in the findings block
    pub fn label(self) -> &'static str {
        match self {
            Organ::Liver => "Liver",
            Organ::Gallbladder => "Gallbladder",
            Organ::Pancreas => "Pancreas",
            Organ::Spleen => "Spleen",
            Organ::Kidney => "Kidney",
            Organ::Aorta => "Aorta",
        }
    }

    /// Position in `CANONICAL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a key as used by the JSON splitter (`gb` accepted for gallbladder)
    pub fn from_key(key: &str) -> Option<Organ> {
        match key.trim().to_lowercase().as_str() {
            "liver" => Some(Organ::Liver),
            "gb" | "gallbladder" => Some(Organ::Gallbladder),
            "pancreas" => Some(Organ::Pancreas),
            "spleen" => Some(Organ::Spleen),
            "kidney" | "kidneys" => Some(Organ::Kidney),
            "aorta" => Some(Organ::Aorta),
            _ => None,
        }
    }
}

impl fmt::Display for Organ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
