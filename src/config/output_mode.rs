use serde::Deserialize;
use std::fmt;

/// Content of the per-pixel output record.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Surface reflectance, AOT and Angstrom exponent
    #[default]
    #[serde(rename(deserialize = "full"))]
    Full,
    /// AOT and Angstrom exponent only
    #[serde(rename(deserialize = "reduced"))]
    Reduced,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputMode::Full => write!(f, "full"),
            OutputMode::Reduced => write!(f, "reduced"),
        }
    }
}
