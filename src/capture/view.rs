use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the five prescribed camera angles of a screening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Front,
    Left,
    Right,
    Upper,
    Lower,
}

impl View {
    /// All views in capture order.
    pub const ALL: [View; 5] = [View::Front, View::Left, View::Right, View::Upper, View::Lower];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Front => "front",
            View::Left => "left",
            View::Right => "right",
            View::Upper => "upper",
            View::Lower => "lower",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "front" => Ok(View::Front),
            "left" => Ok(View::Left),
            "right" => Ok(View::Right),
            "upper" => Ok(View::Upper),
            "lower" => Ok(View::Lower),
            other => Err(format!(
                "Unknown view '{}'. Expected one of: front, left, right, upper, lower",
                other
            )),
        }
    }
}
