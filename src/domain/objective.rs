// ============================================================
// Layer 3 — Training Objective
// ============================================================
// causal: predict token t+1 from tokens 0..=t (causal mask on)
// masked: predict hidden tokens from the whole sequence (BERT)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Causal,
    Masked,
}

impl Objective {
    /// Whether attention must be restricted to earlier positions.
    pub fn needs_causal_mask(&self) -> bool {
        matches!(self, Objective::Causal)
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Causal => f.write_str("causal"),
            Objective::Masked => f.write_str("masked"),
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "causal" | "clm" => Ok(Objective::Causal),
            "masked" | "mlm" => Ok(Objective::Masked),
            other => Err(format!("unknown objective '{other}' (expected causal or masked)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_display() {
        for obj in [Objective::Causal, Objective::Masked] {
            assert_eq!(obj.to_string().parse::<Objective>(), Ok(obj));
        }
    }

    #[test]
    fn test_only_causal_needs_mask() {
        assert!(Objective::Causal.needs_causal_mask());
        assert!(!Objective::Masked.needs_causal_mask());
    }

    #[test]
    fn test_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Objective::Masked).unwrap(), "\"masked\"");
    }
}
