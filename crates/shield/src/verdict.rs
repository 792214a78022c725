use std::fmt;

use serde::{Deserialize, Serialize};

/// Cut-offs for the detection rule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// texts scoring strictly below this perplexity look predictable
    pub max_perplexity: f64,
    /// texts with burstiness strictly above this look repetitive
    pub min_burstiness: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { max_perplexity: 1000.0, min_burstiness: 0.5 }
    }
}

/// Classification of one text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// low perplexity and high burstiness
    AiGenerated,
    /// anything else
    LikelyHuman,
}

impl Verdict {
    /// Both conditions must hold, with strict comparisons. An undefined
    /// (infinite) perplexity never counts as AI generated.
    pub fn decide(perplexity: f64, burstiness: f64, thresholds: &Thresholds) -> Self {
        if perplexity < thresholds.max_perplexity && burstiness > thresholds.min_burstiness {
            Verdict::AiGenerated
        } else {
            Verdict::LikelyHuman
        }
    }

    /// Short label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Verdict::AiGenerated => "AI generated",
            Verdict::LikelyHuman => "likely not AI generated",
        }
    }

    /// Whether this verdict flags the text.
    pub fn is_flagged(self) -> bool {
        self == Verdict::AiGenerated
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
