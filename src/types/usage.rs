//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Per-response token usage as reported by the remote model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Running totals across every round-trip within one orchestration run.
///
/// Accumulated additively per round; the invariant `total == input + output`
/// holds for one round and for any number of rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageAccumulator {
    input_tokens: u64,
    output_tokens: u64,
    rounds: u32,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, usage: &Usage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.rounds += 1;
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn into_info(self) -> UsageInfo {
        UsageInfo {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            total_tokens: self.input_tokens + self.output_tokens,
        }
    }
}

/// Usage triple exposed in action outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl UsageInfo {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_usage(usage: &Usage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_sums_rounds_independently() {
        let mut acc = UsageAccumulator::new();
        acc.add(&Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        acc.add(&Usage {
            input_tokens: 20,
            output_tokens: 7,
        });
        acc.add(&Usage {
            input_tokens: 3,
            output_tokens: 1,
        });

        assert_eq!(acc.rounds(), 3);
        let info = acc.into_info();
        assert_eq!(info.input_tokens, 33);
        assert_eq!(info.output_tokens, 13);
        assert_eq!(info.total_tokens, 46);
        assert_eq!(info.total_tokens, info.input_tokens + info.output_tokens);
    }

    #[test]
    fn test_single_round_matches_raw_usage() {
        let usage = Usage {
            input_tokens: 12,
            output_tokens: 8,
        };
        let mut acc = UsageAccumulator::new();
        acc.add(&usage);
        assert_eq!(acc.into_info(), UsageInfo::from_usage(&usage));
    }
}
