/// Constraint iteration policy.
///
/// Chooses how many relaxation runs a fixed step gets and how often those
/// runs also resolve collisions. A player near the rope selects the high
/// budget; a shrinking rope gets extra runs and denser collision checks so
/// the tightening loop stays stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationBudget {
    /// Relaxation runs this step.
    pub runs: u32,
    /// Collisions are resolved on runs where `run % collision_frequency == 0`.
    pub collision_frequency: u32,
}

impl IterationBudget {
    /// Extra runs granted to a shrinking rope on top of the base count.
    pub const SHRINK_EXTRA_RUNS: u32 = 10;

    pub fn select(
        base: (u32, u32),
        high: (u32, u32),
        player_nearby: bool,
        shrinking: bool,
    ) -> Self {
        let (mut runs, mut frequency) = if player_nearby { high } else { base };
        if shrinking {
            runs = runs.max(base.0 + Self::SHRINK_EXTRA_RUNS);
            frequency = frequency.saturating_sub(1);
        }
        Self {
            runs: runs.max(1),
            collision_frequency: frequency.max(1),
        }
    }

    #[inline]
    pub fn checks_collisions(&self, run: u32) -> bool {
        run % self.collision_frequency == 0
    }
}

/// Statistics from a single solver step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Relaxation runs executed.
    pub runs: u32,
    /// Collision frequency used.
    pub collision_frequency: u32,
    /// Collision passes executed.
    pub collision_passes: u32,
    /// Segment-obstacle corrections applied across all passes.
    pub contacts_resolved: u32,
    /// Whether the high budget was selected.
    pub high_budget: bool,
    /// Number of segments stepped.
    pub segment_count: u32,
}
