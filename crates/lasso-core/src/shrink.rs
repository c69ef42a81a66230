//! Post-capture tightening of a closed rope.
//!
//! After a delay the controller drives the chain toward a tighter shape with
//! the configured [`ShrinkStrategy`], watches for convergence or a stuck
//! rope, and finally freezes the rope by disabling its solver.

use log::{debug, warn};

use crate::config::{ShrinkConfig, ShrinkStrategy};
use crate::enclosure::find_enclosed;
use crate::hull::{compute_target_path, Path};
use crate::math::EPSILON;
use crate::obstacle::{ObstacleInfo, ObstacleQuery};
use crate::segment::SegmentChain;
use crate::solver::VerletSolver;

/// The chain is never thinned below this many segments.
pub const MIN_SEGMENTS: usize = 8;
/// Removal pace multiplier applied to the shrink rate.
const REMOVAL_RATE_SCALE: f32 = 15.0;
/// Only segments whose neighbours are closer than this many rest lengths are removable.
const MAX_SKIP_FACTOR: f32 = 1.8;
/// Hybrid removes segments while the chain is longer than this.
const HYBRID_REMOVE_ABOVE: usize = 15;
/// Smart shrink removes segments while the chain is longer than this...
const SMART_REMOVE_ABOVE: usize = 12;
/// ...and spacing has dropped below this fraction of the rest length.
const SMART_SPACING_FACTOR: f32 = 0.7;
/// Length change treated as "no change" by stuck detection.
const STUCK_LENGTH_EPSILON: f32 = 0.001;
/// Drop in mean distance to the path that counts as progress.
const PATH_PROGRESS_EPSILON: f32 = 0.001;
/// Smoothing leaves bends sharper than this many rest lengths alone.
const SMOOTHING_LIMIT_FACTOR: f32 = 0.3;
/// Fraction of a path step kept as velocity.
const PATH_RESIDUAL_VELOCITY: f32 = 0.1;
/// Resampled segment count bounds for path following.
const PATH_MIN_SEGMENTS: usize = 8;
const PATH_MAX_SEGMENTS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShrinkState {
    Idle,
    WaitingToStart { elapsed: f32 },
    ActiveReduceLength,
    ActiveRemoveSegments,
    ActiveHybrid,
    ActiveSmartShrink,
    ActiveOptimalPath,
    Finished,
}

impl ShrinkState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ShrinkState::ActiveReduceLength
                | ShrinkState::ActiveRemoveSegments
                | ShrinkState::ActiveHybrid
                | ShrinkState::ActiveSmartShrink
                | ShrinkState::ActiveOptimalPath
        )
    }

    /// Stable numeric code for foreign consumers.
    pub fn code(&self) -> u32 {
        match self {
            ShrinkState::Idle => 0,
            ShrinkState::WaitingToStart { .. } => 1,
            ShrinkState::ActiveReduceLength => 2,
            ShrinkState::ActiveRemoveSegments => 3,
            ShrinkState::ActiveHybrid => 4,
            ShrinkState::ActiveSmartShrink => 5,
            ShrinkState::ActiveOptimalPath => 6,
            ShrinkState::Finished => 7,
        }
    }
}

/// Why an active shrink stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Stuck,
    Tension,
    SegmentsTooClose,
    MinimumReached,
    PathReached,
    NoTargetPath,
}

pub struct ShrinkController {
    config: ShrinkConfig,
    state: ShrinkState,
    target_path: Path,
    removal_credit: f32,
    stuck_frames: u32,
    last_length: f32,
    /// Set once the strategy can no longer shorten or thin the chain.
    at_floor: bool,
    /// Shortest total length (or closest mean path distance) seen since activation.
    best_progress: f32,
    stall_frames: u32,
    stop_reason: Option<StopReason>,
}

impl ShrinkController {
    pub fn new(config: ShrinkConfig) -> Self {
        Self {
            config,
            state: ShrinkState::Idle,
            target_path: Path::default(),
            removal_credit: 0.0,
            stuck_frames: 0,
            last_length: 0.0,
            at_floor: false,
            best_progress: f32::INFINITY,
            stall_frames: 0,
            stop_reason: None,
        }
    }

    pub fn state(&self) -> ShrinkState {
        self.state
    }

    pub fn config(&self) -> &ShrinkConfig {
        &self.config
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finished(&self) -> bool {
        self.state == ShrinkState::Finished
    }

    /// Arm the controller for a freshly closed chain.
    ///
    /// With [`ShrinkStrategy::OptimalPath`] the wrapped target path is
    /// computed here, from the chain as drawn.
    pub fn initialize<Q: ObstacleQuery + ?Sized>(&mut self, chain: &SegmentChain, obstacles: &Q) {
        if self.state != ShrinkState::Idle {
            return;
        }
        if self.config.strategy == ShrinkStrategy::OptimalPath {
            self.target_path = self.compute_path(chain, obstacles);
        }
        self.state = ShrinkState::WaitingToStart { elapsed: 0.0 };
        debug!(
            "shrink controller armed: strategy={:?} delay={}s segments={}",
            self.config.strategy,
            self.config.shrink_delay,
            chain.len()
        );
    }

    fn compute_path<Q: ObstacleQuery + ?Sized>(&self, chain: &SegmentChain, obstacles: &Q) -> Path {
        if chain.len() < 3 {
            return Path::default();
        }
        let points = chain.positions();
        let enclosed: Vec<ObstacleInfo> = find_enclosed(&points, obstacles, self.config.enclosure_mask)
            .into_iter()
            .filter_map(|handle| obstacles.info(handle))
            .collect();
        let mut path = compute_target_path(
            &enclosed,
            &points,
            self.config.wrap_clearance,
            self.config.path_resolution,
        );
        path.align_to(&points);
        debug!(
            "target path computed: {} enclosed obstacles, {} path points",
            enclosed.len(),
            path.len()
        );
        path
    }

    /// Advance one fixed step. Returns the state after the step.
    ///
    /// `elapsed` counts time at the end of the step, so the controller
    /// activates on the first step that brings it to `shrink_delay`.
    pub fn step(&mut self, chain: &mut SegmentChain, solver: &mut VerletSolver, dt: f32) -> ShrinkState {
        if let ShrinkState::WaitingToStart { elapsed } = self.state {
            let elapsed = elapsed + dt;
            if elapsed >= self.config.shrink_delay {
                self.activate(chain, solver);
            } else {
                self.state = ShrinkState::WaitingToStart { elapsed };
                return self.state;
            }
        }

        match self.state {
            ShrinkState::ActiveOptimalPath => {
                let (converged, mean_distance) = self.follow_path(chain, dt);
                if converged {
                    self.finish(solver, StopReason::PathReached);
                } else if self.stalled(mean_distance, PATH_PROGRESS_EPSILON) {
                    self.finish(solver, StopReason::Stuck);
                }
                return self.state;
            }
            ShrinkState::ActiveReduceLength => self.reduce_length(chain, dt),
            ShrinkState::ActiveRemoveSegments => self.remove_segments(chain, dt),
            ShrinkState::ActiveHybrid => {
                if chain.len() > HYBRID_REMOVE_ABOVE {
                    self.remove_segments(chain, dt);
                } else {
                    self.reduce_length(chain, dt);
                }
            }
            ShrinkState::ActiveSmartShrink => self.smart_shrink(chain, dt),
            _ => return self.state,
        }

        smooth(chain);
        if let Some(reason) = self.check_stop(chain) {
            self.finish(solver, reason);
        }
        self.state
    }

    fn activate(&mut self, chain: &SegmentChain, solver: &mut VerletSolver) {
        solver.pin_first_point = false;
        solver.shrinking = true;
        solver.centripetal_force = match self.config.strategy {
            ShrinkStrategy::OptimalPath => 0.0,
            _ => self.config.centripetal_force,
        };
        self.last_length = chain.total_length();
        self.stuck_frames = 0;
        self.removal_credit = 0.0;
        self.at_floor = false;
        self.stall_frames = 0;
        self.best_progress = match self.config.strategy {
            ShrinkStrategy::OptimalPath => f32::INFINITY,
            _ => self.last_length,
        };
        self.state = match self.config.strategy {
            ShrinkStrategy::ReduceLength => ShrinkState::ActiveReduceLength,
            ShrinkStrategy::RemoveSegments => ShrinkState::ActiveRemoveSegments,
            ShrinkStrategy::Hybrid => ShrinkState::ActiveHybrid,
            ShrinkStrategy::SmartShrink => ShrinkState::ActiveSmartShrink,
            ShrinkStrategy::OptimalPath => ShrinkState::ActiveOptimalPath,
        };
        debug!("shrinking started: {:?}", self.state);

        if self.state == ShrinkState::ActiveOptimalPath && self.target_path.is_empty() {
            warn!("no target path for a {}-segment rope; freezing it as drawn", chain.len());
            self.finish(solver, StopReason::NoTargetPath);
        }
    }

    fn finish(&mut self, solver: &mut VerletSolver, reason: StopReason) {
        solver.centripetal_force = 0.0;
        solver.shrinking = false;
        solver.enabled = false;
        self.state = ShrinkState::Finished;
        self.stop_reason = Some(reason);
        debug!("shrinking finished: {:?}", reason);
    }

    fn reduce_length(&mut self, chain: &mut SegmentChain, dt: f32) {
        let shorter = chain.rest_length - self.config.shrink_rate * dt;
        self.set_rest_length(chain, shorter);
    }

    fn set_rest_length(&mut self, chain: &mut SegmentChain, length: f32) {
        if length <= self.config.min_segment_length {
            self.at_floor = true;
        }
        chain.rest_length = length.max(self.config.min_segment_length);
    }

    fn remove_segments(&mut self, chain: &mut SegmentChain, dt: f32) {
        self.removal_credit += self.config.shrink_rate * REMOVAL_RATE_SCALE * dt;
        if self.removal_credit < 1.0 {
            return;
        }
        let max_skip = MAX_SKIP_FACTOR * chain.rest_length;
        match least_useful_segment(chain, max_skip) {
            Some(index) => {
                chain.remove(index);
                self.removal_credit -= 1.0;
            }
            None => {
                self.removal_credit = 1.0;
                self.at_floor = true;
            }
        }
    }

    fn smart_shrink(&mut self, chain: &mut SegmentChain, dt: f32) {
        let average = chain.average_distance();
        if chain.len() > SMART_REMOVE_ABOVE && average < SMART_SPACING_FACTOR * chain.rest_length {
            let max_skip = MAX_SKIP_FACTOR * chain.rest_length;
            match least_useful_segment(chain, max_skip) {
                Some(index) => {
                    chain.remove(index);
                }
                None => self.at_floor = true,
            }
        } else {
            let target = average * (1.0 - self.config.shrink_rate * dt);
            self.set_rest_length(chain, target);
        }
    }

    /// Shared stop test for the length and segment strategies.
    fn check_stop(&mut self, chain: &SegmentChain) -> Option<StopReason> {
        let length = chain.total_length();
        if (length - self.last_length).abs() <= STUCK_LENGTH_EPSILON {
            self.stuck_frames += 1;
        } else {
            self.stuck_frames = 0;
        }
        self.last_length = length;

        if self.stuck_frames >= self.config.stuck_frame_threshold {
            return Some(StopReason::Stuck);
        }
        if has_fold(chain, self.config.tension_threshold) {
            return Some(StopReason::Tension);
        }
        if has_close_neighbours(chain, self.config.min_allowable_distance) {
            return Some(StopReason::SegmentsTooClose);
        }
        if chain.rest_length <= self.config.min_segment_length && chain.len() <= MIN_SEGMENTS {
            return Some(StopReason::MinimumReached);
        }
        // A rope at its floor that jitters without getting any shorter.
        if self.at_floor && self.stalled(length, STUCK_LENGTH_EPSILON) {
            return Some(StopReason::MinimumReached);
        }
        None
    }

    /// Track the best `value` seen so far. `true` once it has not improved
    /// by more than `epsilon` for `stuck_frame_threshold` steps.
    fn stalled(&mut self, value: f32, epsilon: f32) -> bool {
        if value < self.best_progress - epsilon {
            self.best_progress = value;
            self.stall_frames = 0;
        } else {
            self.stall_frames = self.stall_frames.saturating_add(1);
        }
        self.stall_frames >= self.config.stuck_frame_threshold
    }

    /// Resample the chain and pull every segment toward its slot on the
    /// target path. Returns whether all segments are within tolerance, and
    /// the mean remaining distance to the slots.
    fn follow_path(&mut self, chain: &mut SegmentChain, dt: f32) -> (bool, f32) {
        let path_len = self.target_path.len();
        if path_len == 0 || chain.is_empty() {
            return (true, 0.0);
        }

        let target_count = (path_len / 2).clamp(PATH_MIN_SEGMENTS, PATH_MAX_SEGMENTS);
        resample(chain, target_count);
        chain.rest_length = (self.target_path.perimeter() / chain.len() as f32).max(EPSILON);

        let max_step = self.config.path_transition_speed * dt;
        let count = chain.len();
        let mut converged = true;
        let mut total_distance = 0.0;
        for (i, segment) in chain.segments.iter_mut().enumerate() {
            let slot = (i as f32 / count as f32 * path_len as f32).round() as usize;
            let target = self.target_path.get(slot);

            let to_target = target - segment.position;
            let remaining = to_target.length();
            if remaining > EPSILON {
                let dir = to_target / remaining;
                let step = max_step.min(remaining);
                segment.position += dir * step;
                segment.previous_position = segment.position - dir * step * PATH_RESIDUAL_VELOCITY;
            }
            let distance = segment.position.distance(target);
            total_distance += distance;
            if distance > self.config.path_tolerance {
                converged = false;
            }
        }
        (converged, total_distance / count as f32)
    }
}

/// Interior segment whose removal straightens the chain the most.
///
/// `efficiency = (|p[i-1] p[i]| + |p[i] p[i+1]|) / |p[i-1] p[i+1]|`; only
/// candidates whose skip distance is below `max_skip` qualify. `None` when
/// the chain is already at [`MIN_SEGMENTS`] or nothing qualifies.
pub fn least_useful_segment(chain: &SegmentChain, max_skip: f32) -> Option<usize> {
    let n = chain.len();
    if n <= MIN_SEGMENTS {
        return None;
    }
    let p = &chain.segments;
    let mut best: Option<(usize, f32)> = None;
    for i in 1..n - 1 {
        let prev = p[i - 1].position;
        let cur = p[i].position;
        let next = p[i + 1].position;
        let skip = prev.distance(next);
        if skip >= max_skip {
            continue;
        }
        let efficiency = (prev.distance(cur) + cur.distance(next)) / skip.max(EPSILON);
        if best.map_or(true, |(_, e)| efficiency > e) {
            best = Some((i, efficiency));
        }
    }
    best.map(|(i, _)| i)
}

/// Grow or thin the chain to `target` segments.
///
/// Growth splits the longest edge at its midpoint; thinning removes the
/// least useful segment, relaxing the skip limit when nothing qualifies.
fn resample(chain: &mut SegmentChain, target: usize) {
    while chain.len() < target && chain.len() >= 2 {
        let Some((edge, _)) = (0..chain.edge_count())
            .map(|e| {
                let (a, b) = chain.edge(e);
                (e, chain.segments[a].position.distance_squared(chain.segments[b].position))
            })
            .max_by(|x, y| x.1.total_cmp(&y.1))
        else {
            break;
        };
        let (a, b) = chain.edge(edge);
        let mid = (chain.segments[a].position + chain.segments[b].position) * 0.5;
        chain.insert(a + 1, mid);
    }

    while chain.len() > target {
        let limit = MAX_SKIP_FACTOR * chain.rest_length;
        let index = match least_useful_segment(chain, limit) {
            Some(index) => Some(index),
            None => least_useful_segment(chain, f32::INFINITY),
        };
        let Some(index) = index else {
            break;
        };
        chain.remove(index);
    }
}

/// Indices with two neighbours, paired with those neighbours. On a closed
/// chain every segment qualifies and the seam wraps around.
fn interior(chain: &SegmentChain) -> impl Iterator<Item = (usize, usize, usize)> {
    let n = chain.len();
    let range = match n {
        0..=2 => 0..0,
        _ if chain.closed => 0..n,
        _ => 1..n - 1,
    };
    range.map(move |i| ((i + n - 1) % n, i, (i + 1) % n))
}

/// Blend each interior segment halfway toward `(prev + 2 cur + next) / 4`
/// unless it deviates by `0.3 * rest_length` or more. The previous position
/// moves along so smoothing does not inject velocity.
fn smooth(chain: &mut SegmentChain) {
    let limit = SMOOTHING_LIMIT_FACTOR * chain.rest_length;
    let vertices: Vec<_> = interior(chain).collect();
    for (prev, i, next) in vertices {
        let prev = chain.segments[prev].position;
        let next = chain.segments[next].position;
        let segment = &mut chain.segments[i];
        let average = (prev + segment.position * 2.0 + next) * 0.25;
        if average.distance(segment.position) < limit {
            let shift = (average - segment.position) * 0.5;
            segment.position += shift;
            segment.previous_position += shift;
        }
    }
}

/// Any interior vertex whose neighbour directions point the same way.
fn has_fold(chain: &SegmentChain, threshold: f32) -> bool {
    let p = &chain.segments;
    interior(chain).any(|(prev, i, next)| {
        let to_prev = (p[prev].position - p[i].position).normalize_or_zero();
        let to_next = (p[next].position - p[i].position).normalize_or_zero();
        to_prev.dot(to_next) > threshold
    })
}

fn has_close_neighbours(chain: &SegmentChain, min_distance: f32) -> bool {
    (0..chain.edge_count()).any(|e| {
        let (a, b) = chain.edge(e);
        chain.segments[a].position.distance(chain.segments[b].position) < min_distance
    })
}
