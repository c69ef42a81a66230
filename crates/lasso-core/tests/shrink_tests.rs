use std::f32::consts::TAU;

use glam::Vec2;
use lasso_core::config::{PhysicsConfig, ShrinkConfig, ShrinkStrategy};
use lasso_core::obstacle::{Layers, Obstacle, ObstacleField};
use lasso_core::rope::{Rope, RopeId};
use lasso_core::segment::SegmentChain;
use lasso_core::shrink::{least_useful_segment, ShrinkController, ShrinkState, StopReason, MIN_SEGMENTS};
use lasso_core::solver::VerletSolver;

fn line(count: usize, spacing: f32, rest: f32) -> SegmentChain {
    let points: Vec<Vec2> = (0..count).map(|i| Vec2::new(i as f32 * spacing, 0.0)).collect();
    SegmentChain::from_points(&points, rest, false).unwrap()
}

fn ring(count: usize, radius: f32) -> SegmentChain {
    let points: Vec<Vec2> = (0..count)
        .map(|i| Vec2::from_angle(i as f32 / count as f32 * TAU) * radius)
        .collect();
    let rest = points[0].distance(points[1]);
    SegmentChain::from_points(&points, rest, true).unwrap()
}

fn armed(config: ShrinkConfig, chain: &SegmentChain) -> ShrinkController {
    let mut controller = ShrinkController::new(config);
    controller.initialize(chain, &ObstacleField::default());
    controller
}

#[test]
fn test_initialize_waits_for_delay() {
    let chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut chain_mut = chain.clone();
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::ReduceLength)
        .with_shrink_delay(0.5);
    let mut controller = ShrinkController::new(config);
    assert_eq!(controller.state(), ShrinkState::Idle);

    controller.initialize(&chain, &ObstacleField::default());
    assert_eq!(controller.state(), ShrinkState::WaitingToStart { elapsed: 0.0 });

    // 0.125, 0.25, 0.375 seconds elapsed: still waiting
    for _ in 0..3 {
        controller.step(&mut chain_mut, &mut solver, 0.125);
    }
    assert_eq!(controller.state(), ShrinkState::WaitingToStart { elapsed: 0.375 });
    assert!(!solver.shrinking);
    assert_eq!(chain_mut.rest_length, 1.0);

    // The step that reaches the delay activates and shrinks right away
    controller.step(&mut chain_mut, &mut solver, 0.125);
    assert_eq!(controller.state(), ShrinkState::ActiveReduceLength);
    assert!(solver.shrinking);
    assert!(chain_mut.rest_length < 1.0);
}

#[test]
fn test_step_before_initialize_does_nothing() {
    let mut chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = ShrinkController::new(ShrinkConfig::default().with_shrink_delay(0.0));

    controller.step(&mut chain, &mut solver, 0.1);

    assert_eq!(controller.state(), ShrinkState::Idle);
    assert_eq!(chain.rest_length, 1.0);
}

#[test]
fn test_reduce_length_follows_rate() {
    let mut chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::ReduceLength)
        .with_shrink_rate(1.0)
        .with_min_segment_length(0.1)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(u32::MAX);
    let mut controller = armed(config, &chain);

    let dt = 0.05;
    for step in 1..=30 {
        controller.step(&mut chain, &mut solver, dt);
        let t = step as f32 * dt;
        let expected = (1.0 - t).max(0.1);
        assert!(
            (chain.rest_length - expected).abs() < 1e-4,
            "t={} rest={} expected={}",
            t,
            chain.rest_length,
            expected
        );
    }
    assert_eq!(controller.state(), ShrinkState::ActiveReduceLength, "20 segments never hit the minimum");
}

#[test]
fn test_activation_unpins_and_sets_centripetal() {
    let mut chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default().with_pin_first_point(true));
    assert!(solver.pin_first_point);
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::SmartShrink)
        .with_shrink_delay(0.0);
    let mut controller = armed(config, &chain);

    controller.step(&mut chain, &mut solver, 0.01);

    assert!(!solver.pin_first_point);
    assert!(solver.shrinking);
    assert_eq!(solver.centripetal_force, 1.0);
}

#[test]
fn test_remove_segments_stops_at_minimum() {
    // Rest length far above spacing so every interior segment stays removable
    let mut chain = line(20, 1.0, 10.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::RemoveSegments)
        .with_shrink_rate(1.0)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(u32::MAX);
    let mut controller = armed(config, &chain);

    let mut previous = chain.len();
    for _ in 0..200 {
        controller.step(&mut chain, &mut solver, 0.1);
        assert!(chain.len() >= MIN_SEGMENTS, "chain thinned below minimum: {}", chain.len());
        assert!(chain.len() + 1 >= previous, "at most one removal per step");
        previous = chain.len();
    }
    assert_eq!(chain.len(), MIN_SEGMENTS);
    // Endpoints are never removed
    assert_eq!(chain.segments[0].position, Vec2::ZERO);
    assert_eq!(chain.segments[MIN_SEGMENTS - 1].position, Vec2::new(19.0, 0.0));
}

#[test]
fn test_stuck_detection_fires_on_threshold() {
    // Without a solver nothing moves, so total length never changes
    let mut chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::ReduceLength)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(5);
    let mut controller = armed(config, &chain);

    for step in 1..5 {
        controller.step(&mut chain, &mut solver, 0.01);
        assert_eq!(controller.state(), ShrinkState::ActiveReduceLength, "finished early at step {}", step);
    }
    controller.step(&mut chain, &mut solver, 0.01);

    assert!(controller.is_finished());
    assert_eq!(controller.stop_reason(), Some(StopReason::Stuck));
    assert!(!solver.enabled, "finished rope should be static");
    assert!(!solver.shrinking);
    assert_eq!(solver.centripetal_force, 0.0);
}

#[test]
fn test_close_neighbours_stop() {
    // Closed, with the last segment almost on top of the first. Wide spacing
    // keeps the seam bend too sharp for smoothing to pull them apart.
    let mut points: Vec<Vec2> = (0..19).map(|i| Vec2::new(i as f32 * 2.0, 0.0)).collect();
    points.push(Vec2::new(0.01, 0.0));
    let mut chain = SegmentChain::from_points(&points, 1.0, true).unwrap();
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::ReduceLength)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(u32::MAX);
    let mut controller = armed(config, &chain);

    controller.step(&mut chain, &mut solver, 0.01);

    assert_eq!(controller.stop_reason(), Some(StopReason::SegmentsTooClose));
}

#[test]
fn test_fold_stops_with_tension() {
    let mut chain = line(20, 1.0, 1.0);
    // Spike: segment 10 doubles back over segment 9
    chain.segments[10].position = Vec2::new(8.0, 0.3);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut config = ShrinkConfig::default()
        .with_strategy(ShrinkStrategy::ReduceLength)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(u32::MAX);
    config.tension_threshold = 0.5;
    let mut controller = armed(config, &chain);

    controller.step(&mut chain, &mut solver, 0.01);

    assert_eq!(controller.stop_reason(), Some(StopReason::Tension));
}

#[test]
fn test_least_useful_segment_picks_detour() {
    let mut chain = line(12, 1.0, 1.0);
    chain.segments[5].position = Vec2::new(5.0, 0.6);

    let index = least_useful_segment(&chain, 2.5);
    assert_eq!(index, Some(5), "the detour is the least useful segment");
}

#[test]
fn test_least_useful_segment_respects_skip_limit() {
    let chain = line(12, 1.0, 1.0);
    assert_eq!(least_useful_segment(&chain, 1.8), None, "skip of 2.0 exceeds the limit");
    assert!(least_useful_segment(&chain, 2.5).is_some());
    assert_eq!(least_useful_segment(&line(MIN_SEGMENTS, 0.1, 1.0), 10.0), None);
}

#[test]
fn test_optimal_path_without_obstacles_targets_circle() {
    let chain = ring(40, 3.0);
    let config = ShrinkConfig::default().with_shrink_delay(0.0);
    let controller = armed(config, &chain);

    let path = controller.target_path();
    assert_eq!(path.len(), 100);
    assert!((path.perimeter() - TAU * 3.0).abs() < 0.1);
}

#[test]
fn test_optimal_path_converges_on_obstacle() {
    let mut field = ObstacleField::default();
    field.insert(Obstacle::circle(Vec2::ZERO, 0.5, Layers::OBSTACLE));
    let config = ShrinkConfig::default().with_shrink_delay(0.0);
    let mut rope = Rope::new(RopeId(0), ring(40, 3.0), PhysicsConfig::default(), config, &field);

    let mut steps = 0;
    while !rope.is_static() && steps < 1200 {
        rope.step(&field, 1.0 / 60.0);
        steps += 1;
    }

    assert_eq!(rope.controller().stop_reason(), Some(StopReason::PathReached));
    assert_eq!(rope.state(), ShrinkState::Finished);
    for s in &rope.chain().segments {
        let d = s.position.length();
        assert!(d > 0.5 && d < 0.7, "segment should hug the obstacle, distance {}", d);
    }
    let len = rope.chain().len();
    assert!((8..=50).contains(&len), "resampled count out of range: {}", len);

    // Finished ropes stay put
    let frozen = rope.chain().positions();
    rope.step(&field, 1.0 / 60.0);
    assert_eq!(rope.chain().positions(), frozen);
}

#[test]
fn test_optimal_path_with_tiny_chain_finishes_immediately() {
    let chain = SegmentChain::from_points(&[Vec2::ZERO, Vec2::X], 1.0, true).unwrap();
    let mut chain_mut = chain.clone();
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = armed(ShrinkConfig::default().with_shrink_delay(0.0), &chain);

    controller.step(&mut chain_mut, &mut solver, 0.01);

    assert_eq!(controller.stop_reason(), Some(StopReason::NoTargetPath));
    assert_eq!(chain_mut.positions(), chain.positions(), "rope is frozen as drawn");
}

/// Line of 20 unit-spaced segments whose rest length keeps every interior
/// segment removable.
fn removable_line() -> SegmentChain {
    line(20, 1.0, 10.0)
}

fn no_stuck(strategy: ShrinkStrategy) -> ShrinkConfig {
    ShrinkConfig::default()
        .with_strategy(strategy)
        .with_shrink_rate(1.0)
        .with_shrink_delay(0.0)
        .with_stuck_frame_threshold(u32::MAX)
}

#[test]
fn test_removal_credit_paces_removals() {
    let mut chain = removable_line();
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = armed(no_stuck(ShrinkStrategy::RemoveSegments), &chain);

    // rate 1 at dt 0.01 earns 0.15 removals per step
    let mut removed_at = Vec::new();
    for step in 1..=14 {
        let before = chain.len();
        controller.step(&mut chain, &mut solver, 0.01);
        if chain.len() < before {
            removed_at.push(step);
        }
    }
    assert_eq!(removed_at, vec![7, 14]);
    assert_eq!(chain.len(), 18);
    assert_eq!(chain.rest_length, 10.0, "removal leaves the rest length alone");
}

#[test]
fn test_hybrid_removes_then_shortens() {
    let mut chain = removable_line();
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = armed(no_stuck(ShrinkStrategy::Hybrid), &chain);

    // Credit of 1.5 per step: one removal each step down to 15 segments
    for expected in (15..20).rev() {
        controller.step(&mut chain, &mut solver, 0.1);
        assert_eq!(chain.len(), expected);
        assert_eq!(chain.rest_length, 10.0);
    }
    assert_eq!(controller.state(), ShrinkState::ActiveHybrid);

    // At 15 segments it switches to shortening
    controller.step(&mut chain, &mut solver, 0.1);
    assert_eq!(chain.len(), 15);
    assert!((chain.rest_length - 9.9).abs() < 1e-4, "rest={}", chain.rest_length);
    controller.step(&mut chain, &mut solver, 0.1);
    assert_eq!(chain.len(), 15);
    assert!((chain.rest_length - 9.8).abs() < 1e-4, "rest={}", chain.rest_length);
}

#[test]
fn test_smart_shrink_removes_when_slack() {
    // Spacing 1 is far below 0.7 * rest, and 20 > 12 segments
    let mut chain = removable_line();
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = armed(no_stuck(ShrinkStrategy::SmartShrink), &chain);

    controller.step(&mut chain, &mut solver, 0.1);

    assert_eq!(chain.len(), 19, "one removal per step, no credit needed");
    assert_eq!(chain.rest_length, 10.0);
}

#[test]
fn test_smart_shrink_shortens_toward_average() {
    // Taut chain: spacing equals rest, so it shortens instead of removing
    let mut chain = line(20, 1.0, 1.0);
    let mut solver = VerletSolver::new(PhysicsConfig::default());
    let mut controller = armed(no_stuck(ShrinkStrategy::SmartShrink), &chain);

    controller.step(&mut chain, &mut solver, 0.1);

    assert_eq!(chain.len(), 20);
    assert!((chain.rest_length - 0.9).abs() < 1e-5, "rest={}", chain.rest_length);

    // Few segments: always shortens, even with slack
    let mut short = line(10, 1.0, 10.0);
    let mut controller = armed(no_stuck(ShrinkStrategy::SmartShrink), &short);
    controller.step(&mut short, &mut solver, 0.1);
    assert_eq!(short.len(), 10);
    assert!((short.rest_length - 0.9).abs() < 1e-5, "rest={}", short.rest_length);
}

#[test]
fn test_optimal_path_around_box_terminates() {
    // The wrapped circle cuts through the box corners, so the path is never
    // fully reached and the rope has to settle instead.
    let mut field = ObstacleField::default();
    field.insert(Obstacle::rect(Vec2::ZERO, Vec2::new(1.0, 1.0), Layers::OBSTACLE));
    let config = ShrinkConfig::default().with_shrink_delay(0.0);
    let mut rope = Rope::new(RopeId(0), ring(40, 4.0), PhysicsConfig::default(), config, &field);

    let mut steps = 0;
    while !rope.is_static() && steps < 3600 {
        rope.step(&field, 1.0 / 60.0);
        steps += 1;
    }

    assert_eq!(rope.state(), ShrinkState::Finished, "still shrinking after {} steps", steps);
    assert!(matches!(
        rope.controller().stop_reason(),
        Some(StopReason::Stuck) | Some(StopReason::PathReached)
    ));
    for s in &rope.chain().segments {
        assert!(s.position.is_finite());
        assert!(s.position.length() < 2.0, "rope should sit around the box: {:?}", s.position);
    }
}

#[test]
fn test_free_ring_terminates_for_every_strategy() {
    let field = ObstacleField::default();
    for strategy in [
        ShrinkStrategy::ReduceLength,
        ShrinkStrategy::RemoveSegments,
        ShrinkStrategy::Hybrid,
        ShrinkStrategy::SmartShrink,
    ] {
        let config = ShrinkConfig::default()
            .with_strategy(strategy)
            .with_shrink_rate(0.5)
            .with_shrink_delay(0.0);
        let mut rope = Rope::new(RopeId(0), ring(40, 4.0), PhysicsConfig::default(), config, &field);

        let mut steps = 0;
        while !rope.is_static() && steps < 7200 {
            rope.step(&field, 1.0 / 60.0);
            steps += 1;
        }

        assert_eq!(
            rope.state(),
            ShrinkState::Finished,
            "{:?} still active: len={} rest={}",
            strategy,
            rope.chain().len(),
            rope.chain().rest_length
        );
        assert!(rope.chain().segments.iter().all(|s| s.position.is_finite()));
    }
}
