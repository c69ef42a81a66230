use crate::segment::SegmentChain;

/// One Gauss-Seidel relaxation pass over every neighbour pair.
///
/// For each pair (a, b):
/// 1. `delta = p_a - p_b`, `diff = |delta| - rest_length`
/// 2. both ends move by half the correction along `delta`
/// 3. with `pin_first` any pair touching segment 0 moves only the other end,
///    by the full correction
///
/// Coincident pairs are left as they are. A closed chain also relaxes the
/// (last, first) pair.
pub fn apply_constraints(chain: &mut SegmentChain, pin_first: bool) {
    let rest_length = chain.rest_length;
    for edge in 0..chain.edge_count() {
        let (a, b) = chain.edge(edge);
        let pos_a = chain.segments[a].position;
        let pos_b = chain.segments[b].position;

        let delta = pos_a - pos_b;
        let dist = delta.length();
        if dist <= 0.0 {
            continue;
        }
        let diff = dist - rest_length;
        let dir = delta / dist;

        if pin_first && a == 0 {
            chain.segments[b].position += dir * diff;
        } else if pin_first && b == 0 {
            // closing pair (last, first)
            chain.segments[a].position -= dir * diff;
        } else {
            let correction = dir * diff * 0.5;
            chain.segments[a].position -= correction;
            chain.segments[b].position += correction;
        }
    }
}

/// Sum over neighbour pairs of `| |p_a - p_b| - rest_length |`.
pub fn constraint_error(chain: &SegmentChain) -> f32 {
    (0..chain.edge_count())
        .map(|edge| {
            let (a, b) = chain.edge(edge);
            let dist = chain.segments[a].position.distance(chain.segments[b].position);
            (dist - chain.rest_length).abs()
        })
        .sum()
}
