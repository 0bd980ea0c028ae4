use color_slicer::{
    Axis, ColorCache, ColorExtents, ColorId, ExtentsArena, ExtentsId, JobId, Point,
};
use proptest::prelude::*;

fn palette() -> Vec<ColorId> {
    let mut cache = ColorCache::new(JobId::next());
    vec![
        cache.intern(1.0, 0.0, 0.0),
        cache.intern(0.0, 1.0, 0.0),
        cache.intern(0.0, 0.0, 1.0),
    ]
}

fn build(runs: &[(usize, i64)], colors: &[ColorId]) -> ColorExtents {
    let total: i64 = runs.iter().map(|r| r.1).sum();
    let mut list = ColorExtents::for_edge(Point::new(0, 0), Point::new(total, 0));
    for &(c, length) in runs {
        list.push(colors[c], length);
    }
    list
}

fn runs_strategy() -> impl Strategy<Value = Vec<(usize, i64)>> {
    prop::collection::vec((0usize..3, 1i64..1000), 1..12)
}

fn run_sum(list: &ColorExtents) -> i64 {
    list.iter().map(|e| e.length).sum()
}

/// One step of a random arena workload.
#[derive(Debug, Clone)]
enum Op {
    /// Re-measure a list along the other axis, keeping its length.
    Remeasure(prop::sample::Index),
    /// Split a fraction off the front of a list into a new list.
    Transfer(prop::sample::Index, f64),
    /// Move one list onto the end of another.
    Append(prop::sample::Index, prop::sample::Index),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<prop::sample::Index>().prop_map(Op::Remeasure),
        (any::<prop::sample::Index>(), 0.0f64..=1.0).prop_map(|(i, f)| Op::Transfer(i, f)),
        (any::<prop::sample::Index>(), any::<prop::sample::Index>())
            .prop_map(|(i, j)| Op::Append(i, j)),
    ]
}

/// Rescale `id` onto an edge of the same length along `axis`.
fn remeasure(arena: &mut ExtentsArena, id: ExtentsId, axis: Axis) {
    let len = arena.length(id);
    let end = match axis {
        Axis::X => Point::new(len, 0),
        Axis::Y => Point::new(0, len),
    };
    arena.resize(id, Point::new(0, 0), end);
}

proptest! {
    #[test]
    fn resize_hits_new_length_exactly(runs in runs_strategy(), new_len in 1i64..100_000) {
        let colors = palette();
        let mut list = build(&runs, &colors);
        list.resize(Point::new(0, 0), Point::new(new_len, 0));

        prop_assert_eq!(list.total_length(), new_len);
        prop_assert_eq!(run_sum(&list), new_len);
        prop_assert!(list.iter().all(|e| e.length > 0));
    }

    #[test]
    fn resize_preserves_color_order(runs in runs_strategy(), new_len in 1i64..100_000) {
        let colors = palette();
        let original = build(&runs, &colors);
        let mut list = original.clone();
        list.resize(Point::new(0, 0), Point::new(0, new_len));

        // Rescaled runs appear in their original order, some possibly dropped
        let before: Vec<ColorId> = original.iter().map(|e| e.color).collect();
        let mut cursor = before.iter();
        for e in &list {
            prop_assert!(cursor.any(|&c| c == e.color));
        }
    }

    #[test]
    fn transfer_front_conserves_length(runs in runs_strategy(), frac in 0.0f64..=1.0) {
        let colors = palette();
        let original = build(&runs, &colors);
        let total = original.total_length();
        let distance = ((total as f64 * frac) as i64).clamp(0, total);

        let mut list = original.clone();
        let mut front = list.empty_like();
        list.transfer_front(distance, &mut front);

        prop_assert_eq!(front.total_length(), distance);
        prop_assert_eq!(list.total_length(), total - distance);
        prop_assert_eq!(run_sum(&front), distance);
        prop_assert_eq!(run_sum(&list), total - distance);

        for t in 0..total {
            let split = if t < distance {
                front.color_at(t)
            } else {
                list.color_at(t - distance)
            };
            prop_assert_eq!(split, original.color_at(t));
        }
    }

    #[test]
    fn transfer_then_prepend_restores_list(runs in runs_strategy(), frac in 0.0f64..=1.0) {
        let colors = palette();
        let original = build(&runs, &colors);
        let distance = (original.total_length() as f64 * frac) as i64;

        let mut list = original.clone();
        let mut front = list.empty_like();
        list.transfer_front(distance, &mut front);
        list.prepend(&mut front);

        prop_assert_eq!(list.total_length(), original.total_length());
        prop_assert_eq!(front.total_length(), 0);
        for t in 0..original.total_length() {
            prop_assert_eq!(list.color_at(t), original.color_at(t));
        }
    }

    #[test]
    fn append_sums_totals(a in runs_strategy(), b in runs_strategy()) {
        let colors = palette();
        let mut first = build(&a, &colors);
        let mut second = build(&b, &colors);
        let expected = first.total_length() + second.total_length();
        first.append(&mut second);

        prop_assert_eq!(first.total_length(), expected);
        prop_assert_eq!(run_sum(&first), expected);
        prop_assert!(second.is_empty());
    }

    #[test]
    fn reverse_twice_is_identity(runs in runs_strategy()) {
        let colors = palette();
        let original = build(&runs, &colors);
        let mut list = original.clone();
        list.reverse();
        prop_assert_eq!(list.total_length(), original.total_length());
        list.reverse();
        prop_assert_eq!(list, original);
    }

    #[test]
    fn operation_sequences_conserve_length(
        runs in runs_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let job = JobId::next();
        let mut cache = ColorCache::new(job);
        let colors = vec![
            cache.intern(1.0, 0.0, 0.0),
            cache.intern(0.0, 0.0, 1.0),
            cache.intern(0.0, 1.0, 0.0),
        ];
        let mut arena = ExtentsArena::new(job);
        let first = arena.insert(build(&runs, &colors));
        let total = arena.length(first);
        let mut ids = vec![first];

        for op in ops {
            match op {
                Op::Remeasure(i) => {
                    let id = ids[i.index(ids.len())];
                    if arena.get(id).is_empty() {
                        continue;
                    }
                    let flipped = match arena.get(id).axis() {
                        Axis::X => Axis::Y,
                        Axis::Y => Axis::X,
                    };
                    remeasure(&mut arena, id, flipped);
                }
                Op::Transfer(i, frac) => {
                    let id = ids[i.index(ids.len())];
                    let len = arena.length(id);
                    let distance = ((len as f64 * frac) as i64).clamp(0, len);
                    let front = arena.empty_like(id);
                    arena.transfer_front(id, distance, front);
                    ids.push(front);
                }
                Op::Append(i, j) => {
                    let id = ids[i.index(ids.len())];
                    let other = ids[j.index(ids.len())];
                    if id == other {
                        continue;
                    }
                    let axis = arena.get(id).axis();
                    if arena.get(other).axis() != axis {
                        if arena.get(other).is_empty() {
                            continue;
                        }
                        remeasure(&mut arena, other, axis);
                    }
                    arena.append(id, other);
                    prop_assert_eq!(arena.length(other), 0);
                }
            }

            let lengths: i64 = ids.iter().map(|&id| arena.length(id)).sum();
            let runs: i64 = ids.iter().map(|&id| run_sum(arena.get(id))).sum();
            prop_assert_eq!(lengths, total);
            prop_assert_eq!(runs, total);
        }
    }
}
