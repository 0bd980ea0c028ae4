//! End-to-end color tracking through union and split passes.

use color_slicer::{scale, ColorId, ColorJob, MetaHandle, RegionKind, ZPath};
use std::collections::HashMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mm(points: &[(f64, f64)]) -> Vec<(i64, i64)> {
    points.iter().map(|&(x, y)| (scale(x), scale(y))).collect()
}

/// Triangles (0,0)-(4,0)-(2,2) and (2,0)-(6,0)-(4,2), in micrometres.
fn two_triangles(job: &mut ColorJob) -> (ZPath, ZPath, ColorId, ColorId, ColorId) {
    let red = job.intern(1.0, 0.0, 0.0);
    let green = job.intern(0.0, 1.0, 0.0);
    let blue = job.intern(0.0, 0.0, 1.0);
    let left = job.colored_path(&[(0, 0), (4000, 0), (2000, 2000)], red);
    let mut right = job.colored_path(&[(2000, 0), (6000, 0), (4000, 2000)], blue);
    // Edge (4000,2000) -> (2000,0) is green
    right[0].z = job.color_z(green);
    (left, right, red, green, blue)
}

#[test]
fn test_two_triangle_seam_takes_arriving_edge_color() {
    init_logging();
    let mut job = ColorJob::new();
    let (left, right, red, green, blue) = two_triangles(&mut job);

    let merged = job.union(&vec![left], &vec![right]);
    assert_eq!(merged.len(), 1);
    let contour = &merged[0].contour;
    let colors: HashMap<(i64, i64), ColorId> = contour
        .iter()
        .zip(job.resolve_colors(contour))
        .map(|(p, c)| ((p.x, p.y), c.expect("every merged vertex keeps a color")))
        .collect();

    assert_eq!(colors[&(3000, 1000)], green);
    assert_eq!(colors[&(2000, 2000)], red);
    assert_eq!(colors[&(4000, 2000)], blue);
    assert_eq!(colors[&(6000, 0)], blue);
    assert_eq!(colors[&(0, 0)], red);
}

#[test]
fn test_two_triangle_union_keeps_extents_in_step() {
    init_logging();
    let mut job = ColorJob::new();
    let (left, right, _, green, _) = two_triangles(&mut job);
    let mut subject = vec![left];
    let mut clip = vec![right];
    job.attach_extents(&mut subject).unwrap();
    job.attach_extents(&mut clip).unwrap();

    let merged = job.union(&subject, &clip);
    assert_eq!(merged.len(), 1);
    let contour = &merged[0].contour;
    let n = contour.len();
    for i in 0..n {
        let prev = contour[(i + n - 1) % n].point();
        let curr = contour[i].point();
        let MetaHandle::Extents(id) = job.handle(contour[i].z) else {
            panic!("vertex {curr:?} lost its extents");
        };
        let list = job.extents().get(id);
        let edge = list.axis().measure(prev, curr);
        assert!(
            (list.total_length() - edge).abs() <= 2,
            "extents {} on edge {:?}->{:?} of length {}",
            list,
            prev,
            curr,
            edge
        );
        if curr == color_slicer::Point::new(3000, 1000) {
            assert_eq!(list.last_color(), Some(green));
        }
    }
    assert_eq!(job.diagnostics().length_mismatches, 0);
}

/// Two 10mm squares joined by a 6mm bar 1mm thick.
fn dumbbell(job: &mut ColorJob, bar_bottom: ColorId, bar_top: ColorId) -> ZPath {
    let left = job.intern(1.0, 0.0, 0.0);
    let right = job.intern(0.0, 0.0, 1.0);
    let mut path = job.colored_path(
        &mm(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.5),
            (16.0, 4.5),
            (16.0, 0.0),
            (26.0, 0.0),
            (26.0, 10.0),
            (16.0, 10.0),
            (16.0, 5.5),
            (10.0, 5.5),
            (10.0, 10.0),
            (0.0, 10.0),
        ]),
        left,
    );
    for i in 4..=8 {
        path[i].z = job.color_z(right);
    }
    path[3].z = job.color_z(bar_bottom);
    path[9].z = job.color_z(bar_top);
    path
}

#[test]
fn test_dumbbell_bar_is_unoptimized_when_mixed() {
    init_logging();
    let mut job = ColorJob::new();
    let green = job.intern(0.0, 1.0, 0.0);
    let yellow = job.intern(1.0, 1.0, 0.0);
    let shape = dumbbell(&mut job, green, yellow);

    let regions = job.split_into_colors(&vec![shape], scale(1.0)).unwrap();
    let total: f64 = regions.iter().map(|r| r.area()).sum();
    assert!((total - 206.0).abs() < 1e-3, "regions cover {total}");

    assert_eq!(regions.iter().filter(|r| r.kind.is_infill()).count(), 2);
    let unoptimized: Vec<_> = regions.iter().filter(|r| r.kind.is_unoptimized()).collect();
    assert!(!unoptimized.is_empty());
    for region in &unoptimized {
        assert_eq!(region.color, job.placeholder());
    }
    // The bar is 6mm², all of it left over
    let leftover: f64 = unoptimized.iter().map(|r| r.area()).sum();
    assert!(leftover >= 6.0 - 1e-3);
}

#[test]
fn test_single_color_dumbbell_is_fully_resolved() {
    init_logging();
    let mut job = ColorJob::new();
    let red = job.intern(1.0, 0.0, 0.0);
    let mut shape = dumbbell(&mut job, red, red);
    let red_z = job.color_z(red);
    for p in shape.iter_mut() {
        p.z = red_z;
    }

    let regions = job.split_into_colors(&vec![shape], scale(1.0)).unwrap();
    let total: f64 = regions.iter().map(|r| r.area()).sum();
    assert!((total - 206.0).abs() < 1e-3);
    assert!(regions.iter().all(|r| r.kind != RegionKind::Unoptimized));
    assert!(regions
        .iter()
        .filter(|r| r.kind.is_border())
        .all(|r| r.color == red));
}

#[test]
fn test_jobs_run_independently() {
    init_logging();
    let mut first = ColorJob::new();
    let mut second = ColorJob::new();
    let a = first.intern(1.0, 0.0, 0.0);
    let b = second.intern(1.0, 0.0, 0.0);
    let s = scale(10.0);
    let square_a = first.colored_path(&[(0, 0), (s, 0), (s, s), (0, s)], a);
    let square_b = second.colored_path(&[(0, 0), (s, 0), (s, s), (0, s)], b);

    let ra = first.split_into_colors(&vec![square_a], scale(1.0)).unwrap();
    let rb = second.split_into_colors(&vec![square_b], scale(1.0)).unwrap();
    assert_eq!(ra.len(), rb.len());
    assert!(ra.iter().filter(|r| r.kind.is_border()).all(|r| r.color == a));
    assert!(rb.iter().filter(|r| r.kind.is_border()).all(|r| r.color == b));
}

#[test]
#[should_panic(expected = "belongs to job")]
fn test_foreign_handles_are_rejected() {
    let mut first = ColorJob::new();
    let mut second = ColorJob::new();
    let red = first.intern(1.0, 0.0, 0.0);
    let s = scale(10.0);
    let square = first.colored_path(&[(0, 0), (s, 0), (s, s), (0, s)], red);
    let _ = second.split_into_colors(&vec![square], scale(1.0));
}

#[test]
fn test_split_many_vertex_circle() {
    init_logging();
    let mut job = ColorJob::new();
    let red = job.intern(1.0, 0.0, 0.0);
    let blue = job.intern(0.0, 0.0, 1.0);
    let n = 3000;
    let radius = 20.0;
    let points: Vec<(i64, i64)> = (0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            (scale(radius * t.cos()), scale(radius * t.sin()))
        })
        .collect();
    // Upper half red, lower half blue
    let mut circle = job.colored_path(&points, red);
    let blue_z = job.color_z(blue);
    for p in circle.iter_mut().filter(|p| p.y <= 0) {
        p.z = blue_z;
    }
    let expected = color_slicer::clipper::path_area(&circle) / 1e12;

    let regions = job.split_into_colors(&vec![circle], scale(1.0)).unwrap();
    let total: f64 = regions.iter().map(|r| r.area()).sum();
    assert!((total - expected).abs() < 1e-2, "regions cover {total} of {expected}");
    assert_eq!(regions.iter().filter(|r| r.kind.is_infill()).count(), 1);

    let borders: Vec<_> = regions.iter().filter(|r| r.kind.is_border()).collect();
    assert!(borders.len() >= n / 2);
    let half = scale(0.5);
    for region in borders {
        let ys = || region.paths.iter().flatten().map(|p| p.y);
        if ys().all(|y| y > half) {
            assert_eq!(region.color, red);
        } else if ys().all(|y| y < -half) {
            assert_eq!(region.color, blue);
        }
    }
}
