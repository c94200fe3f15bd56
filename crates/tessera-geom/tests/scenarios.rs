use tessera_core::{Rank, RegionId};
use tessera_geom::{tiles, GeometryError, Point, Rectangle};

fn rect(ul: [i64; 2], br: [i64; 2]) -> Rectangle<i64> {
    Rectangle::new(Point::new(ul), Point::new(br)).unwrap()
}

#[test]
fn quadrant_split_of_square() {
    let r = rect([0, 0], [10, 10]);
    let quads = r.split(&[Point::new([5, 5])]).unwrap();
    assert_eq!(quads.len(), 4);
    assert!(quads.iter().all(|q| q.area() == 25));
    assert!(tiles(&r, &quads).unwrap());
}

#[test]
fn multi_point_split_builds_grid() {
    let r = rect([0, 0], [9, 9]);
    let pieces = r
        .split(&[Point::new([3, 3]), Point::new([6, 6])])
        .unwrap();
    assert_eq!(pieces.len(), 9);
    assert!(pieces.iter().all(|p| p.area() == 9));
    assert!(tiles(&r, &pieces).unwrap());
}

#[test]
fn toroidal_corner_wrap_area() {
    let bound = rect([0, 0], [10, 10]);
    let r = rect([8, 8], [15, 12]).with_owner(Rank(3));
    let pieces = r.to_toroidal(&bound).unwrap();
    assert!(pieces.contains(&rect([8, 8], [10, 10]).with_owner(Rank(3))));
    assert_eq!(pieces.iter().map(|p| p.area()).sum::<i64>(), 28);
    assert!(pieces.iter().all(|p| p.owner() == Some(Rank(3))));
}

#[test]
fn three_dimensional_split_yields_octants() {
    let r = Rectangle::new(Point::new([0i64, 0, 0]), Point::new([4, 4, 4])).unwrap();
    let octants = r.split(&[Point::new([2, 2, 2])]).unwrap();
    assert_eq!(octants.len(), 8);
    assert!(tiles(&r, &octants).unwrap());
}

#[test]
fn projection_drops_axis_and_keeps_tags() {
    let r = Rectangle::new(Point::new([1i64, 2, 3]), Point::new([4, 5, 6]))
        .unwrap()
        .with_id(RegionId(12));
    let xz = r.project(&[0, 2]).unwrap();
    assert_eq!(xz.dim(), 2);
    assert_eq!(xz.ul(), &Point::new([1, 3]));
    assert_eq!(xz.id(), Some(RegionId(12)));
}

#[test]
fn mixed_dimensions_fail_fast() {
    let a = rect([0, 0], [1, 1]);
    let b = Rectangle::new(Point::new([0i64]), Point::new([1])).unwrap();
    assert!(matches!(
        a.intersects(&b),
        Err(GeometryError::DimensionMismatch { expected: 2, found: 1 })
    ));
}

#[test]
fn real_valued_neighbour_search() {
    let cell = Rectangle::new(Point::new([0.0f64, 0.0]), Point::new([1.0, 1.0])).unwrap();
    let agent = Point::new([1.5f64, 0.5]);
    assert!(!cell.contains(&agent).unwrap());
    assert!((cell.distance_to(&agent).unwrap() - 0.5).abs() < 1e-12);
}
