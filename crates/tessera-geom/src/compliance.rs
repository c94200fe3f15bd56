//! Tiling assertions shared by the geometry test modules.

use crate::rect::{tiles, Rectangle};
use crate::scalar::Scalar;

/// Assert that no two rectangles in `pieces` overlap.
pub fn assert_pairwise_disjoint<T: Scalar>(pieces: &[Rectangle<T>]) {
    for (i, a) in pieces.iter().enumerate() {
        for b in &pieces[i + 1..] {
            assert!(
                !a.intersects(b).unwrap(),
                "pieces {a} and {b} overlap"
            );
        }
    }
}

/// Assert that `pieces` exactly tile `parent`.
pub fn assert_exact_tiling<T: Scalar>(parent: &Rectangle<T>, pieces: &[Rectangle<T>]) {
    assert_pairwise_disjoint(pieces);
    assert!(
        tiles(parent, pieces).unwrap(),
        "pieces {pieces:?} do not tile {parent}"
    );
}
