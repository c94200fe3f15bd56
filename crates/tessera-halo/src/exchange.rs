//! Send/receive geometry of a halo exchange between two partitions.

use tessera_geom::{GeometryError, Point, Rectangle};

use crate::error::HaloError;
use crate::plan::HaloPlan;

/// The rectangles two neighbouring partitions trade each step.
///
/// Both lists are expressed in the local partition's frame, so both fit
/// inside [`storage_bound`](Self::storage_bound), the local region grown
/// by the ghost width. For a periodic world the neighbour is also
/// considered at each of its 3^N - 1 wrapped images.
///
/// Piece order is chosen so that the `i`-th send piece on one side is
/// the `i`-th receive piece on the other: sends walk image offsets in
/// ascending order, receives in descending order, and negating an offset
/// reverses that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaloExchange {
    storage_bound: Rectangle<i64>,
    send: Vec<Rectangle<i64>>,
    recv: Vec<Rectangle<i64>>,
}

impl HaloExchange {
    /// Compute the exchange between `local` and `neighbor`.
    ///
    /// - send: local interior cells inside the neighbour's ghost layer.
    /// - recv: local ghost cells that lie inside the neighbour.
    ///
    /// With `periodic_world`, the local partition must lie inside the
    /// world and the ghost width must be smaller than every world extent,
    /// else [`HaloError::GhostWidthTooLarge`].
    /// Passing the same rectangle as both sides in a periodic world yields
    /// the self-exchange of a partition that wraps onto itself; the
    /// unshifted image is skipped there.
    pub fn between(
        local: &Rectangle<i64>,
        neighbor: &Rectangle<i64>,
        ghost_width: i64,
        periodic_world: Option<&Rectangle<i64>>,
    ) -> Result<Self, HaloError> {
        if ghost_width < 0 {
            return Err(HaloError::NegativeGhostWidth { width: ghost_width });
        }
        let storage_bound = local.grow(ghost_width)?;
        let grown_neighbor = neighbor.grow(ghost_width)?;
        let offsets = image_offsets(local, ghost_width, periodic_world)?;
        let is_self = local.ul() == neighbor.ul() && local.br() == neighbor.br();

        let mut send = Vec::new();
        for offset in &offsets {
            if is_self && offset.iter().all(|c| c == 0) {
                continue;
            }
            let image = grown_neighbor.shift(offset)?;
            if local.intersects(&image)? {
                send.push(local.intersection(&image)?);
            }
        }

        let mut recv = Vec::new();
        for offset in offsets.iter().rev() {
            if is_self && offset.iter().all(|c| c == 0) {
                continue;
            }
            let image = neighbor.shift(offset)?;
            if storage_bound.intersects(&image)? {
                // Tags follow the owner of the data, the neighbour.
                recv.push(image.intersection(&storage_bound)?);
            }
        }

        Ok(Self {
            storage_bound,
            send,
            recv,
        })
    }

    /// Local storage region: the local partition plus its ghost layer.
    pub fn storage_bound(&self) -> &Rectangle<i64> {
        &self.storage_bound
    }

    /// Interior pieces to send, in wire order.
    pub fn send(&self) -> &[Rectangle<i64>] {
        &self.send
    }

    /// Ghost pieces to receive, in wire order.
    pub fn recv(&self) -> &[Rectangle<i64>] {
        &self.recv
    }

    /// `true` if the partitions share no halo cells.
    pub fn is_empty(&self) -> bool {
        self.send.is_empty() && self.recv.is_empty()
    }

    /// Build the send and receive plans against the storage bound.
    pub fn plans(&self, elem_size: usize) -> Result<(HaloPlan, HaloPlan), HaloError> {
        Ok((
            HaloPlan::build(&self.send, &self.storage_bound, elem_size)?,
            HaloPlan::build(&self.recv, &self.storage_bound, elem_size)?,
        ))
    }
}

/// Offsets in `{-p, 0, +p}^N` in ascending order (axis 0 fastest), or
/// just the zero offset without a periodic world.
fn image_offsets(
    local: &Rectangle<i64>,
    ghost_width: i64,
    periodic_world: Option<&Rectangle<i64>>,
) -> Result<Vec<Point<i64>>, HaloError> {
    let n = local.dim();
    let Some(world) = periodic_world else {
        return Ok(vec![Point::origin(n)]);
    };
    if !world.contains_rect(local)? {
        return Err(GeometryError::NotContained {
            what: format!("partition {local}"),
            region: world.to_string(),
        }
        .into());
    }
    // A wider layer would see the same neighbour cell through two images.
    if let Some(axis) = (0..n).find(|&a| ghost_width >= world.extent(a)) {
        return Err(HaloError::GhostWidthTooLarge {
            width: ghost_width,
            axis,
            extent: world.extent(axis),
        });
    }
    let count = 3usize.pow(n as u32);
    Ok((0..count)
        .map(|mut i| {
            Point::new((0..n).map(|a| {
                let digit = (i % 3) as i64 - 1;
                i /= 3;
                digit * world.extent(a)
            }))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HaloStorage;
    use proptest::prelude::*;
    use tessera_core::Rank;

    fn rect(ul: [i64; 2], br: [i64; 2]) -> Rectangle<i64> {
        Rectangle::new(Point::new(ul), Point::new(br)).unwrap()
    }

    fn area(rs: &[Rectangle<i64>]) -> i64 {
        rs.iter().map(Rectangle::area).sum()
    }

    #[test]
    fn side_by_side_partitions_trade_columns() {
        let left = rect([0, 0], [4, 4]);
        let right = rect([4, 0], [8, 4]).with_owner(Rank(1));
        let ex = HaloExchange::between(&left, &right, 1, None).unwrap();
        assert_eq!(ex.storage_bound(), &rect([-1, -1], [5, 5]));
        assert_eq!(ex.send(), &[rect([3, 0], [4, 4])]);
        assert_eq!(ex.recv(), &[rect([4, 0], [5, 4]).with_owner(Rank(1))]);
    }

    #[test]
    fn distant_partitions_share_nothing() {
        let a = rect([0, 0], [4, 4]);
        let b = rect([6, 0], [8, 4]);
        assert!(HaloExchange::between(&a, &b, 1, None).unwrap().is_empty());
    }

    #[test]
    fn periodic_world_wraps_across_the_seam() {
        let world = rect([0, 0], [10, 10]);
        let left = rect([0, 0], [5, 10]);
        let right = rect([5, 0], [10, 10]);
        let ex = HaloExchange::between(&left, &right, 1, Some(&world)).unwrap();
        // Shared face at x = 5, the wrapped face at x = 0, and the four
        // corner cells the neighbour's wrapped ghost rows reach.
        assert_eq!(area(ex.send()), 2 * 10 + 4);
        assert!(ex.send().contains(&rect([0, 0], [1, 10])));
        assert!(ex.send().contains(&rect([4, 0], [5, 10])));
        // Two ghost columns, wrapped corners included.
        assert_eq!(area(ex.recv()), 2 * 12);
    }

    #[test]
    fn single_partition_exchanges_with_itself() {
        let world = rect([0, 0], [10, 10]);
        let ex = HaloExchange::between(&world, &world, 1, Some(&world)).unwrap();
        assert_eq!(area(ex.send()), 12 * 12 - 100);
        assert_eq!(area(ex.recv()), 12 * 12 - 100);
        assert_eq!(ex.send().len(), 8);
    }

    #[test]
    fn negative_ghost_width_rejected() {
        let a = rect([0, 0], [2, 2]);
        assert_eq!(
            HaloExchange::between(&a, &a, -1, None),
            Err(HaloError::NegativeGhostWidth { width: -1 })
        );
    }

    #[test]
    fn ghost_layer_must_fit_inside_the_period() {
        let world = rect([0, 0], [8, 3]);
        let a = rect([0, 0], [4, 3]);
        let b = rect([4, 0], [8, 3]);
        assert_eq!(
            HaloExchange::between(&a, &b, 3, Some(&world)),
            Err(HaloError::GhostWidthTooLarge {
                width: 3,
                axis: 1,
                extent: 3
            })
        );
        assert!(HaloExchange::between(&a, &b, 2, Some(&world)).is_ok());
        // Without a period any width is fine.
        assert!(HaloExchange::between(&a, &b, 3, None).is_ok());
    }

    #[test]
    fn exchanged_bytes_land_in_matching_ghost_cells() {
        // Each cell stores its global x coordinate; after the exchange
        // every ghost cell must hold the x of the cell it mirrors.
        let world = rect([0, 0], [6, 2]);
        let a = rect([0, 0], [3, 2]);
        let b = rect([3, 0], [6, 2]);
        let a_to_b = HaloExchange::between(&a, &b, 1, Some(&world)).unwrap();
        let b_to_a = HaloExchange::between(&b, &a, 1, Some(&world)).unwrap();
        let (a_send, _) = a_to_b.plans(1).unwrap();
        let (_, b_recv) = b_to_a.plans(1).unwrap();

        let fill = |bound: &Rectangle<i64>, part: &Rectangle<i64>| -> Vec<u8> {
            let mut v = Vec::new();
            for y in bound.ul().coord(1)..bound.br().coord(1) {
                for x in bound.ul().coord(0)..bound.br().coord(0) {
                    let p = Point::new([x, y]);
                    v.push(if part.contains(&p).unwrap() { x as u8 } else { 0xff });
                }
            }
            v
        };
        let a_store = fill(a_to_b.storage_bound(), &a);
        let mut b_store = fill(b_to_a.storage_bound(), &b);

        let mut wire = Vec::new();
        a_store.pack(&a_send, &mut wire).unwrap();
        b_store.unpack(&b_recv, &wire).unwrap();

        // B's storage spans x in [2, 7): x = 2 mirrors A's column 2, x = 6
        // mirrors A's column 0 through the seam.
        let width = 5;
        for y in 0..4 {
            let row = &b_store[y * width..(y + 1) * width];
            // Rows 0 and 3 are B's own wrapped ghost rows, untouched here.
            let interior: &[u8] = if y == 0 || y == 3 { &[0xff; 3] } else { &[3, 4, 5] };
            assert_eq!(row[0], 2, "row {y}");
            assert_eq!(&row[1..4], interior, "row {y}");
            assert_eq!(row[4], 0, "row {y}");
        }
    }

    proptest! {
        #[test]
        fn send_and_recv_volumes_match(
            cut in 2i64..9, width in 0i64..2, periodic in any::<bool>(),
        ) {
            let world = rect([0, 0], [10, 10]);
            let a = rect([0, 0], [cut, 10]);
            let b = rect([cut, 0], [10, 10]);
            let w = periodic.then_some(&world);
            let ab = HaloExchange::between(&a, &b, width, w).unwrap();
            let ba = HaloExchange::between(&b, &a, width, w).unwrap();
            prop_assert_eq!(ab.send().len(), ba.recv().len());
            for (s, r) in ab.send().iter().zip(ba.recv()) {
                prop_assert_eq!(s.extents(), r.extents());
            }
            for s in ab.send() {
                prop_assert!(a.contains_rect(s).unwrap());
            }
            for r in ba.recv() {
                prop_assert!(ba.storage_bound().contains_rect(r).unwrap());
                prop_assert!(!b.intersects(r).unwrap());
            }
        }
    }
}
