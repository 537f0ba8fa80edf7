//! Property tests for the rank topology.

use proptest::prelude::*;

use flowstep::topology::{Direction, RankGrid, NUM_DIRECTIONS};

proptest! {
    /// Edge existence is exactly the rank-grid boundary test.
    #[test]
    fn edge_neighbors_match_boundary(nx in 1usize..=6, ny in 1usize..=6, seed in 0usize..1000) {
        let grid = RankGrid::planar(nx, ny);
        let rank = seed % grid.len();
        let map = grid.neighbors_of(rank).unwrap();
        prop_assert_eq!(map.has(Direction::Left), rank % nx != 0);
        prop_assert_eq!(map.has(Direction::Right), rank % nx != nx - 1);
        prop_assert_eq!(map.has(Direction::Bottom), rank / nx != 0);
        prop_assert_eq!(map.has(Direction::Top), rank / nx != ny - 1);
    }

    /// A diagonal neighbor exists iff both of its orthogonal components
    /// do.
    #[test]
    fn diagonals_are_conjunctions(nx in 1usize..=6, ny in 1usize..=6, seed in 0usize..1000) {
        let grid = RankGrid::planar(nx, ny);
        let rank = seed % grid.len();
        let map = grid.neighbors_of(rank).unwrap();
        for corner in Direction::CORNERS {
            let (a, b) = corner.components();
            prop_assert_eq!(map.has(corner), map.has(a) && map.has(b));
        }
    }

    /// Addressing is mutual under mirroring, and the mirror index law
    /// holds.
    #[test]
    fn addresses_are_mutual(nx in 1usize..=6, ny in 1usize..=6, seed in 0usize..1000) {
        let grid = RankGrid::planar(nx, ny);
        let rank = seed % grid.len();
        for dir in Direction::ALL {
            prop_assert_eq!(dir.mirror().index(), NUM_DIRECTIONS - dir.index() - 1);
            if let Some(nbr) = grid.address_of(rank, dir).unwrap() {
                prop_assert_eq!(grid.address_of(nbr, dir.mirror()).unwrap(), Some(rank));
            }
        }
    }
}

#[test]
fn layered_grids_keep_the_id_formula() {
    let grid = RankGrid::layered(3, 4, 2);
    for rank in 0..grid.len() {
        let c = grid.coords_of(rank).unwrap();
        assert_eq!(rank, c.idz * 12 + c.idy * 3 + c.idx);
    }
}
