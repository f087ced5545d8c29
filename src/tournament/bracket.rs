//! Single-elimination bracket construction.
//!
//! The bracket is an arena of nodes: leaves first in bracket order, then each
//! higher level, with the root last. Parents refer to children by index, which
//! keeps the tree free of shared ownership until it is persisted as matches.

use crate::database::models::{ChildSlot, MatchOutcome, PlayerId};

/// A registrant as the seeding step sees them.
#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    pub player_id: PlayerId,
    pub rating: Option<i32>,
    /// Lower means registered earlier.
    pub registration_order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketNode {
    pub a_player: Option<PlayerId>,
    pub b_player: Option<PlayerId>,
    pub level: usize,
    pub parent: Option<usize>,
    pub child_slot: Option<ChildSlot>,
}

impl BracketNode {
    fn empty(level: usize) -> Self {
        Self {
            a_player: None,
            b_player: None,
            level,
            parent: None,
            child_slot: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub fn bye_player(&self) -> Option<PlayerId> {
        match (self.a_player, self.b_player) {
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            _ => None,
        }
    }

    /// Bye leaves start resolved for the present player; everything else is pending.
    pub fn initial_outcome(&self) -> MatchOutcome {
        if !self.is_leaf() {
            return MatchOutcome::Pending;
        }
        match (self.a_player, self.b_player) {
            (Some(_), None) => MatchOutcome::AWin,
            (None, Some(_)) => MatchOutcome::BWin,
            _ => MatchOutcome::Pending,
        }
    }

    fn slot(&mut self, slot: ChildSlot) -> &mut Option<PlayerId> {
        match slot {
            ChildSlot::A => &mut self.a_player,
            ChildSlot::B => &mut self.b_player,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bracket {
    /// Leaf slot count, a power of two.
    pub size: usize,
    pub nodes: Vec<BracketNode>,
}

impl Bracket {
    pub fn leaves(&self) -> impl Iterator<Item = &BracketNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn root(&self) -> Option<&BracketNode> {
        self.nodes.iter().find(|n| n.parent.is_none())
    }

    pub fn bye_count(&self) -> usize {
        self.leaves().filter(|n| n.bye_player().is_some()).count()
    }

    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level + 1).max().unwrap_or(0)
    }
}

/// Bracket position order for `size` slots, 1-based seed numbers.
///
/// Each doubling interleaves every seed `p` with its mirror `size + 1 - p`,
/// so for 8 slots the order is 1, 8, 4, 5, 2, 7, 3, 6.
pub fn bracket_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    let mut n = 1;
    while n < size {
        n *= 2;
        positions = positions
            .into_iter()
            .flat_map(|p| [p, n + 1 - p])
            .collect();
    }
    positions
}

/// Seed order: rating descending (missing ratings count as `start_rating`),
/// earlier registration first on ties.
pub fn seed_order(entrants: &[Entrant], start_rating: i32) -> Vec<PlayerId> {
    let mut sorted: Vec<&Entrant> = entrants.iter().collect();
    sorted.sort_by(|a, b| {
        let ra = a.rating.unwrap_or(start_rating);
        let rb = b.rating.unwrap_or(start_rating);
        rb.cmp(&ra)
            .then(a.registration_order.cmp(&b.registration_order))
            .then(a.player_id.cmp(&b.player_id))
    });
    sorted.into_iter().map(|e| e.player_id).collect()
}

pub fn build_bracket(entrants: &[Entrant], start_rating: i32) -> Bracket {
    let seeds = seed_order(entrants, start_rating);
    if seeds.len() < 2 {
        return Bracket::default();
    }

    let size = seeds.len().next_power_of_two();
    let slots: Vec<Option<PlayerId>> = bracket_positions(size)
        .into_iter()
        .map(|seed| seeds.get(seed - 1).copied())
        .collect();

    let mut nodes: Vec<BracketNode> = Vec::with_capacity(size - 1);
    let mut level_nodes: Vec<usize> = Vec::with_capacity(size / 2);

    for pair in slots.chunks(2) {
        let mut leaf = BracketNode::empty(0);
        leaf.a_player = pair[0];
        leaf.b_player = pair[1];
        level_nodes.push(nodes.len());
        nodes.push(leaf);
    }

    let mut level = 0;
    while level_nodes.len() > 1 {
        level += 1;
        let mut next_level = Vec::with_capacity(level_nodes.len() / 2);
        for children in level_nodes.chunks(2) {
            let parent_idx = nodes.len();
            nodes.push(BracketNode::empty(level));
            for (child_idx, slot) in children.iter().zip([ChildSlot::A, ChildSlot::B]) {
                nodes[*child_idx].parent = Some(parent_idx);
                nodes[*child_idx].child_slot = Some(slot);
            }
            next_level.push(parent_idx);
        }
        level_nodes = next_level;
    }

    // One step only: a bye winner moves up, nothing further resolves.
    for idx in 0..nodes.len() {
        let node = &nodes[idx];
        if !node.is_leaf() {
            continue;
        }
        let (Some(player), Some(parent), Some(slot)) = (node.bye_player(), node.parent, node.child_slot) else {
            continue;
        };
        let target = nodes[parent].slot(slot);
        if target.is_none() {
            *target = Some(player);
        }
    }

    Bracket { size, nodes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrants(ratings: &[i32]) -> Vec<Entrant> {
        ratings
            .iter()
            .enumerate()
            .map(|(idx, &rating)| Entrant {
                player_id: idx as PlayerId + 1,
                rating: Some(rating),
                registration_order: idx as i64,
            })
            .collect()
    }

    fn descending(count: usize) -> Vec<Entrant> {
        let ratings: Vec<i32> = (0..count).map(|i| 2000 - i as i32 * 10).collect();
        entrants(&ratings)
    }

    #[test]
    fn test_positions_for_eight() {
        assert_eq!(bracket_positions(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
        assert_eq!(bracket_positions(2), vec![1, 2]);
        assert_eq!(bracket_positions(1), vec![1]);
    }

    #[test]
    fn test_positions_pair_seeds_summing_to_size_plus_one() {
        let positions = bracket_positions(16);
        for pair in positions.chunks(2) {
            assert_eq!(pair[0] + pair[1], 17);
        }
    }

    #[test]
    fn test_seed_order_by_rating_then_registration() {
        let list = vec![
            Entrant { player_id: 10, rating: Some(1500), registration_order: 3 },
            Entrant { player_id: 11, rating: None, registration_order: 1 },
            Entrant { player_id: 12, rating: Some(1500), registration_order: 2 },
            Entrant { player_id: 13, rating: Some(1100), registration_order: 0 },
        ];

        assert_eq!(seed_order(&list, 1200), vec![12, 10, 11, 13]);
    }

    #[test]
    fn test_fewer_than_two_entrants_builds_nothing() {
        assert!(build_bracket(&[], 1200).nodes.is_empty());
        assert!(build_bracket(&descending(1), 1200).nodes.is_empty());
    }

    #[test]
    fn test_two_players_single_match() {
        let bracket = build_bracket(&descending(2), 1200);

        assert_eq!(bracket.size, 2);
        assert_eq!(bracket.nodes.len(), 1);
        let only = &bracket.nodes[0];
        assert_eq!((only.a_player, only.b_player), (Some(1), Some(2)));
        assert_eq!(only.parent, None);
    }

    #[test]
    fn test_five_players() {
        let bracket = build_bracket(&entrants(&[1600, 1550, 1500, 1450, 1400]), 1200);

        assert_eq!(bracket.size, 8);
        assert_eq!(bracket.leaves().count(), 4);
        assert_eq!(bracket.bye_count(), 3);
        assert_eq!(bracket.nodes.len(), 7);
        assert_eq!(bracket.depth(), 3);

        // Leaf order follows positions 1,8 | 4,5 | 2,7 | 3,6
        let first = &bracket.nodes[0];
        assert_eq!((first.a_player, first.b_player), (Some(1), None));
        assert_eq!(first.initial_outcome(), MatchOutcome::AWin);

        let second = &bracket.nodes[1];
        assert_eq!((second.a_player, second.b_player), (Some(4), Some(5)));
        assert_eq!(second.initial_outcome(), MatchOutcome::Pending);

        // Seed 1 already waits in the parent's A slot
        let parent = &bracket.nodes[first.parent.unwrap()];
        assert_eq!(parent.a_player, Some(1));
        assert_eq!(parent.b_player, None);
        assert_eq!(parent.initial_outcome(), MatchOutcome::Pending);
    }

    #[test]
    fn test_adjacent_byes_fill_both_parent_slots() {
        let bracket = build_bracket(&entrants(&[1600, 1550, 1500, 1450, 1400]), 1200);

        // Leaves 2 and 3 hold seeds 2 and 3 alone; their shared parent gets both.
        let parent_idx = bracket.nodes[2].parent.unwrap();
        assert_eq!(bracket.nodes[3].parent, Some(parent_idx));
        let parent = &bracket.nodes[parent_idx];
        assert_eq!((parent.a_player, parent.b_player), (Some(2), Some(3)));

        // No further propagation to the root.
        let root = bracket.root().unwrap();
        assert_eq!((root.a_player, root.b_player), (None, None));
    }

    #[test]
    fn test_sixteen_players_no_byes() {
        let bracket = build_bracket(&descending(16), 1200);

        assert_eq!(bracket.size, 16);
        assert_eq!(bracket.leaves().count(), 8);
        assert_eq!(bracket.bye_count(), 0);
        assert_eq!(bracket.nodes.len(), 15);
        assert!(bracket.leaves().all(|n| n.a_player.is_some() && n.b_player.is_some()));
    }

    #[test]
    fn test_thirty_three_players() {
        let bracket = build_bracket(&descending(33), 1200);

        assert_eq!(bracket.size, 64);
        assert_eq!(bracket.nodes.len(), 63);
        assert_eq!(bracket.bye_count(), 31);
        assert_eq!(bracket.depth(), 6);
    }

    #[test]
    fn test_parent_links_form_a_tree() {
        let bracket = build_bracket(&descending(11), 1200);

        let roots = bracket.nodes.iter().filter(|n| n.parent.is_none()).count();
        assert_eq!(roots, 1);

        for (idx, node) in bracket.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent > idx);
                assert_eq!(bracket.nodes[parent].level, node.level + 1);
                assert!(node.child_slot.is_some());
            }
        }
    }
}
