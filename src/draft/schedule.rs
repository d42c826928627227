// Snake-draft pick order arithmetic.
//
// Pure functions of (pick_number, num_teams). Turn legality anywhere else
// in the engine is always derived from these, so the order is trivially
// replayable from a pick counter alone.

/// 1-based round a pick falls in.
pub fn round_of(pick_number: u32, num_teams: u32) -> u32 {
    debug_assert!(pick_number >= 1 && num_teams >= 1);
    (pick_number - 1) / num_teams + 1
}

/// 1-based position of a pick within its round.
pub fn pick_in_round(pick_number: u32, num_teams: u32) -> u32 {
    debug_assert!(pick_number >= 1 && num_teams >= 1);
    (pick_number - 1) % num_teams + 1
}

/// The draft position (1..=num_teams) on the clock for a pick. Odd rounds
/// ascend through the draft order, even rounds descend.
pub fn slot_on_clock(pick_number: u32, num_teams: u32) -> u32 {
    let round = round_of(pick_number, num_teams);
    let index = pick_in_round(pick_number, num_teams);
    if round % 2 == 1 {
        index
    } else {
        num_teams + 1 - index
    }
}

/// The draft position on deck for the following pick.
pub fn next_on_clock(pick_number: u32, num_teams: u32) -> u32 {
    slot_on_clock(pick_number + 1, num_teams)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_partition_picks() {
        assert_eq!(round_of(1, 4), 1);
        assert_eq!(round_of(4, 4), 1);
        assert_eq!(round_of(5, 4), 2);
        assert_eq!(round_of(8, 4), 2);
        assert_eq!(round_of(9, 4), 3);
        assert_eq!(round_of(12, 4), 3);
    }

    #[test]
    fn pick_in_round_cycles() {
        assert_eq!(pick_in_round(1, 4), 1);
        assert_eq!(pick_in_round(4, 4), 4);
        assert_eq!(pick_in_round(5, 4), 1);
        assert_eq!(pick_in_round(8, 4), 4);
    }

    #[test]
    fn snake_order_four_teams_three_rounds() {
        let sequence: Vec<u32> = (1..=12).map(|p| slot_on_clock(p, 4)).collect();
        assert_eq!(sequence, vec![1, 2, 3, 4, 4, 3, 2, 1, 1, 2, 3, 4]);
    }

    #[test]
    fn snake_order_two_teams() {
        let sequence: Vec<u32> = (1..=6).map(|p| slot_on_clock(p, 2)).collect();
        assert_eq!(sequence, vec![1, 2, 2, 1, 1, 2]);
    }

    #[test]
    fn single_team_always_on_clock() {
        for pick in 1..=5 {
            assert_eq!(slot_on_clock(pick, 1), 1);
        }
    }

    #[test]
    fn round_boundary_repeats_the_turning_team() {
        // The last picker of a round picks first in the next round.
        assert_eq!(slot_on_clock(4, 4), 4);
        assert_eq!(slot_on_clock(5, 4), 4);
        assert_eq!(slot_on_clock(8, 4), 1);
        assert_eq!(slot_on_clock(9, 4), 1);
    }

    #[test]
    fn next_on_clock_matches_following_pick() {
        for pick in 1..=20 {
            assert_eq!(next_on_clock(pick, 4), slot_on_clock(pick + 1, 4));
        }
    }
}
