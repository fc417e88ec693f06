//! Schedule inputs and parameter derivation.
//!
//! The optimizer consumes a slot grid (day x session x position x
//! room, with per-slot lengths), talk specs, and sparse preference and
//! co-vote data. Popularity and capacity are normalized into [0,1] and
//! discretized so the weighted objective tiers stay separated.

use crate::error::{Result, ScheduleError};
use chairlift_protocol::types::{ProposalCode, RoomId};
use std::collections::{BTreeMap, BTreeSet};

/// Levels for popularity quantization in the fit parameter.
pub const FIT_QUANT_LEVELS: u32 = 50;

/// Levels for co-vote quantization before squaring.
pub const COOC_QUANT_LEVELS: u32 = 20;

/// Injected co-occurrence floor for sponsored-talk pairs, keeping them
/// out of parallel slots.
pub const SPONSORED_COOC_FLOOR: f64 = 1.0;

// ============================================================================
// Grid
// ============================================================================

/// A room as the optimizer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSpec {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
}

/// Position of one slot in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex {
    pub day: usize,
    pub session: usize,
    pub position: usize,
    pub room: usize,
}

/// Dense slot grid; a length of 0 marks a non-existent slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleGrid {
    days: usize,
    sessions: usize,
    positions: usize,
    rooms: Vec<RoomSpec>,
    lengths: Vec<u32>,
}

impl ScheduleGrid {
    pub fn new(days: usize, sessions: usize, positions: usize, rooms: Vec<RoomSpec>) -> Self {
        let lengths = vec![0; days * sessions * positions * rooms.len()];
        Self {
            days,
            sessions,
            positions,
            rooms,
            lengths,
        }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn sessions(&self) -> usize {
        self.sessions
    }

    pub fn positions(&self) -> usize {
        self.positions
    }

    pub fn rooms(&self) -> &[RoomSpec] {
        &self.rooms
    }

    fn offset(&self, slot: SlotIndex) -> usize {
        debug_assert!(slot.day < self.days);
        debug_assert!(slot.session < self.sessions);
        debug_assert!(slot.position < self.positions);
        debug_assert!(slot.room < self.rooms.len());
        ((slot.day * self.sessions + slot.session) * self.positions + slot.position)
            * self.rooms.len()
            + slot.room
    }

    pub fn set_slot_length(&mut self, slot: SlotIndex, minutes: u32) {
        let offset = self.offset(slot);
        self.lengths[offset] = minutes;
    }

    pub fn slot_length(&self, slot: SlotIndex) -> u32 {
        self.lengths[self.offset(slot)]
    }

    /// All existing slots (length > 0) in grid order.
    pub fn slots(&self) -> Vec<SlotIndex> {
        let mut slots = Vec::new();
        for day in 0..self.days {
            for session in 0..self.sessions {
                for position in 0..self.positions {
                    for room in 0..self.rooms.len() {
                        let slot = SlotIndex {
                            day,
                            session,
                            position,
                            room,
                        };
                        if self.slot_length(slot) > 0 {
                            slots.push(slot);
                        }
                    }
                }
            }
        }
        slots
    }
}

// ============================================================================
// Talks & input
// ============================================================================

/// A talk as the optimizer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TalkSpec {
    pub code: ProposalCode,
    pub duration: u32,
    pub main_track: Option<String>,
    pub sub_track: Option<String>,
    /// Public-vote score; popularity is this normalized over talks.
    pub votes: u64,
    pub sponsored: bool,
}

impl TalkSpec {
    pub fn new(code: impl Into<ProposalCode>, duration: u32) -> Self {
        Self {
            code: code.into(),
            duration,
            main_track: None,
            sub_track: None,
            votes: 0,
            sponsored: false,
        }
    }

    pub fn with_track(mut self, main: &str, sub: Option<&str>) -> Self {
        self.main_track = Some(main.to_string());
        self.sub_track = sub.map(str::to_string);
        self
    }

    pub fn with_votes(mut self, votes: u64) -> Self {
        self.votes = votes;
        self
    }

    pub fn sponsored(mut self) -> Self {
        self.sponsored = true;
        self
    }
}

/// Everything the model builder needs for one run.
#[derive(Debug, Clone)]
pub struct ScheduleInput {
    pub grid: ScheduleGrid,
    pub talks: Vec<TalkSpec>,
    prefs: BTreeMap<(ProposalCode, SlotIndex), i8>,
    co_votes: BTreeMap<(ProposalCode, ProposalCode), u64>,
    paired: Vec<(ProposalCode, ProposalCode)>,
}

impl ScheduleInput {
    pub fn new(grid: ScheduleGrid, talks: Vec<TalkSpec>) -> Self {
        Self {
            grid,
            talks,
            prefs: BTreeMap::new(),
            co_votes: BTreeMap::new(),
            paired: Vec::new(),
        }
    }

    /// Speaker/room eligibility preference for (talk, slot): -1
    /// discourages, +1 encourages. Unset slots are neutral.
    pub fn set_pref(&mut self, code: &ProposalCode, slot: SlotIndex, pref: i8) {
        self.prefs.insert((code.clone(), slot), pref.clamp(-1, 1));
    }

    pub fn pref(&self, code: &ProposalCode, slot: SlotIndex) -> i8 {
        self.prefs
            .get(&(code.clone(), slot))
            .copied()
            .unwrap_or(0)
    }

    /// Count of voters who expressed interest in both talks. Stored
    /// symmetrically under the ordered key.
    pub fn set_co_votes(&mut self, a: &ProposalCode, b: &ProposalCode, voters: u64) {
        if a == b {
            return;
        }
        let key = ordered_pair(a, b);
        self.co_votes.insert(key, voters);
    }

    pub fn co_votes(&self, a: &ProposalCode, b: &ProposalCode) -> u64 {
        if a == b {
            return 0;
        }
        self.co_votes
            .get(&ordered_pair(a, b))
            .copied()
            .unwrap_or(0)
    }

    /// Restrict a talk to the given room indices: every existing slot
    /// in another room gets a discouraging preference. Used for
    /// sponsored talks bound to specific rooms.
    pub fn restrict_to_rooms(&mut self, code: &ProposalCode, rooms: &[usize]) {
        for slot in self.grid.slots() {
            if !rooms.contains(&slot.room) {
                self.set_pref(code, slot, -1);
            }
        }
    }

    /// Pin a talk into one (day, session): those slots are encouraged,
    /// every other existing slot discouraged. Used for keynotes bound
    /// to the morning plenary.
    pub fn pin_to_session(&mut self, code: &ProposalCode, day: usize, session: usize) {
        for slot in self.grid.slots() {
            let pref = if slot.day == day && slot.session == session {
                1
            } else {
                -1
            };
            self.set_pref(code, slot, pref);
        }
    }

    /// Declare a multi-part pairing: `second` must land in the slot
    /// directly after `first`, same room and session.
    pub fn pair(&mut self, first: &ProposalCode, second: &ProposalCode) {
        self.paired.push((first.clone(), second.clone()));
    }

    pub fn paired(&self) -> &[(ProposalCode, ProposalCode)] {
        &self.paired
    }

    pub fn talk_index(&self, code: &ProposalCode) -> Option<usize> {
        self.talks.iter().position(|talk| &talk.code == code)
    }

    /// Structural validation ahead of the build stage.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for talk in &self.talks {
            if talk.duration == 0 {
                return Err(ScheduleError::no_schedule(format!(
                    "talk {} has zero duration",
                    talk.code
                )));
            }
            if !seen.insert(&talk.code) {
                return Err(ScheduleError::no_schedule(format!(
                    "duplicate talk code {}",
                    talk.code
                )));
            }
        }
        for (first, second) in &self.paired {
            if self.talk_index(first).is_none() || self.talk_index(second).is_none() {
                return Err(ScheduleError::no_schedule(format!(
                    "pairing references unknown talk ({first}, {second})"
                )));
            }
        }
        Ok(())
    }
}

fn ordered_pair(a: &ProposalCode, b: &ProposalCode) -> (ProposalCode, ProposalCode) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

// ============================================================================
// Derived parameters
// ============================================================================

/// Snap a [0,1] value onto `levels` discrete steps.
pub fn quantize(value: f64, levels: u32) -> f64 {
    let levels = f64::from(levels.max(1));
    (value.clamp(0.0, 1.0) * levels).round() / levels
}

/// `fit[t][r] = quantize(normalized_popularity[t], 50) * normalized_capacity[r]`.
pub fn fit_matrix(talks: &[TalkSpec], rooms: &[RoomSpec]) -> Vec<Vec<f64>> {
    let max_votes = talks.iter().map(|talk| talk.votes).max().unwrap_or(0);
    let max_capacity = rooms.iter().map(|room| room.capacity).max().unwrap_or(0);

    talks
        .iter()
        .map(|talk| {
            let popularity = if max_votes == 0 {
                0.0
            } else {
                talk.votes as f64 / max_votes as f64
            };
            let popularity = quantize(popularity, FIT_QUANT_LEVELS);
            rooms
                .iter()
                .map(|room| {
                    let capacity = if max_capacity == 0 {
                        0.0
                    } else {
                        f64::from(room.capacity) / f64::from(max_capacity)
                    };
                    popularity * capacity
                })
                .collect()
        })
        .collect()
}

/// Symmetric co-interest matrix: normalized co-vote counts, diagonal
/// zeroed, discretized to ~20 levels then squared; sponsored pairs get
/// the injected floor.
pub fn cooc_matrix(input: &ScheduleInput) -> Vec<Vec<f64>> {
    let talks = &input.talks;
    let max_voters = talks
        .iter()
        .enumerate()
        .flat_map(|(i, a)| {
            talks
                .iter()
                .skip(i + 1)
                .map(move |b| input.co_votes(&a.code, &b.code))
        })
        .max()
        .unwrap_or(0);

    let mut matrix = vec![vec![0.0; talks.len()]; talks.len()];
    for (i, a) in talks.iter().enumerate() {
        for (j, b) in talks.iter().enumerate().skip(i + 1) {
            let normalized = if max_voters == 0 {
                0.0
            } else {
                input.co_votes(&a.code, &b.code) as f64 / max_voters as f64
            };
            let mut value = quantize(normalized, COOC_QUANT_LEVELS).powi(2);
            if a.sponsored && b.sponsored {
                value = value.max(SPONSORED_COOC_FLOOR);
            }
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }
    matrix
}

/// One-hot maps from track name to the talks carrying it, in sorted
/// track order.
pub fn track_groups(
    talks: &[TalkSpec],
    pick: impl Fn(&TalkSpec) -> Option<&String>,
) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, talk) in talks.iter().enumerate() {
        if let Some(track) = pick(talk) {
            groups.entry(track.clone()).or_default().push(index);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: u64, capacity: u32) -> RoomSpec {
        RoomSpec {
            id: RoomId::new(id),
            name: format!("Room {id}"),
            capacity,
        }
    }

    fn slot(day: usize, session: usize, position: usize, room: usize) -> SlotIndex {
        SlotIndex {
            day,
            session,
            position,
            room,
        }
    }

    #[test]
    fn test_grid_lengths_and_slots() {
        let mut grid = ScheduleGrid::new(2, 2, 2, vec![room(1, 100), room(2, 50)]);
        grid.set_slot_length(slot(0, 0, 0, 0), 30);
        grid.set_slot_length(slot(1, 1, 1, 1), 45);

        assert_eq!(grid.slot_length(slot(0, 0, 0, 0)), 30);
        assert_eq!(grid.slot_length(slot(0, 0, 0, 1)), 0);
        let slots = grid.slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], slot(0, 0, 0, 0));
        assert_eq!(slots[1], slot(1, 1, 1, 1));
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.0, 50), 0.0);
        assert_eq!(quantize(1.0, 50), 1.0);
        assert_eq!(quantize(0.503, 50), 0.5);
        assert_eq!(quantize(0.51, 50), 0.52);
        assert_eq!(quantize(1.5, 50), 1.0);
        assert_eq!(quantize(-0.2, 50), 0.0);
    }

    #[test]
    fn test_fit_matrix_matches_popularity_to_capacity() {
        let talks = vec![
            TalkSpec::new("POP", 30).with_votes(100),
            TalkSpec::new("NICHE", 30).with_votes(10),
        ];
        let rooms = vec![room(1, 500), room(2, 100)];
        let fit = fit_matrix(&talks, &rooms);
        // Popular talk in the big room dominates all other pairings.
        assert_eq!(fit[0][0], 1.0);
        assert!(fit[0][0] > fit[0][1]);
        assert!(fit[0][0] > fit[1][0]);
        assert!((fit[1][1] - 0.1 * 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_fit_matrix_zero_votes() {
        let talks = vec![TalkSpec::new("A", 30)];
        let rooms = vec![room(1, 100)];
        assert_eq!(fit_matrix(&talks, &rooms), vec![vec![0.0]]);
    }

    #[test]
    fn test_cooc_matrix_symmetric_zero_diagonal() {
        let grid = ScheduleGrid::new(1, 1, 1, vec![room(1, 10)]);
        let talks = vec![
            TalkSpec::new("A", 30),
            TalkSpec::new("B", 30),
            TalkSpec::new("C", 30),
        ];
        let mut input = ScheduleInput::new(grid, talks);
        input.set_co_votes(&ProposalCode::from("A"), &ProposalCode::from("B"), 40);
        input.set_co_votes(&ProposalCode::from("B"), &ProposalCode::from("C"), 10);

        let cooc = cooc_matrix(&input);
        assert_eq!(cooc[0][0], 0.0);
        assert_eq!(cooc[0][1], cooc[1][0]);
        // Max pair quantizes to 1.0, squared stays 1.0.
        assert_eq!(cooc[0][1], 1.0);
        // 10/40 = 0.25 -> squared 0.0625.
        assert!((cooc[1][2] - 0.0625).abs() < 1e-9);
        assert_eq!(cooc[0][2], 0.0);
    }

    #[test]
    fn test_sponsored_pairs_get_floor() {
        let grid = ScheduleGrid::new(1, 1, 1, vec![room(1, 10)]);
        let talks = vec![
            TalkSpec::new("S1", 30).sponsored(),
            TalkSpec::new("S2", 30).sponsored(),
        ];
        let input = ScheduleInput::new(grid, talks);
        let cooc = cooc_matrix(&input);
        assert_eq!(cooc[0][1], SPONSORED_COOC_FLOOR);
    }

    #[test]
    fn test_track_groups() {
        let talks = vec![
            TalkSpec::new("A", 30).with_track("PyData", Some("ML")),
            TalkSpec::new("B", 30).with_track("PyData", Some("Viz")),
            TalkSpec::new("C", 30).with_track("General", None),
            TalkSpec::new("D", 30),
        ];
        let mains = track_groups(&talks, |talk| talk.main_track.as_ref());
        assert_eq!(mains["PyData"], vec![0, 1]);
        assert_eq!(mains["General"], vec![2]);
        assert_eq!(mains.len(), 2);

        let subs = track_groups(&talks, |talk| talk.sub_track.as_ref());
        assert_eq!(subs.len(), 2);
        assert_eq!(subs["ML"], vec![0]);
    }

    #[test]
    fn test_restrict_to_rooms_discourages_other_rooms() {
        let mut grid = ScheduleGrid::new(1, 1, 1, vec![room(1, 100), room(2, 50)]);
        grid.set_slot_length(slot(0, 0, 0, 0), 30);
        grid.set_slot_length(slot(0, 0, 0, 1), 30);
        let mut input = ScheduleInput::new(grid, vec![TalkSpec::new("SPON", 30).sponsored()]);
        let code = ProposalCode::from("SPON");
        input.restrict_to_rooms(&code, &[0]);

        assert_eq!(input.pref(&code, slot(0, 0, 0, 0)), 0);
        assert_eq!(input.pref(&code, slot(0, 0, 0, 1)), -1);
    }

    #[test]
    fn test_pin_to_session() {
        let mut grid = ScheduleGrid::new(2, 2, 1, vec![room(1, 100)]);
        for day in 0..2 {
            for session in 0..2 {
                grid.set_slot_length(slot(day, session, 0, 0), 45);
            }
        }
        let mut input = ScheduleInput::new(grid, vec![TalkSpec::new("KEY", 45)]);
        let code = ProposalCode::from("KEY");
        input.pin_to_session(&code, 0, 0);

        assert_eq!(input.pref(&code, slot(0, 0, 0, 0)), 1);
        assert_eq!(input.pref(&code, slot(0, 1, 0, 0)), -1);
        assert_eq!(input.pref(&code, slot(1, 0, 0, 0)), -1);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let grid = ScheduleGrid::new(1, 1, 1, vec![room(1, 10)]);
        let input = ScheduleInput::new(grid.clone(), vec![TalkSpec::new("A", 0)]);
        assert!(input.validate().is_err());

        let input = ScheduleInput::new(
            grid.clone(),
            vec![TalkSpec::new("A", 30), TalkSpec::new("A", 30)],
        );
        assert!(input.validate().is_err());

        let mut input = ScheduleInput::new(grid, vec![TalkSpec::new("A", 30)]);
        input.pair(&ProposalCode::from("A"), &ProposalCode::from("MISSING"));
        assert!(input.validate().is_err());
    }
}
