//! Timetable reconstruction from solved placement variables.

use crate::builder::x_var_name;
use crate::error::{Result, ScheduleError};
use crate::params::ScheduleInput;
use chairlift_protocol::types::{ProposalCode, RoomId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One scheduled talk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub proposal: ProposalCode,
    pub day: usize,
    pub session: usize,
    pub position: usize,
    pub room: RoomId,
    pub room_name: String,
    pub duration: u32,
}

/// The assembled timetable, ordered by (day, session, position, room).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Timetable {
    pub entries: Vec<TimetableEntry>,
}

impl Timetable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_for(&self, proposal: &ProposalCode) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| &e.proposal == proposal)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable grid, one markdown table per day.
    pub fn render_markdown(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        let mut current_day = None;
        for entry in &self.entries {
            if current_day != Some(entry.day) {
                if current_day.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "## Day {}\n", entry.day + 1);
                out.push_str("| Session | Slot | Room | Talk | Minutes |\n");
                out.push_str("|---------|------|------|------|---------|\n");
                current_day = Some(entry.day);
            }
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                session_label(entry.session),
                entry.position + 1,
                entry.room_name,
                entry.proposal,
                entry.duration
            );
        }
        out
    }
}

/// A talk whose regenerated placement no longer matches the published
/// room. Re-runs regenerate from scratch, so organizers review these
/// before re-releasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDrift {
    pub proposal: ProposalCode,
    pub published_room: RoomId,
    pub scheduled_room: RoomId,
}

impl Timetable {
    /// Compare against published placements (proposal -> room). Talks
    /// missing from either side are skipped; only room moves count.
    pub fn room_drift(&self, published: &[(ProposalCode, RoomId)]) -> Vec<RoomDrift> {
        let mut drift = Vec::new();
        for (proposal, published_room) in published {
            if let Some(entry) = self.entry_for(proposal) {
                if entry.room != *published_room {
                    drift.push(RoomDrift {
                        proposal: proposal.clone(),
                        published_room: *published_room,
                        scheduled_room: entry.room,
                    });
                }
            }
        }
        drift
    }
}

/// Conventional labels for the three-session conference day.
pub fn session_label(session: usize) -> String {
    match session {
        0 => "morning".to_string(),
        1 => "afternoon1".to_string(),
        2 => "afternoon2".to_string(),
        other => format!("session{}", other + 1),
    }
}

/// Map solved variable values back onto the grid.
///
/// Solvers may omit zero variables, so absence counts as 0. Each talk
/// must land on exactly one slot and no slot may hold two talks;
/// violations mean the solution does not belong to this model.
pub fn timetable_from_solution(
    input: &ScheduleInput,
    values: &HashMap<String, f64>,
) -> Result<Timetable> {
    let slots = input.grid.slots();
    let mut entries = Vec::new();
    let mut occupied: HashMap<_, ProposalCode> = HashMap::new();

    for (t, talk) in input.talks.iter().enumerate() {
        let mut placed = 0;
        for &slot in &slots {
            let value = values.get(&x_var_name(t, slot)).copied().unwrap_or(0.0);
            if value < 0.5 {
                continue;
            }
            placed += 1;
            if let Some(other) = occupied.insert(slot, talk.code.clone()) {
                return Err(ScheduleError::Mismatch(format!(
                    "slot d{} s{} l{} r{} assigned to both {other} and {}",
                    slot.day, slot.session, slot.position, slot.room, talk.code
                )));
            }
            let room = &input.grid.rooms()[slot.room];
            entries.push(TimetableEntry {
                proposal: talk.code.clone(),
                day: slot.day,
                session: slot.session,
                position: slot.position,
                room: room.id,
                room_name: room.name.clone(),
                duration: input.grid.slot_length(slot),
            });
        }
        if placed != 1 {
            return Err(ScheduleError::Mismatch(format!(
                "talk {} placed {placed} times",
                talk.code
            )));
        }
    }

    entries.sort_by_key(|e| (e.day, e.session, e.position, e.room));
    Ok(Timetable { entries })
}
