//! MIP construction for the timetable.
//!
//! Decision variable `x[t,d,s,l,r]` places talk `t` in slot
//! `(d,s,l,r)`; coupling binaries encode co-vote dispersion and track
//! cohesion. The objective is lexicographic via weighted tiers with
//! gaps wide enough to dominate lower tiers given the parameter
//! discretization.

use crate::error::Result;
use crate::model::{ConstraintSense, MipModel, VarId};
use crate::params::{cooc_matrix, fit_matrix, track_groups, ScheduleInput, SlotIndex};
use std::collections::BTreeMap;

/// Objective tier weights, top priority first: speaker preferences,
/// capacity-popularity fit, co-vote dispersion, main-track cohesion,
/// sub-track cohesion.
pub const W_PREF: f64 = 100_000_000.0;
pub const W_FIT: f64 = 1_000_000.0;
pub const W_COOC: f64 = 10_000.0;
pub const W_MAIN: f64 = 100.0;
pub const W_SUB: f64 = 1.0;

pub fn x_var_name(talk: usize, slot: SlotIndex) -> String {
    format!(
        "x_t{}_d{}_s{}_l{}_r{}",
        talk, slot.day, slot.session, slot.position, slot.room
    )
}

/// Assemble the full model from a validated input.
pub fn build_model(input: &ScheduleInput) -> Result<MipModel> {
    input.validate()?;
    let mut model = MipModel::new("chairlift-timetable");

    let slots = input.grid.slots();
    let talks = &input.talks;
    let fit = fit_matrix(talks, input.grid.rooms());
    let cooc = cooc_matrix(input);

    // x[t, slot] for every talk and existing slot.
    let mut x: BTreeMap<(usize, SlotIndex), VarId> = BTreeMap::new();
    for (t, _) in talks.iter().enumerate() {
        for &slot in &slots {
            let id = model.binary(x_var_name(t, slot));
            x.insert((t, slot), id);
        }
    }

    // Objective tier 1 + 2: preferences and capacity-popularity fit
    // fold directly onto the placement variables, since
    // x_room[t,r] = sum over (d,s,l) of x[t,d,s,l,r].
    for (t, talk) in talks.iter().enumerate() {
        for &slot in &slots {
            let pref = f64::from(input.pref(&talk.code, slot));
            let coefficient = W_PREF * pref + W_FIT * fit[t][slot.room];
            model.objective_term(coefficient, x[&(t, slot)]);
        }
    }

    // Constraint 1: length fit. The single chosen slot must match the
    // talk duration exactly.
    for (t, talk) in talks.iter().enumerate() {
        let terms = slots
            .iter()
            .map(|&slot| (f64::from(input.grid.slot_length(slot)), x[&(t, slot)]))
            .collect();
        model.add_constraint(
            format!("len_t{t}"),
            terms,
            ConstraintSense::Equal,
            f64::from(talk.duration),
        );
    }

    // Constraint 3: each accepted talk is scheduled exactly once.
    for (t, _) in talks.iter().enumerate() {
        let terms = slots.iter().map(|&slot| (1.0, x[&(t, slot)])).collect();
        model.add_constraint(format!("once_t{t}"), terms, ConstraintSense::Equal, 1.0);
    }

    // Constraint 2: at most one talk per slot.
    for &slot in &slots {
        let terms = (0..talks.len()).map(|t| (1.0, x[&(t, slot)])).collect();
        model.add_constraint(
            format!(
                "slot_d{}_s{}_l{}_r{}",
                slot.day, slot.session, slot.position, slot.room
            ),
            terms,
            ConstraintSense::LessEq,
            1.0,
        );
    }

    // Co-location binaries: co[t1,t2] = 1 when both talks share a
    // (day, session, position) across rooms. Linearized per parallel
    // group; objective tier 3 pushes co-interesting talks apart.
    for t1 in 0..talks.len() {
        for t2 in (t1 + 1)..talks.len() {
            if cooc[t1][t2] == 0.0 {
                continue;
            }
            let co = model.binary(format!("co_t{t1}_t{t2}"));
            model.objective_term(-W_COOC * cooc[t1][t2], co);
            for group in parallel_groups(&slots) {
                let mut terms: Vec<(f64, VarId)> = Vec::new();
                for &slot in &group.1 {
                    terms.push((1.0, x[&(t1, slot)]));
                    terms.push((1.0, x[&(t2, slot)]));
                }
                terms.push((-1.0, co));
                model.add_constraint(
                    format!(
                        "co_t{t1}_t{t2}_d{}_s{}_l{}",
                        group.0 .0, group.0 .1, group.0 .2
                    ),
                    terms,
                    ConstraintSense::LessEq,
                    1.0,
                );
            }
        }
    }

    // Track cohesion binaries: mt[d,s,r,m] flags main-track m touching
    // session (d,s,r); |L| * mt >= occupancy. Analogous for sub-tracks.
    let positions = input.grid.positions() as f64;
    for (weight, label, groups) in [
        (W_MAIN, "mt", track_groups(talks, |t| t.main_track.as_ref())),
        (W_SUB, "st", track_groups(talks, |t| t.sub_track.as_ref())),
    ] {
        for (track_index, (_, members)) in groups.iter().enumerate() {
            for (session_key, session_slots) in session_groups(&slots) {
                let mut terms: Vec<(f64, VarId)> = Vec::new();
                for &t in members {
                    for &slot in &session_slots {
                        terms.push((1.0, x[&(t, slot)]));
                    }
                }
                if terms.is_empty() {
                    continue;
                }
                let flag = model.binary(format!(
                    "{label}_d{}_s{}_r{}_k{track_index}",
                    session_key.0, session_key.1, session_key.2
                ));
                model.objective_term(-weight, flag);
                terms.push((-positions, flag));
                model.add_constraint(
                    format!(
                        "{label}_d{}_s{}_r{}_k{track_index}",
                        session_key.0, session_key.1, session_key.2
                    ),
                    terms,
                    ConstraintSense::LessEq,
                    0.0,
                );
            }
        }
    }

    // Constraint 4: paired sessions. The second part sits directly
    // after the first, same room and session, via big-M disjunctions.
    let big_m = positions.max(1.0);
    for (pair_index, (first, second)) in input.paired().iter().enumerate() {
        let a = input.talk_index(first).expect("validated");
        let b = input.talk_index(second).expect("validated");
        for (session_key, session_slots) in session_groups(&slots) {
            let name = format!(
                "pair{pair_index}_d{}_s{}_r{}",
                session_key.0, session_key.1, session_key.2
            );

            // Both parts occupy this session together or not at all.
            let mut together: Vec<(f64, VarId)> = Vec::new();
            for &slot in &session_slots {
                together.push((1.0, x[&(a, slot)]));
                together.push((-1.0, x[&(b, slot)]));
            }
            model.add_constraint(
                format!("{name}_sess"),
                together,
                ConstraintSense::Equal,
                0.0,
            );

            // When part A is here (indicator = its session occupancy),
            // part B's position is exactly one higher.
            let mut upper: Vec<(f64, VarId)> = Vec::new();
            let mut lower: Vec<(f64, VarId)> = Vec::new();
            for &slot in &session_slots {
                let position = slot.position as f64;
                upper.push((position, x[&(b, slot)]));
                upper.push((-position, x[&(a, slot)]));
                upper.push((big_m, x[&(a, slot)]));
                lower.push((position, x[&(b, slot)]));
                lower.push((-position, x[&(a, slot)]));
                lower.push((-big_m, x[&(a, slot)]));
            }
            model.add_constraint(
                format!("{name}_seq_ub"),
                upper,
                ConstraintSense::LessEq,
                1.0 + big_m,
            );
            model.add_constraint(
                format!("{name}_seq_lb"),
                lower,
                ConstraintSense::GreaterEq,
                1.0 - big_m,
            );
        }
    }

    Ok(model)
}

/// Slots grouped by (day, session, position): talks in the same group
/// run in parallel.
fn parallel_groups(slots: &[SlotIndex]) -> Vec<((usize, usize, usize), Vec<SlotIndex>)> {
    let mut groups: BTreeMap<(usize, usize, usize), Vec<SlotIndex>> = BTreeMap::new();
    for &slot in slots {
        groups
            .entry((slot.day, slot.session, slot.position))
            .or_default()
            .push(slot);
    }
    groups.into_iter().collect()
}

/// Slots grouped by (day, session, room): a contiguous session in one
/// room.
fn session_groups(slots: &[SlotIndex]) -> Vec<((usize, usize, usize), Vec<SlotIndex>)> {
    let mut groups: BTreeMap<(usize, usize, usize), Vec<SlotIndex>> = BTreeMap::new();
    for &slot in slots {
        groups
            .entry((slot.day, slot.session, slot.room))
            .or_default()
            .push(slot);
    }
    groups.into_iter().collect()
}
