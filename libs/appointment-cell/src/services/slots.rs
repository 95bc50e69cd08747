// libs/appointment-cell/src/services/slots.rs
use std::collections::BTreeSet;

use chrono::NaiveTime;

use crate::models::TimeSlot;

/// Returned by [`SlotCatalog::display`] for indices outside 1..=16.
pub const INVALID_SLOT_LABEL: &str = "Invalid time slot";

const SLOT_MINUTES: u32 = 30;

// Start of each slot in minutes after midnight. Slots 1-8 cover the morning
// clinic, 9-16 the afternoon; nothing is bookable between 12:00 and 13:00.
const SLOT_STARTS: [u32; 16] = [
    8 * 60,
    8 * 60 + 30,
    9 * 60,
    9 * 60 + 30,
    10 * 60,
    10 * 60 + 30,
    11 * 60,
    11 * 60 + 30,
    13 * 60,
    13 * 60 + 30,
    14 * 60,
    14 * 60 + 30,
    15 * 60,
    15 * 60 + 30,
    16 * 60,
    16 * 60 + 30,
];

fn start_minutes(slot: TimeSlot) -> u32 {
    SLOT_STARTS[(slot.index() - 1) as usize]
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn to_time(minutes: u32) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0).unwrap_or(NaiveTime::MIN)
}

impl TimeSlot {
    pub fn start_time(self) -> NaiveTime {
        to_time(start_minutes(self))
    }

    pub fn end_time(self) -> NaiveTime {
        to_time(start_minutes(self) + SLOT_MINUTES)
    }

    /// `"HH:MM-HH:MM"`
    pub fn label(self) -> String {
        let start = start_minutes(self);
        format!("{}-{}", format_minutes(start), format_minutes(start + SLOT_MINUTES))
    }
}

/// One cell of the slot picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotButton {
    pub slot: TimeSlot,
    pub label: String,
    pub enabled: bool,
    pub selected: bool,
}

/// Static slot knowledge. Pure lookups, no I/O.
pub struct SlotCatalog;

impl SlotCatalog {
    /// Wall-clock range of a slot index; never fails, so server data with a
    /// bad index still renders.
    pub fn display(index: i32) -> String {
        TimeSlot::new(index)
            .map(TimeSlot::label)
            .unwrap_or_else(|| INVALID_SLOT_LABEL.to_string())
    }

    pub fn all_slot_indices() -> Vec<i32> {
        (TimeSlot::FIRST..=TimeSlot::LAST).collect()
    }

    pub fn all_slots() -> impl Iterator<Item = TimeSlot> {
        (TimeSlot::FIRST..=TimeSlot::LAST).filter_map(TimeSlot::new)
    }

    /// Every slot of the day, with the unavailable ones disabled rather
    /// than left out.
    pub fn grid(available: &BTreeSet<TimeSlot>, selected: Option<TimeSlot>) -> Vec<SlotButton> {
        Self::all_slots()
            .map(|slot| SlotButton {
                slot,
                label: slot.label(),
                enabled: available.contains(&slot),
                selected: selected == Some(slot),
            })
            .collect()
    }
}
