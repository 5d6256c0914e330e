use serde::Serialize;

use super::PrescriptionRecord;

pub const DEFAULT_REMINDER_TIMES: [&str; 2] = ["08:00 AM", "06:00 PM"];

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoseSlot {
    Morning,
    Afternoon,
    Evening,
    Daily,
}

/// Maps a dosage such as `"500mg 1-0-1"` to the parts of the day it covers.
///
/// Only the last word is read as the pattern. Non-numeric or all-zero
/// patterns fall back to [`DoseSlot::Daily`].
pub fn dose_slots(dosage: &str) -> Vec<DoseSlot> {
    let pattern = dosage.split_whitespace().last().unwrap_or("");

    let slots: Vec<DoseSlot> = pattern
        .split('-')
        .zip([DoseSlot::Morning, DoseSlot::Afternoon, DoseSlot::Evening])
        .filter(|(count, _)| count.trim().parse::<f64>().map(|n| n > 0.0).unwrap_or(false))
        .map(|(_, slot)| slot)
        .collect();

    if slots.is_empty() {
        vec![DoseSlot::Daily]
    } else {
        slots
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MedicationSchedule {
    pub medicine_name: String,
    pub slots: Vec<DoseSlot>,
}

/// Reminder times plus per-medication dose slots for one prescription
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReminderPlan {
    pub enabled: bool,
    pub times: Vec<String>,
    pub medications: Vec<MedicationSchedule>,
}

impl ReminderPlan {
    pub fn from_record(record: &PrescriptionRecord) -> Self {
        let times = if record.reminders.times.is_empty() {
            DEFAULT_REMINDER_TIMES.iter().map(|t| t.to_string()).collect()
        } else {
            record.reminders.times.clone()
        };

        let medications = record
            .medications
            .iter()
            .enumerate()
            .map(|(i, medication)| MedicationSchedule {
                medicine_name: medication
                    .medicine_name
                    .as_ref()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("Medication {}", i + 1)),
                slots: dose_slots(
                    &medication
                        .dosage
                        .as_ref()
                        .map(|dosage| dosage.to_string())
                        .unwrap_or_default(),
                ),
            })
            .collect();

        Self {
            enabled: record.reminders.enabled,
            times,
            medications,
        }
    }
}
