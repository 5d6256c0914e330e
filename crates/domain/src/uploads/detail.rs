use std::fmt;

use super::{PrescriptionRecord, Scalar};

/// Text rendering of one prescription, section by section.
///
/// Values are printed as stored; empty lists print nothing for their
/// subsection.
pub struct DetailView<'a> {
    record: &'a PrescriptionRecord,
}

impl<'a> DetailView<'a> {
    pub fn new(record: &'a PrescriptionRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &'a PrescriptionRecord {
        self.record
    }
}

fn field(f: &mut fmt::Formatter<'_>, label: &str, value: &Option<Scalar>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "{}: {}", label, value),
        None => writeln!(f, "{}:", label),
    }
}

impl fmt::Display for DetailView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;

        writeln!(f, "Basic Information")?;
        field(f, "Patient Name", &record.patient_name)?;
        field(f, "Age", &record.age)?;
        field(f, "Gender", &record.gender)?;
        field(f, "Prescription Date", &record.prescription_date)?;
        field(f, "Doctor Name", &record.doctor_name)?;
        field(f, "Diagnosis", &record.diagnosis)?;

        writeln!(f)?;
        writeln!(f, "Disease Information")?;
        field(f, "Summary", &record.disease_info.summary)?;
        if !record.disease_info.precautions.is_empty() {
            writeln!(f, "Precautions:")?;
            for precaution in &record.disease_info.precautions {
                writeln!(f, "  - {}", precaution)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Medications")?;
        for medication in &record.medications {
            field(f, "  Medicine Name", &medication.medicine_name)?;
            field(f, "  Dosage", &medication.dosage)?;
            match &medication.duration_days {
                Some(days) => writeln!(f, "  Duration: {} days", days)?,
                None => writeln!(f, "  Duration:")?,
            }
            field(f, "  Total Doses", &medication.total_doses)?;
            field(f, "  Purpose", &medication.purpose)?;
            field(f, "  Notes", &medication.notes)?;
            writeln!(f, "  Side Effects: {}", medication.side_effects.join(", "))?;
            writeln!(f)?;
        }

        writeln!(f, "Reminders")?;
        if record.reminders.enabled {
            for time in &record.reminders.times {
                writeln!(f, "  - {}", time)?;
            }
        } else {
            writeln!(f, "No reminders set.")?;
        }

        writeln!(f)?;
        writeln!(f, "Additional Notes")?;
        if let Some(notes) = &record.additional_notes {
            writeln!(f, "{}", notes)?;
        }
        Ok(())
    }
}
