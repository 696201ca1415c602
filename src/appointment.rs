//! Appointment booking: the single write path shared by the HTTP API and
//! delta sync.
//!
//! `save_appointment` runs in one transaction:
//! 1. validate references (clinic, patient, provider),
//! 2. resolve the visit, opening a new one when no usable id was supplied,
//! 3. upsert the appointment row with `last_modified` bookkeeping.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{
    ensure_active_reference, find_visit_by_raw_id, get_appointment, get_provider, get_visit,
    immediate_transaction, insert_visit, soft_delete_appointment, upsert_appointment_row,
};
use crate::db::DatabaseError;
use crate::models::*;

/// Longest bookable slot (one day).
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Outcome of a save: the stored row and whether a visit was opened for it.
#[derive(Debug, Clone, Serialize)]
pub struct SavedAppointment {
    pub appointment: Appointment,
    pub visit_created: bool,
    /// The id already named a stored appointment.
    pub updated: bool,
}

fn validate_input(input: &AppointmentInput) -> Result<(), DatabaseError> {
    if input.duration_minutes == 0 || input.duration_minutes > MAX_DURATION_MINUTES {
        return Err(DatabaseError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}, got {}",
            input.duration_minutes
        )));
    }
    Ok(())
}

fn check_provider(
    conn: &Connection,
    provider_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<(), DatabaseError> {
    let provider = get_provider(conn, provider_id)?
        .filter(|p| !p.is_deleted)
        .ok_or_else(|| DatabaseError::Validation(format!("unknown provider {provider_id}")))?;
    if provider.clinic_id != *clinic_id {
        return Err(DatabaseError::Validation(format!(
            "provider {provider_id} does not practice at clinic {clinic_id}"
        )));
    }
    Ok(())
}

/// Pick the visit for this appointment.
///
/// Order: the supplied id if it names a visit of the same patient, then the
/// visit already attached to the stored appointment, else a fresh visit.
fn resolve_visit(
    conn: &Connection,
    input: &AppointmentInput,
    existing: Option<&Appointment>,
    now: NaiveDateTime,
) -> Result<(Uuid, bool), DatabaseError> {
    let supplied = find_visit_by_raw_id(conn, input.visit_id.as_deref())?
        .filter(|v| v.patient_id == input.patient_id);
    if let Some(visit) = supplied {
        return Ok((visit.id, false));
    }

    if let Some(appt) = existing {
        if let Some(visit) = get_visit(conn, &appt.visit_id)? {
            if visit.patient_id == input.patient_id {
                return Ok((visit.id, false));
            }
        }
    }

    let visit = Visit {
        id: Uuid::new_v4(),
        clinic_id: input.clinic_id,
        patient_id: input.patient_id,
        provider_id: input.provider_id,
        visit_date: input.starts_at.date(),
        reason: clean_optional(input.reason.clone()),
        created_at: now,
    };
    insert_visit(conn, &visit)?;
    tracing::debug!(visit_id = %visit.id, patient_id = %visit.patient_id, "Visit opened");
    Ok((visit.id, true))
}

/// Create or update an appointment, opening a visit when needed.
///
/// A missing `input.id` books a new appointment. An id naming a soft-deleted
/// appointment is refused rather than resurrected.
pub fn save_appointment(
    conn: &Connection,
    input: AppointmentInput,
    now: NaiveDateTime,
) -> Result<SavedAppointment, DatabaseError> {
    validate_input(&input)?;

    let tx = immediate_transaction(conn)?;

    ensure_active_reference(&tx, "clinics", "clinic", &input.clinic_id)?;
    ensure_active_reference(&tx, "patients", "patient", &input.patient_id)?;
    if let Some(ref provider_id) = input.provider_id {
        check_provider(&tx, provider_id, &input.clinic_id)?;
    }

    let id = input.id.unwrap_or_else(Uuid::new_v4);
    let existing = get_appointment(&tx, &id)?;
    if existing.as_ref().is_some_and(|a| a.is_deleted) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "appointment {id} has been deleted"
        )));
    }

    let (visit_id, visit_created) = resolve_visit(&tx, &input, existing.as_ref(), now)?;

    let appointment = Appointment {
        id,
        clinic_id: input.clinic_id,
        patient_id: input.patient_id,
        provider_id: input.provider_id,
        visit_id,
        starts_at: input.starts_at,
        duration_minutes: input.duration_minutes,
        status: input
            .status
            .or(existing.as_ref().map(|a| a.status))
            .unwrap_or_default(),
        reason: clean_optional(input.reason),
        notes: clean_optional(input.notes),
        created_at: existing.as_ref().map(|a| a.created_at).unwrap_or(now),
        last_modified: now,
        is_deleted: false,
        deleted_at: None,
    };
    upsert_appointment_row(&tx, &appointment)?;

    let stored = get_appointment(&tx, &id)?
        .ok_or_else(|| DatabaseError::not_found("appointment", id))?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %id,
        visit_id = %visit_id,
        visit_created,
        updated = existing.is_some(),
        "Appointment saved"
    );

    Ok(SavedAppointment {
        appointment: stored,
        visit_created,
        updated: existing.is_some(),
    })
}

/// Soft-delete an appointment. Returns `false` if it was already deleted.
pub fn delete_appointment(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    soft_delete_appointment(conn, id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{
        list_all_visits, list_appointments, soft_delete_clinic, soft_delete_patient,
    };
    use crate::db::sqlite::open_memory_database;

    struct Setup {
        conn: Connection,
        clinic: Clinic,
        patient: Patient,
        provider: Provider,
    }

    fn setup() -> Setup {
        let conn = open_memory_database().unwrap();
        let clinic = make_clinic(&conn, "Central");
        let patient = make_patient(&conn, "Jane", "Doe");
        let provider = make_provider(&conn, &clinic, "Dr. Grey");
        Setup {
            conn,
            clinic,
            patient,
            provider,
        }
    }

    fn input(s: &Setup) -> AppointmentInput {
        AppointmentInput {
            id: None,
            clinic_id: s.clinic.id,
            patient_id: s.patient.id,
            provider_id: Some(s.provider.id),
            visit_id: None,
            starts_at: ts("2025-03-10 09:30:00"),
            duration_minutes: 30,
            status: None,
            reason: Some("Annual physical".into()),
            notes: None,
        }
    }

    #[test]
    fn new_appointment_opens_visit() {
        let s = setup();
        let saved = save_appointment(&s.conn, input(&s), now()).unwrap();

        assert!(saved.visit_created);
        assert!(!saved.updated);
        let appt = &saved.appointment;
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.created_at, now());
        assert_eq!(appt.last_modified, now());

        let visit = get_visit(&s.conn, &appt.visit_id).unwrap().unwrap();
        assert_eq!(visit.patient_id, s.patient.id);
        assert_eq!(visit.visit_date, appt.starts_at.date());
        assert_eq!(visit.reason.as_deref(), Some("Annual physical"));
    }

    #[test]
    fn valid_visit_id_is_reused() {
        let s = setup();
        let first = save_appointment(&s.conn, input(&s), now()).unwrap();

        let follow_up = AppointmentInput {
            visit_id: Some(first.appointment.visit_id.to_string()),
            starts_at: ts("2025-03-10 11:00:00"),
            ..input(&s)
        };
        let second = save_appointment(&s.conn, follow_up, now()).unwrap();

        assert!(!second.visit_created);
        assert_eq!(second.appointment.visit_id, first.appointment.visit_id);
        assert_eq!(list_all_visits(&s.conn).unwrap().len(), 1);
    }

    #[test]
    fn garbage_or_foreign_visit_id_opens_new_visit() {
        let s = setup();
        let other_patient = make_patient(&s.conn, "John", "Roe");
        let theirs = save_appointment(
            &s.conn,
            AppointmentInput {
                patient_id: other_patient.id,
                ..input(&s)
            },
            now(),
        )
        .unwrap();

        let garbage = AppointmentInput {
            visit_id: Some("not-a-visit".into()),
            ..input(&s)
        };
        assert!(save_appointment(&s.conn, garbage, now()).unwrap().visit_created);

        let foreign = AppointmentInput {
            visit_id: Some(theirs.appointment.visit_id.to_string()),
            ..input(&s)
        };
        let saved = save_appointment(&s.conn, foreign, now()).unwrap();
        assert!(saved.visit_created);
        assert_ne!(saved.appointment.visit_id, theirs.appointment.visit_id);
    }

    #[test]
    fn upsert_with_same_id_updates_in_place() {
        let s = setup();
        let first = save_appointment(&s.conn, input(&s), now()).unwrap();
        let id = first.appointment.id;

        let later = ts("2025-03-02 15:00:00");
        let update = AppointmentInput {
            id: Some(id),
            starts_at: ts("2025-03-11 14:00:00"),
            duration_minutes: 45,
            status: Some(AppointmentStatus::Confirmed),
            ..input(&s)
        };
        let second = save_appointment(&s.conn, update, later).unwrap();

        assert!(second.updated);
        // No visit id supplied, but the stored appointment's visit is kept
        assert!(!second.visit_created);
        assert_eq!(second.appointment.visit_id, first.appointment.visit_id);
        assert_eq!(second.appointment.created_at, now());
        assert_eq!(second.appointment.last_modified, later);
        assert_eq!(second.appointment.duration_minutes, 45);
        assert_eq!(second.appointment.status, AppointmentStatus::Confirmed);

        let all = list_appointments(&s.conn, &AppointmentFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn update_without_status_keeps_previous_status() {
        let s = setup();
        let first = save_appointment(
            &s.conn,
            AppointmentInput {
                status: Some(AppointmentStatus::CheckedIn),
                ..input(&s)
            },
            now(),
        )
        .unwrap();
        let again = save_appointment(
            &s.conn,
            AppointmentInput {
                id: Some(first.appointment.id),
                ..input(&s)
            },
            now(),
        )
        .unwrap();
        assert_eq!(again.appointment.status, AppointmentStatus::CheckedIn);
    }

    #[test]
    fn client_chosen_id_creates_row() {
        let s = setup();
        let id = Uuid::new_v4();
        let saved = save_appointment(
            &s.conn,
            AppointmentInput {
                id: Some(id),
                ..input(&s)
            },
            now(),
        )
        .unwrap();
        assert_eq!(saved.appointment.id, id);
        assert!(!saved.updated);
    }

    #[test]
    fn invalid_references_roll_back_everything() {
        let s = setup();
        let other_clinic = make_clinic(&s.conn, "Elsewhere");

        let wrong_clinic = AppointmentInput {
            clinic_id: other_clinic.id,
            ..input(&s)
        };
        let err = save_appointment(&s.conn, wrong_clinic, now()).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(ref m) if m.contains("does not practice")));

        soft_delete_patient(&s.conn, &s.patient.id, now()).unwrap();
        let err = save_appointment(&s.conn, input(&s), now()).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));

        assert!(list_all_visits(&s.conn).unwrap().is_empty());
    }

    #[test]
    fn zero_or_huge_duration_rejected() {
        let s = setup();
        for minutes in [0, MAX_DURATION_MINUTES + 1] {
            let bad = AppointmentInput {
                duration_minutes: minutes,
                ..input(&s)
            };
            assert!(matches!(
                save_appointment(&s.conn, bad, now()),
                Err(DatabaseError::Validation(_))
            ));
        }
    }

    #[test]
    fn deleted_appointment_is_not_resurrected() {
        let s = setup();
        let saved = save_appointment(&s.conn, input(&s), now()).unwrap();
        let id = saved.appointment.id;
        assert!(delete_appointment(&s.conn, &id, now()).unwrap());
        assert!(!delete_appointment(&s.conn, &id, now()).unwrap());

        let err = save_appointment(
            &s.conn,
            AppointmentInput {
                id: Some(id),
                ..input(&s)
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        assert!(get_appointment(&s.conn, &id).unwrap().unwrap().is_deleted);
    }

    #[test]
    fn clinic_delete_blocked_until_appointments_deleted() {
        let s = setup();
        let saved = save_appointment(&s.conn, input(&s), now()).unwrap();

        let err = soft_delete_clinic(&s.conn, &s.clinic.id, now()).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        delete_appointment(&s.conn, &saved.appointment.id, now()).unwrap();
        assert!(soft_delete_clinic(&s.conn, &s.clinic.id, now()).unwrap());
    }

    #[test]
    fn list_filters_by_window_and_status() {
        let s = setup();
        for (hour, status) in [
            ("08", AppointmentStatus::Scheduled),
            ("10", AppointmentStatus::Cancelled),
            ("12", AppointmentStatus::Scheduled),
        ] {
            save_appointment(
                &s.conn,
                AppointmentInput {
                    starts_at: ts(&format!("2025-03-10 {hour}:00:00")),
                    status: Some(status),
                    ..input(&s)
                },
                now(),
            )
            .unwrap();
        }

        let morning = list_appointments(
            &s.conn,
            &AppointmentFilter {
                from: Some(ts("2025-03-10 08:00:00")),
                to: Some(ts("2025-03-10 12:00:00")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(morning.len(), 2);
        assert!(morning[0].starts_at < morning[1].starts_at);

        let scheduled = list_appointments(
            &s.conn,
            &AppointmentFilter {
                status: Some(AppointmentStatus::Scheduled),
                patient_id: Some(s.patient.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(scheduled.len(), 2);
    }
}
