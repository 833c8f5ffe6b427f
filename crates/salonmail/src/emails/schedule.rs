use chrono::{DateTime, Days, Duration, Months, NaiveDate, TimeZone, Utc};

use crate::emails::model::{EmailType, NewScheduledEmail};
use crate::emails::related::RelatedRef;
use crate::reservations::Reservation;

/// When, in shop-local time, the scheduled emails go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Shop's offset from UTC. Reservation dates and times are stored local.
    pub utc_offset_hours: i32,
    pub reminder_hour: u32,
    pub thanks_hour: u32,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            reminder_hour: 10,
            thanks_hour: 10,
        }
    }
}

impl SchedulePolicy {
    /// `hour:00` local on `date`, as UTC.
    pub fn local_at(&self, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
        let local = date.and_hms_opt(hour, 0, 0)?;
        let utc = local - Duration::hours(i64::from(self.utc_offset_hours));
        Some(Utc.from_utc_datetime(&utc))
    }

    pub fn send_at(&self, email_type: EmailType, visit: NaiveDate) -> Option<DateTime<Utc>> {
        match email_type {
            EmailType::ReservationReminder2Days | EmailType::ReservationReminder1Day => {
                let days = email_type.reminder_days()?;
                let day = visit.checked_sub_days(Days::new(u64::from(days)))?;
                self.local_at(day, self.reminder_hour)
            }
            EmailType::ReservationThanks3Days => {
                let day = visit.checked_add_days(Days::new(3))?;
                self.local_at(day, self.thanks_hour)
            }
            EmailType::ReservationThanks1Month => {
                let day = visit.checked_add_months(Months::new(1))?;
                self.local_at(day, self.thanks_hour)
            }
        }
    }
}

/// Emails to create when `reservation` is booked at `now`.
///
/// Reminders whose send time has already passed are left out: a booking made
/// the evening before the visit gets no "2 days before" mail. Thanks mails are
/// always planned.
pub fn plan_for_reservation(
    reservation: &Reservation,
    policy: &SchedulePolicy,
    now: DateTime<Utc>,
) -> Vec<NewScheduledEmail> {
    EmailType::ALL
        .into_iter()
        .filter_map(|email_type| {
            let send_at = policy.send_at(email_type, reservation.reservation_date)?;
            if email_type.reminder_days().is_some() && send_at <= now {
                return None;
            }
            Some(NewScheduledEmail {
                email_type,
                email: reservation.email.clone(),
                related: RelatedRef::Reservation(reservation.id),
                send_at,
            })
        })
        .collect()
}
