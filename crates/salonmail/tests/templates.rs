mod common;

use common::{at, record, reservation, RecordingMailer, SHOP};
use salonmail::emails::{DispatchError, Related, TemplateResolver};

fn render(email_type: &str) -> Result<salonmail::mailer::OutgoingMail, DispatchError> {
    let resolver = TemplateResolver::new(SHOP);
    let rec = record(email_type, "to@example.com", "reservation", 1, at(9, 0));
    resolver.render(&rec, &Related::Reservation(reservation(1)))
}

#[test]
fn reminders_name_the_day_count_and_reservation_details() {
    let two = render("reservation_reminder_2days").unwrap();
    assert_eq!(two.subject, "【Salon Mimosa】ご来店2日前のお知らせ");

    let one = render("reservation_reminder_1day").unwrap();
    assert_eq!(one.subject, "【Salon Mimosa】ご来店1日前のお知らせ");
    assert_eq!(one.to, "to@example.com");
    assert!(one.body.starts_with("山田 花子 様"));
    assert!(one.body.contains("予約番号：R-00001"));
    assert!(one.body.contains("2026年10月21日(水) 14:00"));
    assert!(one.body.contains("カット＋カラー"));
}

#[test]
fn thanks_mails_have_their_own_subjects() {
    let three = render("reservation_thanks_3days").unwrap();
    assert_eq!(three.subject, "【Salon Mimosa】ご来店ありがとうございました");
    assert!(three.body.contains("Salon Mimosa"));

    let month = render("reservation_thanks_1month").unwrap();
    assert_eq!(month.subject, "【Salon Mimosa】その後いかがお過ごしですか");
    assert!(month.body.contains("「カット＋カラー」"));
}

#[test]
fn unknown_type_has_no_template() {
    let err = render("birthday_coupon").unwrap_err();
    assert!(matches!(err, DispatchError::UnsupportedEmailType(ref t) if t == "birthday_coupon"));
    assert!(err.is_warning());
}

#[tokio::test]
async fn send_passes_transport_errors_through_verbatim() {
    let resolver = TemplateResolver::new(SHOP);
    let mailer = RecordingMailer::default();
    mailer.fail_for("to@example.com", "421 try again later");

    let rec = record("reservation_reminder_1day", "to@example.com", "reservation", 1, at(9, 0));
    let err = resolver
        .send(&mailer, &rec, &Related::Reservation(reservation(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Transport(_)));
    assert_eq!(err.to_string(), "421 try again later");
    assert!(!err.is_warning());
    assert!(mailer.sent().is_empty());
}
