use chrono::{Datelike, NaiveDate, Weekday};

use crate::emails::error::DispatchError;
use crate::emails::model::{EmailType, ScheduledEmail};
use crate::emails::related::Related;
use crate::mailer::{Mailer, OutgoingMail};
use crate::reservations::Reservation;

/// Maps `(email_type, related entity)` to a rendered message and sends it.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    shop_name: String,
}

impl TemplateResolver {
    pub fn new(shop_name: impl Into<String>) -> Self {
        Self {
            shop_name: shop_name.into(),
        }
    }

    pub fn render(
        &self,
        record: &ScheduledEmail,
        related: &Related,
    ) -> Result<OutgoingMail, DispatchError> {
        match related {
            Related::Reservation(reservation) => self.render_reservation(record, reservation),
        }
    }

    /// Render, then send through `mailer`. Transport errors come back as
    /// `DispatchError::Transport` with the original text.
    pub async fn send(
        &self,
        mailer: &dyn Mailer,
        record: &ScheduledEmail,
        related: &Related,
    ) -> Result<(), DispatchError> {
        let mail = self.render(record, related)?;
        mailer
            .send(&mail)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }

    fn render_reservation(
        &self,
        record: &ScheduledEmail,
        r: &Reservation,
    ) -> Result<OutgoingMail, DispatchError> {
        let email_type = EmailType::parse(&record.email_type)
            .ok_or_else(|| DispatchError::UnsupportedEmailType(record.email_type.clone()))?;

        let (subject, body) = match email_type {
            EmailType::ReservationReminder2Days | EmailType::ReservationReminder1Day => {
                let days = email_type.reminder_days().unwrap_or(1);
                (
                    format!("【{}】ご来店{}日前のお知らせ", self.shop_name, days),
                    self.reminder_body(r, days),
                )
            }
            EmailType::ReservationThanks3Days => (
                format!("【{}】ご来店ありがとうございました", self.shop_name),
                self.thanks_body(r),
            ),
            EmailType::ReservationThanks1Month => (
                format!("【{}】その後いかがお過ごしですか", self.shop_name),
                self.follow_up_body(r),
            ),
        };

        Ok(OutgoingMail {
            to: record.email.clone(),
            subject,
            body,
        })
    }

    fn reminder_body(&self, r: &Reservation, days: u32) -> String {
        format!(
            "{name} 様\n\n\
             ご予約日の{days}日前となりましたのでお知らせいたします。\n\n\
             {details}\n\
             ご来店を心よりお待ちしております。\n\
             ご予約の変更・キャンセルはお早めにご連絡ください。\n\n\
             {shop}\n",
            name = r.customer_name,
            days = days,
            details = reservation_details(r),
            shop = self.shop_name,
        )
    }

    fn thanks_body(&self, r: &Reservation) -> String {
        format!(
            "{name} 様\n\n\
             先日は{shop}にご来店いただき、誠にありがとうございました。\n\n\
             {details}\n\
             仕上がりで気になる点がございましたら、お気軽にご相談ください。\n\n\
             {shop}\n",
            name = r.customer_name,
            details = reservation_details(r),
            shop = self.shop_name,
        )
    }

    fn follow_up_body(&self, r: &Reservation) -> String {
        format!(
            "{name} 様\n\n\
             {date}に「{service}」でご来店いただいてから1ヶ月が経ちました。\n\
             その後の状態はいかがでしょうか。\n\n\
             次回のご予約もお待ちしております。\n\n\
             {shop}\n",
            name = r.customer_name,
            date = format_date(r.reservation_date),
            service = r.service_name,
            shop = self.shop_name,
        )
    }
}

fn reservation_details(r: &Reservation) -> String {
    format!(
        "■ご予約内容\n\
         予約番号：{code}\n\
         日時：{date} {time}\n\
         メニュー：{service}\n",
        code = r.reservation_code,
        date = format_date(r.reservation_date),
        time = r.start_time.format("%H:%M"),
        service = r.service_name,
    )
}

/// `2026年10月21日(水)`
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{}年{}月{}日({})",
        date.year(),
        date.month(),
        date.day(),
        weekday_ja(date.weekday())
    )
}

fn weekday_ja(w: Weekday) -> &'static str {
    match w {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}
