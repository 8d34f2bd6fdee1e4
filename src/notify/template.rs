//! Message bodies for SOS notices
//!
//! Times are rendered in a fixed local offset (IST by default) in the
//! `dd/mm/yyyy, hh:mm:ss am` form dispatchers are used to.

use crate::notify::SosNotice;
use chrono::{DateTime, FixedOffset, Offset as _, Utc};

const LOCAL_TIME_FORMAT: &str = "%d/%m/%Y, %I:%M:%S %P";

/// Format an instant in the given offset from UTC
///
/// An offset outside ±24h falls back to UTC.
pub fn local_time(at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format(LOCAL_TIME_FORMAT).to_string()
}

pub fn email_subject(notice: &SosNotice) -> String {
    format!("🚨 SOS ALERT: {}", notice.driver.display_name())
}

/// Rich HTML body for the email channel
pub fn email_html(notice: &SosNotice, utc_offset_minutes: i32) -> String {
    let driver = &notice.driver;
    let name = escape_html(&driver.display_name());
    let reg_no = escape_html(&driver.reg_no);
    let phone = escape_html(&driver.phone);
    let location = escape_html(&notice.location_name);
    let map_link = notice.coords.map_link();
    let time = local_time(notice.alerted_at, utc_offset_minutes);
    let (lat, lng) = (notice.coords.lat, notice.coords.lng);

    format!(
        r#"<div style="font-family: Arial, sans-serif; background:#f4f6f8; padding:16px;">
  <div style="max-width:520px; margin:auto; background:#ffffff; border-radius:12px; overflow:hidden;">
    <div style="background:#dc2626; color:#ffffff; padding:16px; text-align:center;">
      <h2 style="margin:0; font-size:20px;">🚨 SOS ALERT</h2>
      <p style="margin:4px 0 0; font-size:13px;">Immediate attention required</p>
    </div>
    <div style="padding:16px; color:#111827; font-size:14px; line-height:1.5;">
      <p style="margin:0 0 6px;"><strong>Driver</strong><br />{name} <span style="color:#6b7280;">({reg_no})</span></p>
      <p style="margin:0;"><strong>Phone</strong><br /><a href="tel:{phone}" style="color:#2563eb; text-decoration:none;">{phone}</a></p>
      <hr style="border:none; border-top:1px solid #e5e7eb; margin:14px 0;" />
      <p style="margin:0 0 6px;"><strong>Location</strong><br />{location}</p>
      <p style="margin:0; color:#6b7280; font-size:13px;">Coordinates: {lat}, {lng}</p>
      <div style="text-align:center; margin:16px 0;">
        <a href="{map_link}" target="_blank" style="display:inline-block; background:#dc2626; color:#ffffff; padding:10px 18px; border-radius:999px; text-decoration:none;">📍 View on Google Maps</a>
      </div>
      <div style="background:#f9fafb; padding:10px; border-radius:8px; text-align:center; font-size:13px;">
        <strong>Alert Time</strong><br />{time}
      </div>
    </div>
    <div style="background:#f3f4f6; padding:10px; text-align:center; font-size:12px; color:#6b7280;">
      This is an automated emergency alert. Please respond immediately.
    </div>
  </div>
</div>"#
    )
}

/// Short plain-text body for the SMS channel
pub fn sms_text(notice: &SosNotice, utc_offset_minutes: i32) -> String {
    format!(
        "SOS ALERT: {} ({}) tel:{} at {}. Map: {} Time: {}",
        notice.driver.display_name(),
        notice.driver.reg_no,
        notice.driver.phone,
        notice.location_name,
        notice.coords.map_link(),
        local_time(notice.alerted_at, utc_offset_minutes),
    )
}

fn escape_html(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}
