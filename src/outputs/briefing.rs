//! Daily briefing email body.
//!
//! The briefing is a compact HTML summary of the digest:
//!
//! - a header with the date, the worst air-quality reading and the Chapala level
//! - an environment section and a Chivas section with up to
//!   [`BriefingSettings::max_items`] headlines each
//! - a footer with a greeting and a button to the full dashboard
//!
//! Delivery is left to whatever sends the mail. This module only composes
//! the message and writes it next to the digest:
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── digest.json
//!     └── briefing.html
//! ```

use crate::config::BriefingSettings;
use crate::models::{Digest, NewsItem};
use crate::utils::{day_month, escape_html};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

const ENVIRONMENT_COLOR: &str = "#27ae60";
const SPORTS_COLOR: &str = "#c0392b";

/// A composed briefing, ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq)]
pub struct Briefing {
    pub subject: String,
    pub sender_name: String,
    pub recipient: Option<String>,
    pub html: String,
}

/// Build the briefing for `digest`.
#[instrument(level = "info", skip_all, fields(date = %digest.local_date))]
pub fn compose(digest: &Digest, settings: &BriefingSettings) -> Briefing {
    let date = day_month(&digest.local_date);

    let mut html = String::new();
    html.push_str("<html>\n  <body style=\"font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; color: #333; line-height: 1.4;\">\n");
    html.push_str(&header(digest, &date));
    html.push_str(&section(
        "🌱 Medio Ambiente",
        ENVIRONMENT_COLOR,
        "margin-bottom: 15px;",
        &digest.environment_news,
        settings.max_items,
    ));
    html.push_str(&section(
        "🐐 Chivas",
        SPORTS_COLOR,
        "margin-top: 30px; margin-bottom: 15px;",
        &digest.sports_news,
        settings.max_items,
    ));
    html.push_str(&footer(settings));
    html.push_str("  </body>\n</html>\n");

    info!(
        environment = digest.environment_news.len().min(settings.max_items),
        sports = digest.sports_news.len().min(settings.max_items),
        "Composed briefing"
    );

    Briefing {
        subject: format!("📊 Briefing {date}"),
        sender_name: settings.sender_name.clone(),
        recipient: settings.recipient.clone(),
        html,
    }
}

fn header(digest: &Digest, date: &str) -> String {
    let (status, imeca) = match &digest.worst_station {
        Some(worst) => (escape_html(worst.status.label()), worst.imeca.to_string()),
        None => ("N/A".to_string(), "N/A".to_string()),
    };
    let level = digest
        .chapala
        .as_ref()
        // Shortest form that keeps a decimal: 94.5, 95.0
        .map(|c| format!("{:?}", c.level_msnm))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"    <div style="margin-bottom: 25px;">
      <h2 style="color: #2c3e50; margin: 0 0 10px 0;">☀️ Reporte: {date}</h2>
      <div style="background-color: #f8f9fa; padding: 10px 15px; border-radius: 6px; border-left: 4px solid #1f77b4; font-size: 14px;">
        🍃 <b>Aire:</b> {status} ({imeca} IMECA)<br>
        💧 <b>Chapala:</b> {level} msnm
      </div>
    </div>
"#,
        date = escape_html(date),
    )
}

fn section(title: &str, color: &str, spacing: &str, items: &[NewsItem], max_items: usize) -> String {
    let mut out = format!(
        "    <h3 style=\"color: {color}; {spacing} font-size: 16px; text-transform: uppercase; letter-spacing: 1px;\">{title}</h3>\n"
    );

    if items.is_empty() {
        out.push_str("    <p style=\"font-size: 12px; color: #777;\">Sin novedades hoy.</p>\n");
        return out;
    }

    for item in items.iter().take(max_items) {
        out.push_str(&format!(
            r#"    <div style="margin-bottom: 15px;">
      <div style="font-weight: bold; font-size: 14px; margin-bottom: 2px;">{title}</div>
      <a href="{link}" style="color: {color}; text-decoration: none; font-size: 12px;">Leer en {source} &#10138;</a>
    </div>
"#,
            title = escape_html(&item.title),
            link = escape_html(&item.link),
            source = escape_html(&item.source),
        ));
    }
    out
}

fn footer(settings: &BriefingSettings) -> String {
    let greeting = match settings.recipient_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Estas son las noticias del día de hoy, {}.", escape_html(name)),
        _ => "Estas son las noticias del día de hoy.".to_string(),
    };

    format!(
        r#"    <br>
    <div style="border-top: 1px solid #eee; padding-top: 20px; text-align: center; font-size: 13px;">
      <p style="margin-bottom: 10px;">{greeting}</p>
      <a href="{url}" style="background-color: #1f77b4; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; font-weight: bold; display: inline-block;">Acceder al Dashboard Completo</a>
      <p style="margin-top: 15px; color: #999; font-size: 11px;">Que tengas un excelente día.</p>
    </div>
"#,
        url = escape_html(&settings.dashboard_url),
    )
}

/// Write the briefing body to `{output_dir}/{date}/briefing.html`.
///
/// Returns the path written.
#[instrument(level = "info", skip(briefing))]
pub async fn write_briefing(briefing: &Briefing, output_dir: &str, date: &str) -> Result<PathBuf, Box<dyn Error>> {
    let dir = Path::new(output_dir).join(date);
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create briefing dir");
        return Err(e.into());
    }

    let path = dir.join("briefing.html");
    fs::write(&path, &briefing.html).await?;
    info!(path = %path.display(), subject = %briefing.subject, "Wrote briefing");
    Ok(path)
}
