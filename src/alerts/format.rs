//! Alert formatter
//!
//! Renders one ComplianceRecord into the channel payloads: Slack blocks, an
//! HTML email with plain-text fallback, and a compact WhatsApp text body.
//! Everything here is pure; the same record always renders to the same bytes.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::detection::PpeItem;
use crate::models::ComplianceRecord;

/// All channel renderings of one alert
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    /// Plain one-paragraph summary, also used as the Slack fallback text
    pub summary: String,
    pub slack_blocks: Value,
    pub email_subject: String,
    pub email_html: String,
    pub email_text: String,
    pub whatsapp_body: String,
}

/// Render every channel payload for a record
pub fn render(record: &ComplianceRecord) -> AlertMessage {
    AlertMessage {
        summary: summary_text(record),
        slack_blocks: slack_blocks(record),
        email_subject: format!(
            "PPE Compliance Alert - {} ({})",
            record.worker_name, record.worker_id
        ),
        email_html: email_html(record),
        email_text: email_text(record),
        whatsapp_body: whatsapp_body(record),
    }
}

fn item_glyph(item: PpeItem) -> &'static str {
    match item {
        PpeItem::Helmet => "🪖",
        PpeItem::Mask => "😷",
        PpeItem::Gloves => "🧤",
        PpeItem::Jacket => "🦺",
    }
}

fn item_title(item: PpeItem) -> &'static str {
    match item {
        PpeItem::Helmet => "Helmet",
        PpeItem::Mask => "Mask",
        PpeItem::Gloves => "Gloves",
        PpeItem::Jacket => "Jacket",
    }
}

fn fmt_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_percent(confidence: f32) -> String {
    format!("{:.1}%", confidence * 100.0)
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

/// Per-item state pulled off the record in fixed category order
fn items(record: &ComplianceRecord) -> [(PpeItem, bool, f32); 4] {
    [
        (PpeItem::Helmet, record.helmet_detected, record.helmet_confidence),
        (PpeItem::Mask, record.mask_detected, record.mask_confidence),
        (PpeItem::Gloves, record.gloves_detected, record.gloves_confidence),
        (PpeItem::Jacket, record.jacket_detected, record.jacket_confidence),
    ]
}

fn missing_labels(record: &ComplianceRecord) -> String {
    let missing: Vec<&str> = items(record)
        .into_iter()
        .filter(|&(_, detected, _)| !detected)
        .map(|(item, _, _)| item.label())
        .collect();
    missing.join(", ")
}

fn summary_text(record: &ComplianceRecord) -> String {
    format!(
        "PPE Non-Compliance Alert for {} (ID: {})\n\
         Missing PPE: {}\n\
         Compliance Score: {:.1}%\n\
         Location: {}\n\
         Time: {}",
        record.worker_name,
        record.worker_id,
        missing_labels(record),
        record.compliance_score,
        or_unknown(&record.location),
        fmt_timestamp(&record.recorded_at),
    )
}

fn status_line(record: &ComplianceRecord) -> &'static str {
    if record.is_compliant {
        "✅ Compliant"
    } else {
        "❌ Non-Compliant"
    }
}

fn slack_blocks(record: &ComplianceRecord) -> Value {
    let mut detail_lines = Vec::new();
    for (item, detected, confidence) in items(record) {
        if detected {
            detail_lines.push(format!(
                "{} {}: ✅ ({})",
                item_glyph(item),
                item_title(item),
                fmt_percent(confidence)
            ));
        } else {
            detail_lines.push(format!("{} {}: ❌", item_glyph(item), item_title(item)));
        }
    }

    json!([
        {
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": "🚨 PPE Compliance Alert"
            }
        },
        {
            "type": "section",
            "fields": [
                {
                    "type": "mrkdwn",
                    "text": format!("*Worker:* {}\n*ID:* {}", record.worker_name, record.worker_id)
                },
                {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Department:* {}\n*Location:* {}",
                        or_unknown(&record.department),
                        or_unknown(&record.location)
                    )
                },
                {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Time:* {}\n*Shift:* {}",
                        fmt_timestamp(&record.recorded_at),
                        or_unknown(&record.shift)
                    )
                },
                {
                    "type": "mrkdwn",
                    "text": format!(
                        "*Compliance Score:* {:.1}%\n*Status:* {}",
                        record.compliance_score,
                        status_line(record)
                    )
                }
            ]
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*PPE Detection Results:*\n{}", detail_lines.join("\n"))
            }
        },
        { "type": "divider" }
    ])
}

fn email_html(record: &ComplianceRecord) -> String {
    let status_color = if record.is_compliant { "#28a745" } else { "#dc3545" };
    let status_text = if record.is_compliant { "COMPLIANT" } else { "NON-COMPLIANT" };

    let mut ppe_items = String::new();
    for (item, detected, confidence) in items(record) {
        let state = if detected {
            format!(
                r#"<span class="compliant">✅ Detected</span> (Confidence: {})"#,
                fmt_percent(confidence)
            )
        } else {
            r#"<span class="non-compliant">❌ Missing</span>"#.to_string()
        };
        ppe_items.push_str(&format!(
            "            <div class=\"ppe-item\">{} {}: {}</div>\n",
            item_glyph(item),
            item_title(item),
            state
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; }}
        .container {{ max-width: 600px; margin: 0 auto; }}
        .header {{ background-color: {status_color}; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f8f9fa; }}
        .details {{ background-color: white; padding: 15px; margin: 10px 0; border-radius: 5px; }}
        .ppe-item {{ margin: 5px 0; }}
        .compliant {{ color: #28a745; }}
        .non-compliant {{ color: #dc3545; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>🚨 PPE Compliance Alert</h1>
            <h2>Status: {status_text}</h2>
        </div>
        <div class="content">
            <div class="details">
                <h3>Worker Information</h3>
                <p><strong>Name:</strong> {name}</p>
                <p><strong>ID:</strong> {id}</p>
                <p><strong>Department:</strong> {department}</p>
                <p><strong>Location:</strong> {location}</p>
                <p><strong>Shift:</strong> {shift}</p>
                <p><strong>Time:</strong> {time}</p>
            </div>

            <div class="details">
                <h3>Compliance Score: {score:.1}%</h3>
            </div>

            <div class="details">
                <h3>PPE Detection Results</h3>
{ppe_items}            </div>
        </div>
    </div>
</body>
</html>
"#,
        status_color = status_color,
        status_text = status_text,
        name = record.worker_name,
        id = record.worker_id,
        department = or_unknown(&record.department),
        location = or_unknown(&record.location),
        shift = or_unknown(&record.shift),
        time = fmt_timestamp(&record.recorded_at),
        score = record.compliance_score,
        ppe_items = ppe_items,
    )
}

fn email_text(record: &ComplianceRecord) -> String {
    let mut detail_lines = String::new();
    for (item, detected, confidence) in items(record) {
        if detected {
            detail_lines.push_str(&format!(
                "- {}: ✅ Detected ({})\n",
                item_title(item),
                fmt_percent(confidence)
            ));
        } else {
            detail_lines.push_str(&format!("- {}: ❌ Missing\n", item_title(item)));
        }
    }

    format!(
        "PPE COMPLIANCE ALERT\n\
         ===================\n\
         \n\
         Worker: {} (ID: {})\n\
         Department: {}\n\
         Location: {}\n\
         Shift: {}\n\
         Time: {}\n\
         \n\
         Compliance Score: {:.1}%\n\
         Status: {}\n\
         \n\
         PPE Detection Results:\n\
         {}\n\
         Please take appropriate action to ensure worker safety compliance.\n",
        record.worker_name,
        record.worker_id,
        or_unknown(&record.department),
        or_unknown(&record.location),
        or_unknown(&record.shift),
        fmt_timestamp(&record.recorded_at),
        record.compliance_score,
        if record.is_compliant { "COMPLIANT" } else { "NON-COMPLIANT" },
        detail_lines,
    )
}

fn whatsapp_body(record: &ComplianceRecord) -> String {
    let mut detail_lines = String::new();
    for (item, detected, _) in items(record) {
        detail_lines.push_str(&format!(
            "{} {}: {}\n",
            item_glyph(item),
            item_title(item),
            if detected { "✅" } else { "❌" }
        ));
    }

    format!(
        "🚨 *PPE Compliance Alert*\n\
         \n\
         *Worker:* {}\n\
         *ID:* {}\n\
         *Department:* {}\n\
         *Location:* {}\n\
         *Time:* {}\n\
         \n\
         *Compliance Score:* {:.1}%\n\
         *Status:* {}\n\
         \n\
         *PPE Detection:*\n\
         {}\n\
         Please take immediate action if non-compliant.",
        record.worker_name,
        record.worker_id,
        or_unknown(&record.department),
        or_unknown(&record.location),
        fmt_timestamp(&record.recorded_at),
        record.compliance_score,
        status_line(record),
        detail_lines,
    )
}
