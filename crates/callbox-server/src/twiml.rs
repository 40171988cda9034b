//! TwiML documents returned to the telephony platform.

/// Longest recording the platform is asked to capture, in seconds.
pub const MAX_RECORDING_SECS: u32 = 30;

/// Content type of every TwiML response.
pub const TWIML_CONTENT_TYPE: &str = "text/xml";

/// Speaks `greeting`, records the caller, then posts the recording to `action_url`.
pub fn record_voicemail(greeting: &str, action_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say>{greeting}</Say>
    <Record maxLength="{max_length}" action="{action}" />
</Response>
"#,
        greeting = escape_xml(greeting),
        max_length = MAX_RECORDING_SECS,
        action = escape_xml(action_url),
    )
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
