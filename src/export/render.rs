//! Transcript renderer: folds an ordered message batch into one HTML page

use std::fmt::Write as _;

use super::media::embed_html;
use super::{HistoryMessage, MaterializedMedia};

/// File name of the transcript inside the working directory
pub const TRANSCRIPT_FILE: &str = "index.html";

/// Shown in place of the sender for deleted or anonymous accounts
pub const UNKNOWN_SENDER: &str = "Deleted";

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
    body { background-color: #0e1621; color: #fff; font-family: sans-serif; margin: 0; padding: 20px; }
    .container { max-width: 700px; margin: 0 auto; display: flex; flex-direction: column; gap: 8px; }
    .message { max-width: 80%; padding: 8px 12px; border-radius: 12px; font-size: 15px; word-wrap: break-word; }
    .incoming { align-self: flex-start; background-color: #182533; }
    .outgoing { align-self: flex-end; background-color: #2b5278; }
    .sender-name { font-weight: bold; color: #64b5f6; font-size: 13px; margin-bottom: 4px; display: block; }
    .meta { font-size: 11px; color: #8fa0b5; text-align: right; margin-top: 4px; }
    img, video { max-width: 100%; border-radius: 8px; margin-bottom: 5px; display: block; }
    audio { width: 100%; margin-top: 5px; }
</style>
</head>
<body><div class="container">
"#;

const HTML_FOOTER: &str = "</div></body></html>\n";

/// Escape text for use in HTML content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Incremental transcript builder.
///
/// Messages must be pushed oldest first; every pushed message yields exactly
/// one block, even when it has neither text nor media.
#[derive(Debug)]
pub struct TranscriptBuilder {
    html: String,
    blocks: usize,
}

impl TranscriptBuilder {
    /// Start a transcript with the given page title
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            html: HTML_HEAD.replace("{title}", &escape_html(title)),
            blocks: 0,
        }
    }

    /// Append one message block
    pub fn push(&mut self, message: &HistoryMessage, media: Option<&MaterializedMedia>) {
        let class = if message.is_self_authored {
            "outgoing"
        } else {
            "incoming"
        };
        let sender = message
            .sender
            .as_ref()
            .map_or_else(|| UNKNOWN_SENDER.to_string(), |s| escape_html(&s.display_name));
        let text = message
            .text
            .as_deref()
            .map(|t| escape_html(t).replace("\r\n", "\n").replace('\n', "<br>"))
            .unwrap_or_default();
        let media_html = media.map(embed_html).unwrap_or_default();
        let stamp = message.timestamp.format("%d.%m.%Y %H:%M");

        let _ = writeln!(
            self.html,
            r#"<div class="message {class}" id="m{id}"><span class="sender-name">{sender}</span>{media_html}<div class="text">{text}</div><div class="meta">{stamp}</div></div>"#,
            id = message.id,
        );
        self.blocks += 1;
    }

    /// Number of blocks written so far
    #[must_use]
    pub const fn blocks(&self) -> usize {
        self.blocks
    }

    /// Close the document
    #[must_use]
    pub fn finish(mut self) -> String {
        self.html.push_str(HTML_FOOTER);
        self.html
    }
}
