//! Word-compatible `.doc` export.
//!
//! The output is an HTML document, which Word opens as a `.doc`. It is not an
//! OOXML `.docx`.

/// Render `text` as HTML with one `<p>` per line.
pub fn export_doc(text: &str) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\n\
         body { font-family: Calibri, sans-serif; font-size: 11pt; }\n\
         p { margin-bottom: 0.5em; }\n</style>\n</head>\n<body>\n",
    );
    for line in text.split('\n') {
        html.push_str("<p>");
        html.push_str(&escape_html(line.trim_end_matches('\r')));
        html.push_str("</p>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_paragraph_per_line() {
        let html = export_doc("first\nsecond\r\n\nகாலை");
        assert_eq!(html.matches("<p>").count(), 4);
        assert!(html.contains("<p>first</p>"));
        assert!(html.contains("<p>second</p>"));
        assert!(html.contains("<p></p>"));
        assert!(html.contains("<p>காலை</p>"));
        assert!(html.contains("charset=\"UTF-8\""));
    }

    #[test]
    fn markup_is_escaped() {
        let html = export_doc("<script>alert('x')</script> & more");
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
    }
}
