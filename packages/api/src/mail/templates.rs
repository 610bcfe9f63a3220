use antimatter::model::AppRecord;

/// Subject and HTML body of the "please review" mail.
pub fn review_request(app: &AppRecord) -> (String, String) {
    let subject = format!("[Anti-Matter] New app pending review: {}", app.name);

    let html = format!(
        r#"<h2>New app submitted for review</h2>
<p><strong>App:</strong> {name}</p>
<p><strong>Developer:</strong> {developer}</p>
<p><strong>Version:</strong> {version}</p>
<p><strong>Category:</strong> {category}</p>
<p><strong>App ID:</strong> {id}</p>
<p>Please review and approve it in the admin dashboard.</p>
"#,
        name = escape_html(&app.name),
        developer = escape_html(&app.developer_name),
        version = escape_html(&app.version),
        category = escape_html(app.category.as_str()),
        id = escape_html(&app.id),
    );

    (subject, html)
}

pub fn escape_html(s: &str) -> String {
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
