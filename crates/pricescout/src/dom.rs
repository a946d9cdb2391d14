//! JavaScript snippets for element operations on live pages.
//!
//! Every element operation is one self-contained script: it walks the
//! [`ElementQuery`] from `document`, performs the operation on the selected
//! element and returns `{ found, count, value }`.
//!
//! ## Security: JS encoding
//!
//! Locator steps are embedded as a JSON literal. Free-form strings (form
//! values, attribute names, storage values) go through
//! [`sanitize_js_string`] and are only ever placed inside string literals.

use serde::Deserialize;

use crate::locator::ElementQuery;

/// Operation performed on the element an [`ElementQuery`] selects.
#[derive(Debug, Clone, Copy)]
pub enum DomOp<'a> {
    Count,
    Visible,
    Click,
    Fill(&'a str),
    PressEnter,
    Attribute(&'a str),
    Text,
    InnerHtml,
}

/// Parsed reply of an element script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomReply {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl DomReply {
    /// The reply value as an optional string.
    pub fn string_value(&self) -> Option<String> {
        self.value.as_str().map(String::from)
    }
}

const RESOLVE_PRELUDE: &str = r#"
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const findAll = (root, locator) => {
        if (locator.kind === 'css') {
            return Array.from(root.querySelectorAll(locator.value));
        }
        const hits = Array.from(root.querySelectorAll('*'))
            .filter((e) => norm(e.textContent) === locator.value);
        return hits.filter((e) => !Array.from(e.children).some((c) => norm(c.textContent) === locator.value));
    };
    let root = document;
    for (let i = 0; i < steps.length - 1; i++) {
        const next = findAll(root, steps[i].locator)[steps[i].nth];
        if (!next) { return { found: false, count: 0, value: null }; }
        root = next;
    }
    const last = steps[steps.length - 1];
    const matches = findAll(root, last.locator);
    const el = matches[last.nth];
    if (!el) { return { found: false, count: matches.length, value: null }; }
"#;

/// Build the script for `op` on `query`.
pub fn build_element_script(query: &ElementQuery, op: DomOp<'_>) -> String {
    let steps = serde_json::to_string(query.steps()).unwrap_or_else(|_| "[]".to_string());

    let body = match op {
        DomOp::Count => "return { found: true, count: matches.length, value: null };".to_string(),
        DomOp::Visible => r#"
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            const visible = rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none'
                && parseFloat(style.opacity || '1') > 0;
            return { found: true, count: matches.length, value: visible };"#
            .to_string(),
        DomOp::Click => r#"
            el.scrollIntoView({ block: 'center' });
            el.click();
            return { found: true, count: matches.length, value: true };"#
            .to_string(),
        DomOp::Fill(text) => format!(
            r#"
            el.focus();
            const proto = Object.getPrototypeOf(el);
            const desc = Object.getOwnPropertyDescriptor(proto, 'value');
            if (desc && desc.set) {{ desc.set.call(el, '{}'); }} else {{ el.value = '{}'; }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ found: true, count: matches.length, value: true }};"#,
            sanitize_js_string(text),
            sanitize_js_string(text)
        ),
        DomOp::PressEnter => r#"
            el.focus();
            for (const type of ['keydown', 'keypress', 'keyup']) {
                el.dispatchEvent(new KeyboardEvent(type, { key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true }));
            }
            if (el.form) {
                if (el.form.requestSubmit) { el.form.requestSubmit(); } else { el.form.submit(); }
            }
            return { found: true, count: matches.length, value: true };"#
            .to_string(),
        DomOp::Attribute(name) => format!(
            "return {{ found: true, count: matches.length, value: el.getAttribute('{}') }};",
            sanitize_js_string(name)
        ),
        DomOp::Text => {
            "return { found: true, count: matches.length, value: el.textContent };".to_string()
        }
        DomOp::InnerHtml => {
            "return { found: true, count: matches.length, value: el.innerHTML };".to_string()
        }
    };

    format!("(() => {{\n    const steps = {steps};\n{RESOLVE_PRELUDE}\n{body}\n}})()")
}

/// Script that reports the document's ready state and resource count.
pub fn ready_state_script() -> &'static str {
    r#"(() => ({
        readyState: document.readyState,
        resources: performance.getEntriesByType('resource').length
    }))()"#
}

/// Script that returns the local storage of the current origin.
pub fn local_storage_script() -> &'static str {
    r#"(() => {
        const items = [];
        try {
            for (let i = 0; i < localStorage.length; i++) {
                const name = localStorage.key(i);
                items.push({ name, value: localStorage.getItem(name) });
            }
        } catch (e) {}
        return { origin: location.origin, localStorage: items };
    })()"#
}

/// Script that writes `entries` into local storage when the page's origin
/// is `origin`. Existing keys are left alone.
pub fn seed_local_storage_script(origin: &str, entries: &[(String, String)]) -> String {
    let writes: String = entries
        .iter()
        .map(|(name, value)| {
            format!(
                "if (localStorage.getItem('{n}') === null) {{ localStorage.setItem('{n}', '{v}'); }}\n",
                n = sanitize_js_string(name),
                v = sanitize_js_string(value)
            )
        })
        .collect();
    format!(
        "(() => {{ try {{ if (location.origin !== '{}') {{ return; }}\n{writes}}} catch (e) {{}} }})()",
        sanitize_js_string(origin)
    )
}

/// Script that records the delivery postcode and country for the storefront.
pub fn delivery_location_script(postcode: &str, country: &str) -> String {
    format!(
        r#"(() => {{
            localStorage.setItem('ebay_postcode', '{}');
            localStorage.setItem('ebay_country', '{}');
            return {{ success: true }};
        }})()"#,
        sanitize_js_string(postcode),
        sanitize_js_string(country)
    )
}

/// Script that steps back one history entry.
pub fn history_back_script() -> &'static str {
    "(() => { history.back(); return { success: true }; })()"
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes all characters that could break out of a JS string context:
/// - Backslashes, single/double quotes, backticks
/// - Newlines, carriage returns, tabs, line/paragraph separators
/// - Angle brackets (to keep `</script>` out of reflected values)
/// - Null bytes are dropped
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
