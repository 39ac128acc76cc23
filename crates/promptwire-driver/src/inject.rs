//! The injection routine evaluated inside the target page.
//!
//! Two-tier strategy: a structured editor-API probe first (bounded walk of
//! the framework's internal instance tree looking for an object shaped
//! `{dispatch, state.doc}`), then raw DOM writes plus synthetic input
//! events. The routine reports through a result marker on the page's global
//! scope, scoped to one injection attempt; the broker reads and deletes it.

use serde::Serialize;

use crate::config::SiteProfile;

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;

/// The embedded routine; a function expression applied to an options object.
const INJECT_ROUTINE: &str = include_str!("inject.js");

/// Options handed to the routine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InjectOptions<'a> {
    marker: &'a str,
    text: &'a str,
    input_selectors: &'a [String],
}

/// Build the full expression for one injection attempt.
///
/// The prompt text travels through `serde_json` so arbitrary content
/// (quotes, newlines, backslashes) stays a plain string literal in the page.
pub(crate) fn injection_expression(marker: &str, text: &str, profile: &SiteProfile) -> String {
    let opts = InjectOptions {
        marker,
        text,
        input_selectors: &profile.input_selectors,
    };
    // Serialization of a borrowed struct with string fields cannot fail.
    let opts = serde_json::to_string(&opts).expect("inject options serialize");
    format!("{}({});", INJECT_ROUTINE.trim_end(), opts)
}

/// Expression reading the result marker, or `null` when absent.
pub(crate) fn read_marker_expression(marker: &str) -> String {
    format!(
        "(() => {{ const m = window[{m}]; return m === undefined ? null : m; }})()",
        m = js_string(marker)
    )
}

/// Expression deleting the result marker after its single read.
pub(crate) fn delete_marker_expression(marker: &str) -> String {
    format!("delete window[{m}];", m = js_string(marker))
}

/// Expression reading the input surface's visible text ("" when absent).
pub(crate) fn input_text_expression(profile: &SiteProfile) -> String {
    format!(
        r#"(() => {{
            const selectors = {selectors};
            for (const sel of selectors) {{
                const el = document.querySelector(sel);
                if (!el) continue;
                if (el.tagName === 'TEXTAREA') return (el.value || '').trim();
                return (el.innerText || el.textContent || '').trim();
            }}
            return '';
        }})()"#,
        selectors = js_string_array(&profile.input_selectors)
    )
}

/// Expression focusing the input surface; returns whether it was found.
pub(crate) fn focus_input_expression(profile: &SiteProfile) -> String {
    format!(
        r#"(() => {{
            const selectors = {selectors};
            for (const sel of selectors) {{
                const el = document.querySelector(sel);
                if (el) {{ el.focus(); return true; }}
            }}
            return false;
        }})()"#,
        selectors = js_string_array(&profile.input_selectors)
    )
}

pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialize")
}

pub(crate) fn js_string_array(items: &[String]) -> String {
    serde_json::to_string(items).expect("string array serialize")
}
