//! Marker-delimited completion parsing.
//!
//! The model is instructed to wrap its outputs in literal markers:
//! `##BEGIN_HTML##...##END_HTML##` and
//! `##BEGIN_LOCAL_STORAGE##...##END_LOCAL_STORAGE##`. Generation is
//! best-effort: a missing marker pair yields `None` rather than an error,
//! and callers decide what partial output means.

/// Typed result of splitting a raw completion into its delimited regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedApp {
    /// HTML document text, `None` when the HTML marker pair is absent.
    pub html: Option<String>,
    /// localStorage seed JSON text, `None` when the marker pair is absent.
    pub storage: Option<String>,
}

/// Split a raw model completion into HTML and storage regions.
pub fn split_generated(raw: &str) -> GeneratedApp {
    GeneratedApp {
        html: extract_region(raw, "HTML"),
        storage: extract_region(raw, "LOCAL_STORAGE"),
    }
}

/// Find `##BEGIN_<marker>##...##END_<marker>##` and return the trimmed
/// content between the markers.
fn extract_region(raw: &str, marker: &str) -> Option<String> {
    let begin = format!("##BEGIN_{}##", marker);
    let end = format!("##END_{}##", marker);

    let start = match raw.find(&begin) {
        Some(pos) => pos + begin.len(),
        None => {
            log::warn!("No {} content found in the model response", marker.to_lowercase());
            return None;
        }
    };
    let stop = match raw[start..].find(&end) {
        Some(pos) => start + pos,
        None => {
            log::warn!("Unterminated {} region in the model response", marker.to_lowercase());
            return None;
        }
    };

    Some(raw[start..stop].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_regions_present() {
        let raw = "preamble\n##BEGIN_HTML##\n<html>A</html>\n##END_HTML##\n\
                   ##BEGIN_LOCAL_STORAGE##\n{\"todos\": []}\n##END_LOCAL_STORAGE##\ntrailer";
        let out = split_generated(raw);
        assert_eq!(out.html.as_deref(), Some("<html>A</html>"));
        assert_eq!(out.storage.as_deref(), Some("{\"todos\": []}"));
    }

    #[test]
    fn test_html_only() {
        let raw = "##BEGIN_HTML##<html></html>##END_HTML##";
        let out = split_generated(raw);
        assert_eq!(out.html.as_deref(), Some("<html></html>"));
        assert_eq!(out.storage, None);
    }

    #[test]
    fn test_no_markers() {
        let out = split_generated("the model rambled instead");
        assert_eq!(out.html, None);
        assert_eq!(out.storage, None);
    }

    #[test]
    fn test_unterminated_region() {
        let out = split_generated("##BEGIN_HTML##<html>never closed");
        assert_eq!(out.html, None);
    }

    #[test]
    fn test_content_is_trimmed() {
        let raw = "##BEGIN_HTML##   \n  <p>x</p>  \n ##END_HTML##";
        let out = split_generated(raw);
        assert_eq!(out.html.as_deref(), Some("<p>x</p>"));
    }

    #[test]
    fn test_empty_region_is_some_empty() {
        // Markers present but nothing between them: present-but-empty, which
        // callers treat the same as absent when deciding whether to persist.
        let out = split_generated("##BEGIN_LOCAL_STORAGE####END_LOCAL_STORAGE##");
        assert_eq!(out.storage.as_deref(), Some(""));
    }
}
