use web_sys as web;

#[inline]
pub fn show(document: &web::Document) {
    if let Some(el) = document.get_element_by_id("start-overlay") {
        let _ = el.set_attribute("style", "");
    }
}

#[inline]
pub fn hide(document: &web::Document) {
    if let Some(el) = document.get_element_by_id("start-overlay") {
        let _ = el.set_attribute("style", "display:none");
    }
}

/// One-line status readout under the playlist controls.
pub fn set_status(document: &web::Document, text: &str) {
    if let Some(el) = document.get_element_by_id("status-line") {
        el.set_text_content(Some(text));
    }
}
