use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

pub fn canvas_by_id(document: &web::Document, id: &str) -> anyhow::Result<web::HtmlCanvasElement> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| anyhow::anyhow!("missing #{id}"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{e:?}")))
}

pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) {
    if let Some(w) = web::window() {
        let dpr = w.device_pixel_ratio();
        let rect = canvas.get_bounding_client_rect();
        let w_px = (rect.width() * dpr) as u32;
        let h_px = (rect.height() * dpr) as u32;
        canvas.set_width(w_px.max(1));
        canvas.set_height(h_px.max(1));
    }
}

#[inline]
pub fn add_click_listener(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) {
    if let Some(el) = document.get_element_by_id(element_id) {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

/// Toggle the `hidden` class on every chrome element. Returns the new
/// hidden state.
pub fn toggle_chrome(document: &web::Document) -> bool {
    let hidden = chrome_hidden(document);
    set_chrome_hidden(document, !hidden);
    !hidden
}

pub fn chrome_hidden(document: &web::Document) -> bool {
    document
        .get_element_by_id("chrome")
        .map(|el| el.class_list().contains("hidden"))
        .unwrap_or(false)
}

pub fn set_chrome_hidden(document: &web::Document, hidden: bool) {
    for id in ["chrome", "controls", "search-panel"] {
        if let Some(el) = document.get_element_by_id(id) {
            let cl = el.class_list();
            let _ = if hidden {
                cl.add_1("hidden")
            } else {
                cl.remove_1("hidden")
            };
        }
    }
}

pub fn search_panel_open(document: &web::Document) -> bool {
    document
        .get_element_by_id("search-panel")
        .map(|el| el.class_list().contains("open"))
        .unwrap_or(false)
}

pub fn set_search_panel_open(document: &web::Document, open: bool) {
    if let Some(el) = document.get_element_by_id("search-panel") {
        let cl = el.class_list();
        let _ = if open {
            cl.add_1("open")
        } else {
            cl.remove_1("open")
        };
    }
}
