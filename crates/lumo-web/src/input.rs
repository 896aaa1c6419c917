use glam::Vec2;
use web_sys as web;

/// Pointer state shared between the event closures and the frame loop.
#[derive(Default, Clone, Copy)]
pub struct PointerState {
    pub pos: Vec2,
    pub over_canvas: bool,
    pub down: bool,
    pub dragging: bool,
}

/// Client (CSS px) coordinates to canvas backing-store pixels.
#[inline]
pub fn pointer_canvas_px(
    client_x: f32,
    client_y: f32,
    canvas: &web::HtmlCanvasElement,
) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    let x_css = client_x - rect.left() as f32;
    let y_css = client_y - rect.top() as f32;
    let w = (rect.width() as f32).max(1.0);
    let h = (rect.height() as f32).max(1.0);
    Vec2::new(
        (x_css / w) * canvas.width() as f32,
        (y_css / h) * canvas.height() as f32,
    )
}
