/// Builds the `imageMogr2` processing query for a square CDN thumbnail.
///
/// The image is scaled to cover `size`x`size`, converted to `format` and
/// cropped around `position` (e.g. `center`, `north`).
pub fn img_more2(size: u32, position: &str, format: &str) -> String {
    let thumbnail = format!("thumbnail/!{size}x{size}r");
    let output = format!("crop/{size}x{size}");
    let gravity = format!("gravity/{position}");
    format!("imageMogr2/{thumbnail}/{format}quality/100/{gravity}/{output}")
}

/// [`img_more2`] with a centered webp crop.
pub fn img_thumbnail(size: u32) -> String {
    img_more2(size, "center", "webp")
}
