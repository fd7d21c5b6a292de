//! Palette color normalization
//!
//! External libraries store dominant colors as `[r, g, b]` integer triples.
//! The store keeps at most [`MAX_COLORS`] of them per image as lowercase
//! `#rrggbb` strings, in source order.

/// Maximum number of colors kept per image
pub const MAX_COLORS: usize = 9;

/// Convert an RGB triple to a `#rrggbb` hex string.
///
/// Returns `None` when the slice is not exactly three components or any
/// component falls outside `0..=255`.
pub fn rgb_to_hex(rgb: &[i64]) -> Option<String> {
    let [r, g, b] = rgb else {
        return None;
    };

    let channel = |value: i64| u8::try_from(value).ok();

    Some(format!(
        "#{:02x}{:02x}{:02x}",
        channel(*r)?,
        channel(*g)?,
        channel(*b)?
    ))
}

/// Normalize a palette: drop invalid entries, keep order, cap at [`MAX_COLORS`].
pub fn normalize_palette<T: AsRef<[i64]>>(palette: &[T]) -> Vec<String> {
    palette
        .iter()
        .filter_map(|rgb| rgb_to_hex(rgb.as_ref()))
        .take(MAX_COLORS)
        .collect()
}

/// Check that a string is a `#rrggbb` color as produced by [`rgb_to_hex`]
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
