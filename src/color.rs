use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellId;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: cell id → Color32
// ---------------------------------------------------------------------------

/// Gives every cell of a dataset its own colour, shared by all charts so a
/// cell looks the same in the scatter, time and percentage plots.
#[derive(Debug, Clone)]
pub struct CellColors {
    mapping: BTreeMap<CellId, Color32>,
    default_color: Color32,
}

impl CellColors {
    /// Assign colours in the given (first-occurrence) order.
    pub fn new(cells: &[CellId]) -> Self {
        let mapping = cells
            .iter()
            .cloned()
            .zip(generate_palette(cells.len()))
            .collect();
        CellColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, cell: &CellId) -> Color32 {
        self.mapping
            .get(cell)
            .copied()
            .unwrap_or(self.default_color)
    }
}

impl Default for CellColors {
    fn default() -> Self {
        CellColors::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(6);
        assert_eq!(palette.len(), 6);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_cell_falls_back_to_gray() {
        let colors = CellColors::new(&[CellId::Integer(1), CellId::Integer(2)]);
        assert_ne!(colors.color_for(&CellId::Integer(1)), Color32::GRAY);
        assert_eq!(colors.color_for(&CellId::Integer(9)), Color32::GRAY);
    }
}
