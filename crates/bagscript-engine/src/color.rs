//! Colour specifications

use std::fmt;

use crate::error::{EngineError, Result};

/// Colour model of a [`Color`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorModel {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorModel::Gray => "gray",
            ColorModel::Rgb => "rgb",
            ColorModel::Cmyk => "cmyk",
        }
    }
}

/// A parsed colour, components in the range 0..=1
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    pub model: ColorModel,
    pub components: Vec<f64>,
    /// The text the colour was parsed from
    pub source: String,
}

const NAMED: &[(&str, ColorModel, &[f64])] = &[
    ("black", ColorModel::Gray, &[0.0]),
    ("white", ColorModel::Gray, &[1.0]),
    ("gray", ColorModel::Gray, &[0.5]),
    ("red", ColorModel::Rgb, &[1.0, 0.0, 0.0]),
    ("green", ColorModel::Rgb, &[0.0, 1.0, 0.0]),
    ("blue", ColorModel::Rgb, &[0.0, 0.0, 1.0]),
    ("cyan", ColorModel::Cmyk, &[1.0, 0.0, 0.0, 0.0]),
    ("magenta", ColorModel::Cmyk, &[0.0, 1.0, 0.0, 0.0]),
    ("yellow", ColorModel::Cmyk, &[0.0, 0.0, 1.0, 0.0]),
];

impl Color {
    /// Parse a named colour, `#rrggbb`, `#rgb` or `rgb(r,g,b)`
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        let lower = text.to_ascii_lowercase();
        if let Some((_, model, components)) = NAMED.iter().find(|(name, _, _)| *name == lower) {
            return Ok(Color {
                model: *model,
                components: components.to_vec(),
                source: text.to_string(),
            });
        }
        if let Some(hex) = lower.strip_prefix('#') {
            return Self::parse_hex(hex, text);
        }
        if let Some(inner) = lower.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
            let components = inner
                .split(',')
                .map(|part| part.trim().parse::<u8>().map(|v| v as f64 / 255.0))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| EngineError::Color(input.to_string()))?;
            if components.len() == 3 {
                return Ok(Color {
                    model: ColorModel::Rgb,
                    components,
                    source: text.to_string(),
                });
            }
        }
        Err(EngineError::Color(input.to_string()))
    }

    fn parse_hex(hex: &str, source: &str) -> Result<Self> {
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(EngineError::Color(source.to_string())),
        };
        let mut components = Vec::with_capacity(3);
        for i in 0..3 {
            let byte = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16)
                .map_err(|_| EngineError::Color(source.to_string()))?;
            components.push(byte as f64 / 255.0);
        }
        Ok(Color {
            model: ColorModel::Rgb,
            components,
            source: source.to_string(),
        })
    }

    /// PDF fill operator for this colour, e.g. `1 0 0 rg`
    pub fn pdf_fill(&self) -> String {
        let op = match self.model {
            ColorModel::Gray => "g",
            ColorModel::Rgb => "rg",
            ColorModel::Cmyk => "k",
        };
        format!("{} {}", self.pdf_components(), op)
    }

    /// PDF stroke operator for this colour, e.g. `1 0 0 RG`
    pub fn pdf_stroke(&self) -> String {
        let op = match self.model {
            ColorModel::Gray => "G",
            ColorModel::Rgb => "RG",
            ColorModel::Cmyk => "K",
        };
        format!("{} {}", self.pdf_components(), op)
    }

    fn pdf_components(&self) -> String {
        self.components
            .iter()
            .map(|c| crate::units::format_number(*c))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        let red = Color::parse("Red").unwrap();
        assert_eq!(red.model, ColorModel::Rgb);
        assert_eq!(red.pdf_fill(), "1 0 0 rg");
        assert_eq!(Color::parse("black").unwrap().pdf_stroke(), "0 G");
    }

    #[test]
    fn test_hex_colors() {
        let c = Color::parse("#ff0000").unwrap();
        assert_eq!(c.components, vec![1.0, 0.0, 0.0]);
        let short = Color::parse("#f00").unwrap();
        assert_eq!(short.components, c.components);
        assert_eq!(short.to_string(), "#f00");
    }

    #[test]
    fn test_rgb_function() {
        let c = Color::parse("rgb(0, 255, 0)").unwrap();
        assert_eq!(c.components, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_invalid() {
        assert!(Color::parse("#12").is_err());
        assert!(Color::parse("notacolor").is_err());
        assert!(Color::parse("rgb(1,2)").is_err());
    }
}
