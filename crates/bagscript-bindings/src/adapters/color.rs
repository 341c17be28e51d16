use bagscript_engine::color::Color;
use rhai::{Array, Dynamic, FLOAT};

use crate::adapters::Foreign;
use crate::protocol::{
    attributes, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ColorValue(pub Color);

attributes! {
    ColorAttr {
        fields {
            Model => "model",
            Components => "components",
            Fill => "fill",
            Stroke => "stroke",
        }
        methods {}
    }
}

impl Wrapper for ColorValue {
    type Native = Color;

    fn native(&self) -> Color {
        self.0.clone()
    }
}

impl Identified for ColorValue {
    fn type_tag(&self) -> &'static str {
        "backend.color"
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl AttributeAccessible for ColorValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let value = match ColorAttr::from_name(name)? {
            ColorAttr::Model => Dynamic::from(self.0.model.as_str()),
            ColorAttr::Components => {
                let components: Array = self
                    .0
                    .components
                    .iter()
                    .map(|c| Dynamic::from(*c as FLOAT))
                    .collect();
                Dynamic::from_array(components)
            }
            ColorAttr::Fill => Dynamic::from(self.0.pdf_fill()),
            ColorAttr::Stroke => Dynamic::from(self.0.pdf_stroke()),
        };
        Some(value)
    }
}

impl Comparable for ColorValue {
    fn equals(&self, other: &Foreign) -> bool {
        matches!(other, Foreign::Color(o) if o.0 == self.0)
    }
}

impl Truthy for ColorValue {}
impl Operable for ColorValue {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attributes() {
        let red = ColorValue(Color::parse("red").unwrap());
        assert_eq!(red.display(), "red");
        let model = red.get_attribute("model").unwrap();
        assert_eq!(model.into_string().unwrap(), "rgb");
        let components = red.get_attribute("components").unwrap();
        assert_eq!(components.try_cast::<Array>().unwrap().len(), 3);
        assert!(red.equals(&Foreign::Color(ColorValue(Color::parse("red").unwrap()))));
    }
}
