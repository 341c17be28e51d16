use bagscript_engine::lang::Lang;
use rhai::Dynamic;

use crate::adapters::Foreign;
use crate::protocol::{
    attributes, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangValue(pub Lang);

attributes! {
    LangAttr {
        fields { Name => "name", Code => "code" }
        methods {}
    }
}

impl Wrapper for LangValue {
    type Native = Lang;

    fn native(&self) -> Lang {
        self.0.clone()
    }
}

impl Identified for LangValue {
    fn type_tag(&self) -> &'static str {
        "backend.lang"
    }

    fn display(&self) -> String {
        format!("lang({})", self.0.code)
    }
}

impl AttributeAccessible for LangValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match LangAttr::from_name(name)? {
            LangAttr::Name => Some(Dynamic::from(self.0.name.clone())),
            LangAttr::Code => Some(Dynamic::from(self.0.code)),
        }
    }
}

impl Comparable for LangValue {
    fn equals(&self, other: &Foreign) -> bool {
        matches!(other, Foreign::Lang(o) if o.0.code == self.0.code)
    }
}

impl Truthy for LangValue {}
impl Operable for LangValue {}
