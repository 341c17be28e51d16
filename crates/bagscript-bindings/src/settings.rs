//! Typesetting settings of a text, addressed with string keys.
//!
//! A key is either the display name (`SettingHAlign`) or the setting name
//! in any case, with `_` and `-` ignored (`halign`, `font_weight`,
//! `border-top-width`). Unknown keys are logged and ignored.

use std::cell::RefCell;
use std::rc::Rc;

use bagscript_engine::color::Color;
use bagscript_engine::frontend::{
    BorderStyle, FontFamily, FontStyle, HAlign, SettingType, SettingValue, Text,
    TextDecorationLine, TypesettingSettings, VAlign, FONT_WEIGHT_BOLD, FONT_WEIGHT_REGULAR,
    MAX_FONT_WEIGHT,
};
use bagscript_engine::ScaledPoint;
use rhai::{Array, Dynamic, Map, FLOAT, INT};

use crate::adapters::color::ColorValue;
use crate::adapters::frontend::FontFamilyHandle;
use crate::adapters::bag::SpValue;
use crate::adapters::Foreign;
use crate::args::{dynamic_type_name, expect, Args};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy, Wrapper,
};

/// Resolve a script key to a setting
pub fn lookup_key(key: &str) -> Option<SettingType> {
    if let Some(setting) = SettingType::from_name(key) {
        return Some(setting);
    }
    let wanted: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    SettingType::ALL.iter().copied().find(|setting| {
        let short = setting.name().trim_start_matches("Setting");
        short.eq_ignore_ascii_case(&wanted)
    })
}

fn enum_value<T>(
    value: &Dynamic,
    context: &str,
    choices: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    let text: String = expect(value, context)?;
    parse(&text).ok_or_else(|| {
        BindingError::argument_type(context, format!("one of {}", choices), format!("{:?}", text))
    })
}

/// Coerce a script value according to the rule for `key`
pub fn coerce(key: SettingType, value: &Dynamic) -> Result<SettingValue> {
    use SettingType as S;
    let context = format!("settings.{}", key.name());
    let context = context.as_str();
    let converted = match key {
        S::BackgroundColor
        | S::BorderBottomColor
        | S::BorderLeftColor
        | S::BorderRightColor
        | S::BorderTopColor
        | S::Color => SettingValue::Color(expect::<Color>(value, context)?),
        S::BorderBottomLeftRadius
        | S::BorderBottomRightRadius
        | S::BorderTopLeftRadius
        | S::BorderTopRightRadius
        | S::BorderBottomWidth
        | S::BorderLeftWidth
        | S::BorderRightWidth
        | S::BorderTopWidth
        | S::Height
        | S::IndentLeft
        | S::Leading
        | S::MarginBottom
        | S::MarginLeft
        | S::MarginRight
        | S::MarginTop
        | S::PaddingBottom
        | S::PaddingLeft
        | S::PaddingRight
        | S::PaddingTop
        | S::Size
        | S::TabSize
        | S::Width
        | S::YOffset => SettingValue::Length(expect::<ScaledPoint>(value, context)?),
        S::BorderBottomStyle | S::BorderLeftStyle | S::BorderRightStyle | S::BorderTopStyle => {
            SettingValue::BorderStyle(enum_value(value, context, "none, solid", BorderStyle::parse)?)
        }
        S::Box | S::Debug | S::HangingPunctuation | S::PreserveWhitespace => {
            SettingValue::Bool(expect::<bool>(value, context)?)
        }
        S::IndentLeftRows | S::TabSizeSpaces => SettingValue::Int(expect::<INT>(value, context)?),
        S::FontExpansion => SettingValue::Float(expect::<FLOAT>(value, context)?),
        S::FontFamily => {
            SettingValue::FontFamily(expect::<Rc<RefCell<FontFamily>>>(value, context)?)
        }
        S::FontWeight => match value.as_int() {
            Ok(weight) if (1..=MAX_FONT_WEIGHT as INT).contains(&weight) => SettingValue::Int(weight),
            Ok(weight) => {
                return Err(BindingError::argument_type(
                    context,
                    format!("a font weight from 1 to {}", MAX_FONT_WEIGHT),
                    weight.to_string(),
                ))
            }
            Err(_) => SettingValue::Int(enum_value(value, context, "normal, bold, or an int", |s| {
                match s {
                    "normal" => Some(FONT_WEIGHT_REGULAR as INT),
                    "bold" => Some(FONT_WEIGHT_BOLD as INT),
                    _ => None,
                }
            })?),
        },
        S::HAlign => SettingValue::HAlign(enum_value(
            value,
            context,
            "left, center, right, justify",
            HAlign::parse,
        )?),
        S::VAlign => {
            SettingValue::VAlign(enum_value(value, context, "top, middle, bottom", VAlign::parse)?)
        }
        S::Style => SettingValue::FontStyle(enum_value(
            value,
            context,
            "normal, italic, oblique",
            FontStyle::parse,
        )?),
        S::TextDecorationLine => SettingValue::TextDecorationLine(enum_value(
            value,
            context,
            "none, underline, overline, line-through",
            TextDecorationLine::parse,
        )?),
        S::Hyperlink | S::OpenTypeFeature | S::Prepend => {
            SettingValue::Str(expect::<String>(value, context)?)
        }
    };
    Ok(converted)
}

pub fn setting_to_script(value: &SettingValue) -> Dynamic {
    match value {
        SettingValue::Bool(b) => Dynamic::from(*b),
        SettingValue::Int(i) => Dynamic::from(*i),
        SettingValue::Float(f) => Dynamic::from(*f),
        SettingValue::Str(s) => Dynamic::from(s.clone()),
        SettingValue::Length(sp) => Dynamic::from(Foreign::Sp(SpValue(*sp))),
        SettingValue::Color(c) => Dynamic::from(Foreign::Color(ColorValue(c.clone()))),
        SettingValue::FontFamily(ff) => {
            Dynamic::from(Foreign::FontFamily(FontFamilyHandle(ff.clone())))
        }
        SettingValue::FontStyle(s) => Dynamic::from(s.name()),
        SettingValue::HAlign(a) => Dynamic::from(a.name()),
        SettingValue::VAlign(a) => Dynamic::from(a.name()),
        SettingValue::BorderStyle(s) => Dynamic::from(s.name()),
        SettingValue::TextDecorationLine(d) => Dynamic::from(d.name()),
    }
}

/// Convert a whole script map. Unknown keys are logged and skipped; any
/// invalid value fails the whole conversion.
pub fn map_to_settings(ctx: &Context, map: &Map) -> Result<TypesettingSettings> {
    let mut settings = TypesettingSettings::new();
    for (key, value) in map {
        match lookup_key(key.as_str()) {
            Some(setting) => {
                settings.insert(setting, coerce(setting, value)?);
            }
            None => ctx.warn(format!("ignoring unknown setting {:?}", key.as_str())),
        }
    }
    Ok(settings)
}

/// The settings of a text, shared with the text itself
#[derive(Debug, Clone)]
pub struct SettingsHandle(pub Rc<RefCell<Text>>);

impl SettingsHandle {
    pub fn set_item(&self, ctx: &Context, key: &str, value: &Dynamic) -> Result<()> {
        let Some(setting) = lookup_key(key) else {
            ctx.warn(format!("ignoring unknown setting {:?}", key));
            return Ok(());
        };
        let converted = coerce(setting, value)?;
        tracing::trace!(setting = setting.name(), "set text setting");
        self.0.borrow_mut().settings.insert(setting, converted);
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Option<Dynamic> {
        let setting = lookup_key(key)?;
        self.0.borrow().settings.get(&setting).map(setting_to_script)
    }

    /// Display names of the set keys, sorted
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.0.borrow().settings.keys().map(|k| k.name()).collect();
        keys.sort_unstable();
        keys
    }

    /// Set settings as (display name, value), sorted like [`Self::keys`]
    pub fn entries(&self) -> Vec<(&'static str, Dynamic)> {
        let mut entries: Vec<(&'static str, Dynamic)> = self
            .0
            .borrow()
            .settings
            .iter()
            .map(|(k, v)| (k.name(), setting_to_script(v)))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries
    }

    /// Remove a setting, returning its value or `default`
    pub fn pop(&self, key: &str, default: Option<Dynamic>) -> Dynamic {
        lookup_key(key)
            .and_then(|s| self.0.borrow_mut().settings.remove(&s))
            .map(|v| setting_to_script(&v))
            .or(default)
            .unwrap_or(Dynamic::UNIT)
    }

    /// Return the current value of `key`, storing `value` first when it is
    /// not set yet. The value is checked even when the key is already set.
    pub fn set_default(&self, ctx: &Context, key: &str, value: &Dynamic) -> Result<Dynamic> {
        let Some(setting) = lookup_key(key) else {
            ctx.warn(format!("ignoring unknown setting {:?}", key));
            return Ok(Dynamic::UNIT);
        };
        let converted = coerce(setting, value)?;
        let mut text = self.0.borrow_mut();
        let current = text.settings.entry(setting).or_insert(converted);
        Ok(setting_to_script(current))
    }

    /// Merge a map or another settings value. Every entry is converted
    /// before any is stored.
    pub fn update(&self, ctx: &Context, other: &Dynamic) -> Result<()> {
        let incoming = if let Some(map) = other.read_lock::<Map>() {
            map_to_settings(ctx, &map)?
        } else if let Some(Foreign::Settings(settings)) = other.clone().try_cast::<Foreign>() {
            settings.native()
        } else {
            return Err(BindingError::argument_type(
                "settings.update() argument 1 (other)",
                "map or text.settings",
                dynamic_type_name(other),
            ));
        };
        self.0.borrow_mut().settings.extend(incoming);
        Ok(())
    }

    /// Settings detached from any text
    pub fn copy(&self) -> SettingsHandle {
        let mut text = Text::new();
        text.settings = self.native();
        SettingsHandle(Rc::new(RefCell::new(text)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Wrapper for SettingsHandle {
    type Native = TypesettingSettings;

    fn native(&self) -> TypesettingSettings {
        self.0.borrow().settings.clone()
    }
}

attributes! {
    SettingsAttr {
        fields {}
        methods {
            Keys => "keys",
            Values => "values",
            Items => "items",
            Get => "get",
            Contains => "contains",
            Remove => "remove",
            Pop => "pop",
            SetDefault => "setdefault",
            Update => "update",
            CopySettings => "copy",
            Clear => "clear",
            Len => "len",
        }
    }
}

const TAG: &str = "text.settings";

impl Identified for SettingsHandle {
    fn type_tag(&self) -> &'static str {
        TAG
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.0) as *const () as usize)
    }

    fn display(&self) -> String {
        let text = self.0.borrow();
        let entries: Vec<String> = text
            .settings
            .iter()
            .map(|(k, v)| format!("{}={}", k.name(), v))
            .collect();
        format!("settings{{{}}}", entries.join(", "))
    }
}

impl AttributeAccessible for SettingsHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let Some(attr) = SettingsAttr::from_name(name) else {
            // a known key that is not set reads as nil
            let setting = lookup_key(name)?;
            return Some(
                self.0
                    .borrow()
                    .settings
                    .get(&setting)
                    .map(setting_to_script)
                    .unwrap_or(Dynamic::UNIT),
            );
        };
        let handle = self.clone();
        let value = match attr {
            SettingsAttr::Keys => method("settings.keys", Arity::Exact(0), move |_ctx, _args| {
                let keys: Array = handle.keys().into_iter().map(Dynamic::from).collect();
                Ok(Dynamic::from_array(keys))
            }),
            SettingsAttr::Values => method("settings.values", Arity::Exact(0), move |_ctx, _args| {
                let values: Array = handle.entries().into_iter().map(|(_, v)| v).collect();
                Ok(Dynamic::from_array(values))
            }),
            SettingsAttr::Items => method("settings.items", Arity::Exact(0), move |_ctx, _args| {
                let items: Array = handle
                    .entries()
                    .into_iter()
                    .map(|(k, v)| Dynamic::from_array(vec![Dynamic::from(k), v]))
                    .collect();
                Ok(Dynamic::from_array(items))
            }),
            SettingsAttr::Get => method("settings.get", Arity::Range(1, 2), move |_ctx, args| {
                let args = Args::new("settings.get", args);
                let key: String = args.get(0, "key")?;
                Ok(handle
                    .get_item(&key)
                    .or_else(|| args.raw(1).cloned())
                    .unwrap_or(Dynamic::UNIT))
            }),
            SettingsAttr::Pop => method("settings.pop", Arity::Range(1, 2), move |_ctx, args| {
                let args = Args::new("settings.pop", args);
                let key: String = args.get(0, "key")?;
                Ok(handle.pop(&key, args.raw(1).cloned()))
            }),
            SettingsAttr::SetDefault => {
                method("settings.setdefault", Arity::Exact(2), move |ctx, args| {
                    let args = Args::new("settings.setdefault", args);
                    let key: String = args.get(0, "key")?;
                    let value = args.raw(1).cloned().unwrap_or(Dynamic::UNIT);
                    handle.set_default(ctx, &key, &value)
                })
            }
            SettingsAttr::Update => method("settings.update", Arity::Exact(1), move |ctx, args| {
                let other = args.first().cloned().unwrap_or(Dynamic::UNIT);
                handle.update(ctx, &other)?;
                Ok(Dynamic::UNIT)
            }),
            SettingsAttr::CopySettings => {
                method("settings.copy", Arity::Exact(0), move |_ctx, _args| {
                    Ok(Dynamic::from(Foreign::Settings(handle.copy())))
                })
            }
            SettingsAttr::Contains => {
                method("settings.contains", Arity::Exact(1), move |_ctx, args| {
                    let key: String = Args::new("settings.contains", args).get(0, "key")?;
                    let present = lookup_key(&key)
                        .map(|s| handle.0.borrow().settings.contains_key(&s))
                        .unwrap_or(false);
                    Ok(Dynamic::from(present))
                })
            }
            SettingsAttr::Remove => method("settings.remove", Arity::Exact(1), move |_ctx, args| {
                let key: String = Args::new("settings.remove", args).get(0, "key")?;
                Ok(handle.pop(&key, None))
            }),
            SettingsAttr::Clear => method("settings.clear", Arity::Exact(0), move |_ctx, _args| {
                handle.0.borrow_mut().settings.clear();
                Ok(Dynamic::UNIT)
            }),
            SettingsAttr::Len => method("settings.len", Arity::Exact(0), move |_ctx, _args| {
                Ok(Dynamic::from(handle.len() as INT))
            }),
        };
        Some(value)
    }

    fn set_attribute(&self, ctx: &Context, name: &str, value: Dynamic) -> Result<()> {
        if SettingsAttr::from_name(name).is_some() {
            return Err(BindingError::read_only(TAG, name));
        }
        self.set_item(ctx, name, &value)
    }
}

impl Comparable for SettingsHandle {}

impl Truthy for SettingsHandle {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Operable for SettingsHandle {}

/// Replace the settings of `text` from a map or another settings handle
pub fn assign(ctx: &Context, text: &Rc<RefCell<Text>>, value: &Dynamic) -> Result<()> {
    if let Some(map) = value.read_lock::<Map>() {
        let settings = map_to_settings(ctx, &map)?;
        text.borrow_mut().settings = settings;
        return Ok(());
    }
    if let Some(Foreign::Settings(other)) = value.clone().try_cast::<Foreign>() {
        if !Rc::ptr_eq(&other.0, text) {
            let settings = other.native();
            text.borrow_mut().settings = settings;
        }
        return Ok(());
    }
    Err(BindingError::argument_type(
        "text.settings",
        "map or text.settings",
        dynamic_type_name(value),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemorySink;

    fn handle() -> SettingsHandle {
        SettingsHandle(Rc::new(RefCell::new(Text::new())))
    }

    #[test]
    fn test_lookup_key_forms() {
        assert_eq!(lookup_key("halign"), Some(SettingType::HAlign));
        assert_eq!(lookup_key("SettingHAlign"), Some(SettingType::HAlign));
        assert_eq!(lookup_key("font_weight"), Some(SettingType::FontWeight));
        assert_eq!(lookup_key("border-top-width"), Some(SettingType::BorderTopWidth));
        assert_eq!(lookup_key("bogus-key"), None);
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let sink = Rc::new(MemorySink::new());
        let ctx = Context::new(sink.clone());
        let settings = handle();
        settings.set_item(&ctx, "halign", &Dynamic::from("center")).unwrap();

        settings
            .set_item(&ctx, "bogus-key", &Dynamic::from(42_i64))
            .unwrap();

        assert_eq!(settings.keys(), vec!["SettingHAlign"]);
        let halign = settings.get_item("halign").unwrap();
        assert_eq!(halign.into_string().unwrap(), "center");
        assert!(sink.records()[0].message.contains("bogus-key"));
    }

    #[test]
    fn test_dictionary_methods() {
        let ctx = Context::default();
        let settings = handle();
        settings.set_item(&ctx, "valign", &Dynamic::from("top")).unwrap();
        settings.set_item(&ctx, "halign", &Dynamic::from("left")).unwrap();

        let names: Vec<&str> = settings.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["SettingHAlign", "SettingVAlign"]);

        let current = settings
            .set_default(&ctx, "halign", &Dynamic::from("right"))
            .unwrap();
        assert_eq!(current.into_string().unwrap(), "left");
        assert!(settings
            .set_default(&ctx, "halign", &Dynamic::from("diagonal"))
            .is_err());
        let added = settings
            .set_default(&ctx, "tabsizespaces", &Dynamic::from(4_i64))
            .unwrap();
        assert_eq!(added.as_int().unwrap(), 4);

        let copy = settings.copy();
        assert!(!Rc::ptr_eq(&copy.0, &settings.0));
        assert_eq!(settings.pop("valign", None).into_string().unwrap(), "top");
        assert_eq!(settings.pop("valign", Some(Dynamic::from(0_i64))).as_int().unwrap(), 0);
        assert!(settings.pop("bogus", None).is::<()>());
        assert_eq!(copy.len(), 3);
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_update_is_atomic() {
        let ctx = Context::default();
        let settings = handle();
        settings.set_item(&ctx, "halign", &Dynamic::from("center")).unwrap();

        let mut bad = Map::new();
        bad.insert("halign".into(), Dynamic::from("left"));
        bad.insert("color".into(), Dynamic::from("red"));
        let err = settings.update(&ctx, &Dynamic::from_map(bad)).unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
        assert_eq!(settings.get_item("halign").unwrap().into_string().unwrap(), "center");

        let other = handle();
        other.set_item(&ctx, "size", &Dynamic::from(Foreign::Sp(SpValue(ScaledPoint::from_pt(9.0))))).unwrap();
        settings.update(&ctx, &Dynamic::from(Foreign::Settings(other))).unwrap();
        assert_eq!(settings.keys(), vec!["SettingHAlign", "SettingSize"]);
        assert!(settings.update(&ctx, &Dynamic::from(1_i64)).is_err());
    }

    #[test]
    fn test_halign_rejects_other_strings() {
        let ctx = Context::default();
        let settings = handle();
        let err = settings
            .set_item(&ctx, "halign", &Dynamic::from("diagonal"))
            .unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
        assert!(err.to_string().contains("left, center, right, justify"));
        assert!(settings.is_empty());
    }

    #[test]
    fn test_fontweight_int_or_name() {
        let ctx = Context::default();
        let settings = handle();
        settings.set_item(&ctx, "fontweight", &Dynamic::from("bold")).unwrap();
        assert_eq!(settings.get_item("fontweight").unwrap().as_int().unwrap(), 700);
        settings.set_item(&ctx, "fontweight", &Dynamic::from(300_i64)).unwrap();
        assert_eq!(settings.get_item("fontweight").unwrap().as_int().unwrap(), 300);
        assert!(settings
            .set_item(&ctx, "fontweight", &Dynamic::from("heavy"))
            .is_err());
        for weight in [-1_i64, 0, 100_000] {
            let err = settings
                .set_item(&ctx, "fontweight", &Dynamic::from(weight))
                .unwrap_err();
            assert_eq!(err.kind(), "ArgumentTypeError");
        }
        assert_eq!(settings.get_item("fontweight").unwrap().as_int().unwrap(), 300);
    }

    #[test]
    fn test_color_requires_color_value() {
        let ctx = Context::default();
        let settings = handle();
        let err = settings
            .set_item(&ctx, "color", &Dynamic::from("red"))
            .unwrap_err();
        assert_eq!(err.to_string(), "settings.SettingColor expects backend.color, got string");
        let red = Dynamic::from(Foreign::Color(ColorValue(Color::parse("red").unwrap())));
        settings.set_item(&ctx, "color", &red).unwrap();
        assert_eq!(settings.keys(), vec!["SettingColor"]);
    }

    #[test]
    fn test_keys_sorted() {
        let ctx = Context::default();
        let settings = handle();
        settings.set_item(&ctx, "valign", &Dynamic::from("top")).unwrap();
        settings.set_item(&ctx, "debug", &Dynamic::from(true)).unwrap();
        let size = Dynamic::from(Foreign::Sp(SpValue(ScaledPoint::from_pt(12.0))));
        settings.set_item(&ctx, "size", &size).unwrap();
        assert_eq!(
            settings.keys(),
            vec!["SettingDebug", "SettingSize", "SettingVAlign"]
        );
    }

    #[test]
    fn test_assign_map_is_atomic() {
        let ctx = Context::default();
        let settings = handle();
        settings.set_item(&ctx, "halign", &Dynamic::from("right")).unwrap();

        let mut map = Map::new();
        map.insert("valign".into(), Dynamic::from("top"));
        map.insert("halign".into(), Dynamic::from(12_i64));
        assert!(assign(&ctx, &settings.0, &Dynamic::from_map(map)).is_err());
        assert_eq!(settings.keys(), vec!["SettingHAlign"]);

        let mut map = Map::new();
        map.insert("valign".into(), Dynamic::from("top"));
        assign(&ctx, &settings.0, &Dynamic::from_map(map)).unwrap();
        assert_eq!(settings.keys(), vec!["SettingVAlign"]);
    }
}
