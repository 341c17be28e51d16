//! Behavioural guarantees of the binding layer, driven through scripts

use std::path::PathBuf;
use std::rc::Rc;

use bagscript_bindings::{Context, EngineConfig, MemorySink, ScriptEngine};
use rhai::{Array, Dynamic, Map};

fn eval(script: &str) -> Dynamic {
    let engine = ScriptEngine::new();
    let ast = engine.compile(script).unwrap();
    engine.eval(&ast).unwrap()
}

fn font_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/fonts/DejaVuSansMono-Oblique.ttf")
}

fn string(value: &Dynamic) -> String {
    value.clone().into_string().unwrap()
}

#[test]
fn test_dictionary_round_trip() {
    let result = eval(
        r#"
        let obj = pdf::create().new_object();
        obj.dictionary = #{ title: "report", count: 3, inner: #{ depth: 2, label: "x" } };
        obj.dictionary
        "#,
    );
    let map = result.try_cast::<Map>().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(string(&map["title"]), "report");
    assert_eq!(map["count"].as_int().unwrap(), 3);
    let inner = map["inner"].clone().try_cast::<Map>().unwrap();
    assert_eq!(inner["depth"].as_int().unwrap(), 2);
    assert_eq!(string(&inner["label"]), "x");
}

#[test]
fn test_failed_conversion_keeps_dictionary() {
    let result = eval(
        r#"
        let obj = pdf::create().new_object();
        obj.dictionary = #{ keep: 1 };
        let kind = "";
        try {
            obj.dictionary = #{ a: "x", b: [1, #{ bad: true }] };
        } catch (e) {
            kind = e.kind;
        }
        [kind, obj.dictionary]
        "#,
    );
    let items = result.try_cast::<Array>().unwrap();
    assert_eq!(string(&items[0]), "ConversionError");
    let dict = items[1].clone().try_cast::<Map>().unwrap();
    assert_eq!(dict.len(), 1);
    assert_eq!(dict["keep"].as_int().unwrap(), 1);
}

#[test]
fn test_length_attribute_rejects_int() {
    let result = eval(
        r#"
        let page = document::create().new_page();
        let before = page.width;
        let message = "";
        try {
            page.width = 100;
        } catch (e) {
            message = e.kind + ": " + e.message;
        }
        [message, page.width == before]
        "#,
    );
    let items = result.try_cast::<Array>().unwrap();
    assert_eq!(
        string(&items[0]),
        "ArgumentTypeError: page.width expects backend.sp, got int"
    );
    assert!(items[1].as_bool().unwrap());
}

#[test]
fn test_atom_iterator_exhaustion() {
    let script = format!(
        r#"
        let face = pdf::create().new_face("{}");
        let atoms = font::create(face, bag::sp("10pt")).shape("abc");
        let seen = [];
        for i in 0..5 {{
            let atom = atoms.next();
            seen.push(if atom == () {{ "-" }} else {{ atom.components }});
        }}
        seen.push(atoms.entry() == ());
        seen
        "#,
        font_path().display()
    );
    let seen = eval(&script).try_cast::<Array>().unwrap();
    let components: Vec<String> = seen[..5].iter().map(string).collect();
    assert_eq!(components, vec!["a", "b", "c", "-", "-"]);
    assert!(seen[5].as_bool().unwrap());
}

#[test]
fn test_for_loop_consumes_atoms() {
    let script = format!(
        r#"
        let face = pdf::create().new_face("{}");
        let atoms = font::create(face, bag::sp("10pt")).shape("xyz");
        let count = 0;
        for atom in atoms {{ count += 1; }}
        for atom in atoms {{ count += 100; }}
        [count, atoms.len, atoms.remaining]
        "#,
        font_path().display()
    );
    let items = eval(&script).try_cast::<Array>().unwrap();
    assert_eq!(items[0].as_int().unwrap(), 3);
    assert_eq!(items[1].as_int().unwrap(), 3);
    assert_eq!(items[2].as_int().unwrap(), 0);
}

#[test]
fn test_unknown_setting_key_is_ignored() {
    let sink = Rc::new(MemorySink::new());
    let engine = ScriptEngine::with_config(&EngineConfig::default(), Context::new(sink.clone()));
    let ast = engine
        .compile(
            r#"
            let text = frontend::new_text();
            text.settings["halign"] = "center";
            text.settings["bogus-key"] = 42;
            [text.settings.keys(), text.settings.halign]
            "#,
        )
        .unwrap();
    let items = engine.eval(&ast).unwrap().try_cast::<Array>().unwrap();
    let keys: Vec<String> = items[0].clone().try_cast::<Array>().unwrap().iter().map(string).collect();
    assert_eq!(keys, vec!["SettingHAlign"]);
    assert_eq!(string(&items[1]), "center");
    assert!(sink
        .records()
        .iter()
        .any(|r| r.message.contains("bogus-key")));
}

#[test]
fn test_scaled_point_scaling() {
    let result = eval(
        r#"
        let ten = bag::sp("10pt");
        let kind = "";
        try { ten * 1.5; } catch (e) { kind = e.kind; }
        [ten * 3 == bag::sp("30pt"), (3 * ten).pt, kind]
        "#,
    );
    let items = result.try_cast::<Array>().unwrap();
    assert!(items[0].as_bool().unwrap());
    assert_eq!(items[1].as_float().unwrap(), 30.0);
    assert_eq!(string(&items[2]), "UnsupportedOperationError");
}
