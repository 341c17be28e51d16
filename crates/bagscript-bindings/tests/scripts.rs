//! End-to-end scripts against the script modules and adapters

use std::path::PathBuf;
use std::rc::Rc;

use bagscript_bindings::{Context, EngineConfig, MemorySink, ScriptEngine, ScriptError};
use rhai::{Array, Dynamic, Map};
use tempfile::TempDir;

fn font_path() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata/fonts/DejaVuSansMono-Oblique.ttf")
        .display()
        .to_string()
}

fn run(script: &str) -> Result<Dynamic, ScriptError> {
    let engine = ScriptEngine::new();
    let ast = engine.compile(script)?;
    engine.eval(&ast)
}

fn strings(value: Dynamic) -> Vec<String> {
    value
        .try_cast::<Array>()
        .unwrap()
        .into_iter()
        .map(|v| v.into_string().unwrap())
        .collect()
}

#[test]
fn test_document_writes_pdf() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("rule.pdf");
    let script = format!(
        r#"
        let doc = document::create("{}");
        doc.title = "Rules";
        doc.compresslevel = 0;
        let rule = node::create("rule");
        rule.width = bag::sp("100pt");
        rule.height = bag::sp("2pt");
        let page = doc.new_page();
        page.output_at(bag::sp("72pt"), bag::sp("700pt"), node::vpack(rule));
        page.shipout();
        doc.finish();
        [doc.pages.len(), page.shipped]
        "#,
        out.display()
    );
    let result = run(&script).unwrap().try_cast::<Array>().unwrap();
    assert_eq!(result[0].as_int().unwrap(), 1);
    assert!(result[1].as_bool().unwrap());

    let bytes = std::fs::read(&out).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("%PDF-"));
    assert!(text.contains("/Title (Rules)"));
}

#[test]
fn test_argument_count_error() {
    let err = run(r#"document::create("a.pdf", 2)"#).unwrap_err();
    assert_eq!(err.kind(), Some("ArgumentCountError"));
    assert_eq!(
        err.to_string(),
        "ArgumentCountError: document::create() takes 0 to 1 arguments, got 2"
    );

    let err = run(r#"document::create().new_page(1)"#).unwrap_err();
    assert_eq!(err.kind(), Some("ArgumentCountError"));
}

#[test]
fn test_catch_exposes_kind_and_message() {
    let result = run(
        r#"
        let caught = [];
        try { node::create("box"); } catch (e) { caught.push(e.kind); }
        try { color::parse("not-a-colour"); } catch (e) { caught.push(e.kind); }
        try { lang::get("klingon"); } catch (e) { caught.push(e.kind); }
        try { document::create().bogus; } catch (e) { caught.push(e.kind); }
        let page = document::create().new_page();
        try { page.number = 4; } catch (e) { caught.push(e.kind); }
        caught
        "#,
    )
    .unwrap();
    assert_eq!(
        strings(result),
        vec![
            "ArgumentTypeError",
            "NativeOperationError",
            "NativeOperationError",
            "UnsupportedAttributeError",
            "UnsupportedAttributeError",
        ]
    );
}

#[test]
fn test_node_list_editing() {
    let result = run(
        r#"
        let glyph = node::create("glyph");
        let kern = node::create("kern");
        let penalty = node::create("penalty");
        let head = node::insert_after(glyph, glyph, penalty);
        head = node::insert_before(head, penalty, kern);
        let kinds = [];
        let n = head;
        while n != () {
            kinds.push(type_tag(n));
            n = n.next;
        }
        kinds
        "#,
    )
    .unwrap();
    assert_eq!(strings(result), vec!["node.glyph", "node.kern", "node.penalty"]);
}

#[test]
fn test_hpack_measures_width() {
    let result = run(
        r#"
        let a = node::create("kern");
        a.kern = bag::sp("3pt");
        let b = node::create("rule");
        b.width = bag::sp("4pt");
        let head = node::insert_after(a, a, b);
        let hbox = node::hpack(head);
        [type_tag(hbox), hbox.width == bag::sp("7pt"), type_tag(hbox.list)]
        "#,
    )
    .unwrap();
    let items = result.try_cast::<Array>().unwrap();
    assert_eq!(items[0].clone().into_string().unwrap(), "node.hlist");
    assert!(items[1].as_bool().unwrap());
    assert_eq!(items[2].clone().into_string().unwrap(), "node.kern");
}

#[test]
fn test_values_and_truthiness() {
    let result = run(
        r##"
        [
            color::parse("#ff0000") == color::parse("#ff0000"),
            lang::get("German") == frontend::get_language("de"),
            is_truthy(font::create()),
            is_truthy(bag::sp("0pt")),
            is_truthy(bag::sp("1pt")),
            type_tag(font::new_feature("+liga")),
            `${bag::sp("1pt")}`,
        ]
        "##,
    )
    .unwrap();
    let items = result.try_cast::<Array>().unwrap();
    assert!(items[0].as_bool().unwrap());
    assert!(items[1].as_bool().unwrap());
    assert!(!items[2].as_bool().unwrap());
    assert!(!items[3].as_bool().unwrap());
    assert!(items[4].as_bool().unwrap());
    assert_eq!(items[5].clone().into_string().unwrap(), "font.feature");
    assert_eq!(items[6].clone().into_string().unwrap(), "1pt");
}

#[test]
fn test_logger_writes_to_sink() {
    let sink = Rc::new(MemorySink::new());
    let engine = ScriptEngine::with_config(&EngineConfig::default(), Context::new(sink.clone()));
    let ast = engine
        .compile(r#"log::logger().warn("low on ink", "page", 3)"#)
        .unwrap();
    engine.run(&ast).unwrap();
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].to_string(), "low on ink page=3");
}

#[test]
fn test_raw_pdf_writer() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("raw.pdf");
    let script = format!(
        r#"
        let writer = pdf::create("{}");
        let face = writer.new_face("{}");
        let glyph = face.codepoint('A');
        let stream = writer.new_object();
        stream.data = "BT /F1 12 Tf 72 720 Td (A) Tj ET";
        stream.save();
        let page = writer.new_page();
        page.contents = stream.object_number;
        page.faces = [face];
        writer.finish();
        [glyph > 0, page.contents.number == stream.object_number.number, writer.finished]
        "#,
        out.display(),
        font_path()
    );
    let items = run(&script).unwrap().try_cast::<Array>().unwrap();
    assert!(items.iter().all(|v| v.as_bool().unwrap()));
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_frontend_paragraph_and_table() {
    let script = format!(
        r#"
        let fe = frontend::create();
        let family = fe.new_fontfamily("text");
        family.add_member(#{{
            source: frontend::new_fontsource(#{{ location: "{}" }}),
            weight: frontend::FONT_WEIGHT_400,
            style: frontend::FONT_STYLE_NORMAL,
        }});
        let text = frontend::new_text();
        text.append("Hello ", "world");
        text.settings = #{{ halign: "left", fontweight: 400 }};
        let vlist = fe.format_paragraph(text, #{{ width: bag::sp("200pt"), family: family }});

        let table = frontend::new_table();
        let row = frontend::new_tr();
        let cell = frontend::new_td();
        cell.append(text);
        cell.padding_left = bag::sp("2pt");
        row.append(cell);
        table.append(row);
        [type_tag(vlist), text.content, table.rows.len(), fe.find_fontfamily("missing") == (), cost(table)]
        "#,
        font_path()
    );
    let items = run(&script).unwrap().try_cast::<Array>().unwrap();
    assert_eq!(items[0].clone().into_string().unwrap(), "node.vlist");
    assert_eq!(items[1].clone().into_string().unwrap(), "Hello world");
    assert_eq!(items[2].as_int().unwrap(), 1);
    assert!(items[3].as_bool().unwrap());
    assert_eq!(items[4].as_int().unwrap(), 1);
}

#[test]
fn test_write_back_through_property_chain() {
    let result = run(
        r#"
        let doc = document::create();
        doc.pdf_writer.info = #{ Author: "someone" };
        let fe = frontend::create();
        fe.doc.title = "Chained";
        [doc.pdf_writer.info, fe.doc.title]
        "#,
    )
    .unwrap();
    let items = result.try_cast::<Array>().unwrap();
    let info = items[0].clone().try_cast::<Map>().unwrap();
    assert_eq!(info["Author"].clone().into_string().unwrap(), "someone");
    assert_eq!(items[1].clone().into_string().unwrap(), "Chained");
}

#[test]
fn test_method_calls_on_attribute_values() {
    let result = run(
        r#"
        let doc = document::create();
        doc.new_page();
        doc.new_page();
        let writer = pdf::create();
        writer.new_page();
        let table = frontend::new_table();
        table.append(frontend::new_tr());
        doc.title = "Report";
        [doc.pages.len(), writer.pages.len(), table.rows.len(), doc.title.len()]
        "#,
    )
    .unwrap();
    let lengths: Vec<i64> = result
        .try_cast::<Array>()
        .unwrap()
        .iter()
        .map(|v| v.as_int().unwrap())
        .collect();
    assert_eq!(lengths, vec![2, 1, 1, 6]);

    let err = run(r#"let doc = document::create(); doc.pages.push(1);"#).unwrap_err();
    assert_eq!(err.kind(), Some("UnsupportedAttributeError"));
}

#[test]
fn test_cyclic_node_structures_are_rejected() {
    let result = run(
        r#"
        let caught = [];
        let v = node::create("vlist");
        try { v.list = v; } catch (e) { caught.push(e.kind); }
        let outer = node::hpack(v);
        try { v.list = outer; } catch (e) { caught.push(e.kind); }
        let a = node::create("glyph");
        let b = node::create("kern");
        let head = node::insert_after(a, a, b);
        try { node::insert_before(head, a, b); } catch (e) { caught.push(e.kind); }
        caught.push(node::dump(outer));
        caught
        "#,
    )
    .unwrap();
    let items = strings(result);
    assert_eq!(
        items[..3],
        ["ArgumentTypeError", "ArgumentTypeError", "NativeOperationError"]
    );
    assert!(items[3].starts_with("hlist"));
}

#[test]
fn test_names_are_explicit() {
    let result = run(
        r#"
        let obj = pdf::create().new_object();
        obj.dictionary = #{ Type: pdf::name("XObject"), Note: "/tmp/a.xml" };
        let kind = "";
        try { pdf::name(""); } catch (e) { kind = e.kind; }
        [
            type_tag(obj.dictionary.Type),
            obj.dictionary.Type == pdf::name("/XObject"),
            obj.dictionary.Note,
            `${pdf::name("Catalog")}`,
            kind,
        ]
        "#,
    )
    .unwrap();
    let items = result.try_cast::<Array>().unwrap();
    assert_eq!(items[0].clone().into_string().unwrap(), "pdf.name");
    assert!(items[1].as_bool().unwrap());
    assert_eq!(items[2].clone().into_string().unwrap(), "/tmp/a.xml");
    assert_eq!(items[3].clone().into_string().unwrap(), "/Catalog");
    assert_eq!(items[4].clone().into_string().unwrap(), "ArgumentTypeError");
}

#[test]
fn test_settings_dictionary_methods() {
    let result = run(
        r#"
        let text = frontend::new_text();
        text.settings.update(#{ halign: "center", valign: "top" });
        let kind = "";
        try {
            text.settings.update(#{ halign: "left", fontweight: 100000 });
        } catch (e) {
            kind = e.kind;
        }
        let kept = text.settings.setdefault("halign", "right");
        let snapshot = text.settings.copy();
        let popped = text.settings.pop("valign");
        let fallback = text.settings.pop("valign", "none");
        [
            kind,
            kept,
            popped,
            fallback,
            text.settings.items().len(),
            snapshot.values(),
            text.settings.get("color", "unset"),
        ]
        "#,
    )
    .unwrap();
    let items = result.try_cast::<Array>().unwrap();
    assert_eq!(items[0].clone().into_string().unwrap(), "ArgumentTypeError");
    assert_eq!(items[1].clone().into_string().unwrap(), "center");
    assert_eq!(items[2].clone().into_string().unwrap(), "top");
    assert_eq!(items[3].clone().into_string().unwrap(), "none");
    assert_eq!(items[4].as_int().unwrap(), 1);
    assert_eq!(strings(items[5].clone()), vec!["center", "top"]);
    assert_eq!(items[6].clone().into_string().unwrap(), "unset");
}
