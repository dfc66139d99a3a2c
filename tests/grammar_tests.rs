//! Integration tests for the ingest → refresh → query pipeline
//!
//! Drives the grammar table the way an analysis pass does: parsed JSON
//! record lines in, rendered details and lookups out.

use std::path::Path;

use pawnls::grammar::preview::preview_line;
use pawnls::grammar::records::RecordLine;
use pawnls::grammar::symbol::GLOBAL_SCOPE;
use pawnls::{GrammarTable, SymbolMatch};

/// Build a table from analyzer output lines, the way a pass does.
fn ingest(lines: &[&str]) -> GrammarTable {
    let mut table = GrammarTable::new();
    for line in lines {
        let record = RecordLine::parse(line).expect("record line should parse");
        assert!(table.ingest_line(record).is_none(), "unexpected error record");
    }
    table.refresh_details();
    table
}

#[test]
fn test_full_pass_renders_details() {
    let table = ingest(&[
        r#"{"type":"files","contents":[{"file_path":"/proj/main.pwn","number":0},{"file_path":"/proj/util.inc","number":1}]}"#,
        r#"{"type":"tags","contents":[{"name":"Float","value":4,"index":1}]}"#,
        r#"{"type":"variables","contents":[{"name":"gHealth","ident":1,"usage":1,"tagid":4,"file_number":-1}]}"#,
        r#"{"type":"variables","contents":[{"name":"gNames","ident":3,"usage":1,"tagid":0,"file_number":-1,"array":[{"array_type":1,"array_value":32}]}]}"#,
        r#"{"type":"functions","contents":[{"name":"SetHealth","ident":9,"usage":33,"tagid":0,"file_number":-1,"argument":[{"name":"amount","ident":1,"usage":1,"tagid":4,"tag_list":[4],"hasdefault":1,"default_value":100}]}]}"#,
        r#"{"type":"substitutes","contents":[{"pattern":"MAX(%0,%1)","match_length":3,"substitution":"((%0)>(%1)?(%0):(%1))"}]}"#,
    ]);

    assert_eq!(table.file_index(Path::new("/proj/util.inc")), 1);

    let var = table.find_variable("gHealth", 0).expect("global variable");
    assert_eq!(var.sym.detail, "new Float: gHealth");

    let array = table.find_variable("gNames", 0).expect("array variable");
    assert_eq!(array.sym.detail, "new gNames[32]");

    let func = table.find_function("SetHealth", 0).expect("function");
    assert_eq!(func.sym.detail, "native SetHealth(Float: amount = 100)");
    assert_eq!(func.args[0].sym.detail, "Float: amount = 100");

    let sub = table.find_substitute("MAX").expect("substitution");
    assert_eq!(sub.detail, "#define MAX(%0,%1) ((%0)>(%1)?(%0):(%1))");
}

#[test]
fn test_enumerator_pass_and_field_lookup() {
    let table = ingest(&[
        r#"{"type":"tags","contents":[{"name":"Color","value":9,"index":1}]}"#,
        r#"{"type":"enumerators","contents":[{"name":"Color","tagid":9,"file_number":-1,"field":[{"name":"RED","value":0},{"name":"NAME","value":1,"array":[{"array_type":1,"array_value":32}]}]}]}"#,
    ]);

    let en = table.find_enumerator("Color", 0).expect("enumerator");
    assert_eq!(en.sym.detail, "enum Color\n{\n\tColor: RED,\n\tColor: NAME[32]\n}");

    // Fields are independently lookup-able constants with their own detail.
    let field = table.find_constant("NAME").expect("field constant");
    assert_eq!(field.sym.detail, "Color: NAME[32]");
    assert_eq!(
        table.parent_enumerator_of("NAME").map(|e| e.sym.name.as_str()),
        Some("Color")
    );
}

#[test]
fn test_precedence_substitution_shadows_function() {
    let table = ingest(&[
        r#"{"type":"functions","contents":[{"name":"random","ident":9,"usage":33,"tagid":0,"file_number":-1}]}"#,
        r#"{"type":"substitutes","contents":[{"pattern":"random(%0)","match_length":6,"substitution":"(internal_random()%(%0))"}]}"#,
    ]);

    assert!(matches!(
        table.find_symbol("random", 0),
        Some(SymbolMatch::Substitute(_))
    ));
}

#[test]
fn test_dedup_across_pass_lines() {
    let table = ingest(&[
        r#"{"type":"variables","contents":[{"name":"g","ident":1,"usage":1,"tagid":1,"file_number":-1}]}"#,
        r#"{"type":"variables","contents":[{"name":"g","ident":1,"usage":1,"tagid":2,"file_number":-1}]}"#,
        r#"{"type":"variables","contents":[{"name":"g","ident":1,"usage":1,"tagid":3,"file_number":2}]}"#,
    ]);

    // The global duplicate lost to the first record; the file-scoped record
    // is a distinct symbol and survives.
    assert_eq!(table.variables().len(), 2);
    assert_eq!(table.find_variable("g", 0).map(|v| v.sym.tag_id), Some(1));
    assert_eq!(table.find_variable("g", 2).map(|v| v.sym.tag_id), Some(1));
}

#[test]
fn test_static_render_for_file_scoped_symbol() {
    let table = ingest(&[
        r#"{"type":"variables","contents":[{"name":"counter","ident":1,"usage":1,"tagid":0,"file_number":1}]}"#,
    ]);

    assert_eq!(table.variables()[0].sym.detail, "static new counter");
    assert!(table.find_variable("counter", 0).is_none());
    assert!(table.find_variable("counter", 1).is_some());
}

#[test]
fn test_preview_against_registered_macros() {
    let table = ingest(&[
        r#"{"type":"substitutes","contents":[{"pattern":"MAX(%0,%1)","match_length":3,"substitution":"((%0)>(%1)?(%0):(%1))"}]}"#,
    ]);

    // Captured chunks keep their spacing verbatim.
    let expanded = preview_line("new m = MAX(hp, 100);", table.substitutions()).expect("macro applies");
    assert_eq!(expanded, "new m = ((hp)>( 100)?(hp):( 100));");

    assert!(preview_line("new m = MIN(hp, 100);", table.substitutions()).is_none());
}

#[test]
fn test_error_record_is_returned_not_ingested() {
    let mut table = GrammarTable::new();
    let record = RecordLine::parse(
        r#"{"type":"error","contents":{"file_name":"/proj/main.pwn","error_id":17,"first_line":-1,"last_line":4,"error_type":1,"error_message":"undefined symbol"}}"#,
    )
    .unwrap();

    let error = table.ingest_line(record).expect("error record returned");
    assert_eq!(error.error_id, 17);
    assert!(table.files().is_empty());
}

#[test]
fn test_malformed_lines_do_not_poison_batch() {
    let mut table = GrammarTable::new();
    let lines = [
        r#"{"type":"variables","contents":[{"name":"ok","ident":1,"file_number":-1}]}"#,
        "{ this is not json",
        r#"{"type":"variables","contents":[{"name":"alsoOk","ident":1,"file_number":-1}]}"#,
    ];

    for line in lines {
        if let Ok(record) = RecordLine::parse(line) {
            table.ingest_line(record);
        }
    }
    table.refresh_details();

    assert!(table.find_variable("ok", GLOBAL_SCOPE).is_some());
    assert!(table.find_variable("alsoOk", GLOBAL_SCOPE).is_some());
}
