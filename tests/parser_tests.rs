// Integration tests for declaration extraction

use rpcstub::config::{Configuration, DetachedAnnotationPolicy, ErrorPolicy};
use rpcstub::errors::RecordedError;
use rpcstub::model::{Declaration, Origin};
use rpcstub::parser::Parser;
use rpcstub::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(&path, text).expect("write source file");
    path
}

fn parser(markers: &[&str]) -> Parser {
    Parser::new(Configuration::new(markers.iter().copied())).expect("valid configuration")
}

#[test]
fn test_ping_scenario() {
    let dir = tempdir().unwrap();
    let file = write(
        &dir,
        "ping.c",
        "/* @rpc_cmd */\nvoid ping(void);\n\nstruct ping_res {\n    int code;\n};\n",
    );

    let mut p = parser(&["rpc_cmd"]);
    let report = p.parse(&file).unwrap();
    assert_eq!(report.functions, vec!["ping"]);
    assert!(report.errors.is_empty());

    let annotated: Vec<&str> = p
        .get_functions(false, false, true)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(annotated, vec!["ping"]);

    let structures = p.get_structures(false);
    assert_eq!(structures.len(), 1);
    assert_eq!(structures[0].name, "ping_res");
    assert_eq!(structures[0].fields[0].name, "code");

    assert_eq!(p.get_annotations(), vec!["rpc_cmd"]);
}

#[test]
fn test_attribute_annotation_with_arguments() {
    let mut p = parser(&["rpc"]);
    p.parse_source("api.c", "@rpc(OUT(buf), STR(buf))\nint read_name(char *buf, int len);\n")
        .unwrap();

    let f = &p.get_functions(false, false, true)[0];
    assert_eq!(f.annotations.len(), 1);
    assert_eq!(f.annotations[0].name(), "rpc");
    assert_eq!(f.annotations[0].arguments(), ["OUT(buf)", "STR(buf)"]);
    assert_eq!(f.signature(), "int read_name(char *buf, int len)");
}

#[test]
fn test_parse_twice_into_fresh_sessions() {
    let dir = tempdir().unwrap();
    let file = write(
        &dir,
        "api.c",
        "@rpc int get(int key);\nint set(int key, int value) { return 0; }\ntypedef unsigned int id_t;\nint counter;\n",
    );

    let mut first = parser(&["rpc"]);
    first.parse(&file).unwrap();
    let mut second = parser(&["rpc"]);
    second.parse(&file).unwrap();

    assert_eq!(first.get_functions(false, false, false), second.get_functions(false, false, false));
    assert_eq!(first.get_typedefs(), second.get_typedefs());
    assert_eq!(first.get_variables(false), second.get_variables(false));
    assert_eq!(first.get_annotations(), second.get_annotations());
}

#[test]
fn test_prototype_then_definition_across_files() {
    let dir = tempdir().unwrap();
    let header = write(&dir, "api.h", "/* @rpc */\nint add(int, int);\n");
    let source = write(
        &dir,
        "api.c",
        "int add(int a, int b)\n{\n    SERIALIZE(EVENT);\n    return a + b;\n}\n",
    );

    let mut p = parser(&["rpc", "SERIALIZE"]);
    p.parse(&header).unwrap();
    p.parse(&source).unwrap();

    let functions = p.get_functions(false, false, false);
    assert_eq!(functions.len(), 1);
    let add = functions[0];
    assert!(add.is_defined);
    let names: Vec<&str> = add.annotations().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["rpc", "SERIALIZE"]);
    assert_eq!(add.parameters[1].name.as_deref(), Some("b"));
    // First sighting decides where the function lives
    assert_eq!(add.location().file(), header.canonicalize().unwrap().as_path());
}

#[test]
fn test_filters_compose() {
    let dir = tempdir().unwrap();
    write(&dir, "inc/helpers.h", "@rpc int remote_helper(void);\nint local_helper(void);\n");
    let file = write(
        &dir,
        "main.c",
        "#include \"inc/helpers.h\"\n\
         @rpc int both(void) { return 1; }\n\
         @rpc int proto_only(void);\n\
         int plain(void) { return 0; }\n",
    );

    let mut p = parser(&["rpc"]);
    p.parse(&file).unwrap();

    let all = p.get_functions(false, false, false);
    let strict = p.get_functions(true, true, true);
    assert_eq!(all.len(), 5);
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].name, "both");
    for f in &strict {
        assert!(all.contains(f));
        assert!(f.origin == Origin::InputFile && f.is_defined && f.is_annotated());
    }

    let input_annotated: Vec<&str> = p
        .get_functions(true, false, true)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(input_annotated, vec!["both", "proto_only"]);
    assert!(p.get_functions(true, true, true).iter().all(|f| f.name != "remote_helper"));
}

#[test]
fn test_includes_keep_origin() {
    let dir = tempdir().unwrap();
    write(&dir, "include/types.h", "typedef struct point { int x; int y; } point_t;\nextern int shared;\n");
    write(&dir, "local.h", "struct local { char tag; };\n");
    let file = write(
        &dir,
        "src/app.c",
        "#include <types.h>\n#include \"../local.h\"\n#include <stdio.h>\nint shared = 3;\nvoid draw(point_t p);\n",
    );

    let config = Configuration::new(["rpc"]).with_include_path(dir.path().join("include"));
    let mut p = Parser::new(config).unwrap();
    let report = p.parse(&file).unwrap();

    assert_eq!(report.included_files.len(), 2);
    let structures: Vec<(&str, Origin)> = p
        .get_structures(false)
        .iter()
        .map(|s| (s.name.as_str(), s.origin))
        .collect();
    assert_eq!(
        structures,
        vec![("point", Origin::IncludedFile), ("local", Origin::IncludedFile)]
    );
    assert!(p.get_structures(true).is_empty());

    let shared = &p.get_variables(false)[0];
    assert_eq!(shared.origin, Origin::IncludedFile);
    assert!(!shared.is_extern);
    assert_eq!(p.get_variables(true).len(), 0);

    assert_eq!(p.get_typedefs()[0].alias_name, "point_t");
    assert_eq!(p.get_functions(true, false, false)[0].name, "draw");
}

#[test]
fn test_include_cycle_scanned_once() {
    let dir = tempdir().unwrap();
    write(&dir, "a.h", "#include \"b.h\"\nint from_a(void);\n");
    write(&dir, "b.h", "#include \"a.h\"\nint from_b(void);\n");
    let file = write(&dir, "main.c", "#include \"a.h\"\n#include \"b.h\"\nint main_fn(void);\n");

    let mut p = parser(&["rpc"]);
    let report = p.parse(&file).unwrap();

    assert_eq!(report.included_files.len(), 2);
    let names: Vec<&str> = p
        .get_functions(false, false, false)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["from_b", "from_a", "main_fn"]);
    assert!(p.errors().is_empty());
}

#[test]
fn test_header_reached_through_two_spellings() {
    let dir = tempdir().unwrap();
    write(
        &dir,
        "common.h",
        "struct shared { int v; };\nstatic inline int helper(int x) { return x; }\n",
    );
    let main = write(&dir, "main.c", "#include \"common.h\"\nint main_fn(void);\n");
    let app = write(&dir, "src/app.c", "#include \"../common.h\"\nint app_fn(void);\n");

    let mut p = parser(&["rpc"]);
    p.parse(&main).unwrap();
    p.parse(&app).unwrap();
    assert!(p.errors().is_empty(), "unexpected errors: {:?}", p.errors());
    assert_eq!(p.get_structures(false).len(), 1);

    let config = Configuration::new(["rpc"]).with_error_policy(ErrorPolicy::Abort);
    let mut strict = Parser::new(config).unwrap();
    strict.parse(&main).unwrap();
    let report = strict.parse(&app).unwrap();
    assert_eq!(report.functions, vec!["helper", "app_fn"]);
}

#[test]
fn test_placeholder_in_input_then_included() {
    let dir = tempdir().unwrap();
    let header = write(&dir, "g.h", "SERIALIZE(GROUP(g));\n");
    let main = write(&dir, "m.c", "#include \"g.h\"\nint m(void);\n");

    let mut p = parser(&["SERIALIZE"]);
    p.parse(&header).unwrap();
    p.parse(&main).unwrap();

    let placeholders = p.get_placeholders(false);
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].origin, Origin::InputFile);
}

#[test]
fn test_blank_line_policy() {
    let src = "// @rpc\n\nint foo(int x);\n";

    let mut attach = parser(&["rpc"]);
    attach.parse_source("a.c", src).unwrap();
    assert_eq!(attach.get_functions(false, false, true).len(), 1);

    let config = Configuration::new(["rpc"]).with_detached_annotations(DetachedAnnotationPolicy::Error);
    let mut strict = Parser::new(config).unwrap();
    strict.parse_source("a.c", src).unwrap();
    assert!(strict.get_functions(false, false, true).is_empty());
    assert_eq!(strict.errors().len(), 1);
    assert_eq!(strict.errors()[0].location().line, 1);
}

#[test]
fn test_annotation_does_not_skip_a_declaration() {
    let mut p = parser(&["rpc"]);
    p.parse_source("a.c", "@rpc\nint first(void);\nint second(void);\n").unwrap();

    let annotated: Vec<&str> = p
        .get_functions(false, false, true)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(annotated, vec!["first"]);
}

#[test]
fn test_error_isolation() {
    let dir = tempdir().unwrap();
    let file = write(
        &dir,
        "mixed.c",
        "int alpha(void);\nint broken(int x,);\nint beta(int y);\nstruct gamma { int g; };\n",
    );

    let mut p = parser(&["rpc"]);
    let report = p.parse(&file).unwrap();

    let names: Vec<&str> = p
        .get_functions(false, false, false)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(p.get_structures(false).len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(p.errors().len(), 1);
    assert!(matches!(p.errors()[0], RecordedError::Malformed(_)));
    assert_eq!(p.errors()[0].location().line, 2);
}

#[test]
fn test_abort_policy_leaves_session_untouched() {
    let dir = tempdir().unwrap();
    let good = write(&dir, "good.c", "int kept(void);\n");
    let bad = write(&dir, "bad.c", "int dropped(void);\nstruct s { int a b; };\n");

    let config = Configuration::new(["rpc"]).with_error_policy(ErrorPolicy::Abort);
    let mut p = Parser::new(config).unwrap();
    p.parse(&good).unwrap();

    let err = p.parse(&bad).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
    let names: Vec<&str> = p.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["kept"]);
    assert!(p.errors().is_empty());
}

#[test]
fn test_unterminated_body_is_a_parse_error() {
    let mut p = parser(&["rpc"]);
    let report = p
        .parse_source("a.c", "int ok(void);\nint open(void) {\n    if (1) {\n")
        .unwrap();

    assert_eq!(report.functions, vec!["ok"]);
    assert!(matches!(report.errors.as_slice(), [RecordedError::Parse(_)]));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let mut p = parser(&["rpc"]);
    let err = p.parse(dir.path().join("absent.c")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_empty_markers_rejected_before_reading() {
    let err = Parser::new(Configuration::new(Vec::<String>::new())).unwrap_err();
    assert_eq!(
        err.to_string(),
        "no annotation markers configured; at least one is required"
    );
}

#[test]
fn test_placeholders_and_opaque_macros() {
    let src = "\
#include <stdint.h>
SERIALIZE(GROUP(sample_group));
LOG_MODULE_REGISTER(sample);

int test_func(uint8_t *data, size_t size)
{
    SERIALIZE(INOUT(data));
    return 0;
}
";
    let mut p = parser(&["SERIALIZE"]);
    p.parse_source("sample.c", src).unwrap();

    let placeholders = p.get_placeholders(true);
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].annotation.name(), "GROUP");
    assert_eq!(placeholders[0].annotation.arguments(), ["sample_group"]);

    let f = &p.get_functions(true, true, true)[0];
    assert_eq!(f.name, "test_func");
    assert_eq!(f.annotations[0].name(), "INOUT");
    assert_eq!(f.annotations[0].arguments(), ["data"]);
    assert_eq!(p.get_annotations(), vec!["INOUT", "GROUP"]);
    assert!(p.errors().is_empty());
}
