//! IDL tests: syntax (parse success/failure) and semantics (naming, resolution,
//! spreads, secret leaks, annotations).

use rpcidl::ast::{AnnotationValue, AstRoot, TypeKind};
use rpcidl::parser::MAX_NESTING;
use rpcidl::rest::HttpMethod;
use rpcidl::semantic::PASSES;
use rpcidl::{ast_to_json, compile_file, compile_str, parse_str, CompileError, LexerOptions, ParseError, Parser};

fn compile(src: &str) -> AstRoot {
    compile_str("test.idl", src).expect("compile")
}

fn semantic_error(src: &str) -> String {
    match compile_str("test.idl", src) {
        Err(CompileError::Semantic(e)) => e.message,
        other => panic!("expected a semantic error, got {other:?}"),
    }
}

fn field_names(root: &AstRoot, type_name: &str) -> Vec<String> {
    let def = root.type_definition(type_name).expect("type");
    root.struct_type(def.ty)
        .expect("struct")
        .fields()
        .map(|f| format!("{}:{}", f.name, root.type_name(f.ty)))
        .collect()
}

// ==================== Syntax ====================

#[test]
fn parse_empty_source() {
    let root = parse_str("empty.idl", "").expect("parse");
    assert!(root.type_definitions.is_empty());
    assert!(root.operations.is_empty());
    assert_eq!(root.errors.len(), 1);
    assert_eq!(root.errors[0].name, "Fatal");
}

#[test]
fn parse_with_comments() {
    let src = r#"
// users
type User = {
  id: uuid /* primary key */
  name: string
}
"#;
    let root = compile(src);
    assert_eq!(field_names(&root, "User"), ["id:uuid", "name:string"]);
}

#[test]
fn parse_all_primitives() {
    let src = "type All = { a: string b: int c: uint d: float e: bigint f: bool g: bytes h: money \
               i: decimal j: date k: datetime l: cpf m: cnpj n: email o: html p: url q: uuid \
               r: hex s: base64 t: xml u: json v: void }";
    let root = compile(src);
    assert_eq!(field_names(&root, "All").len(), 22);
}

#[test]
fn parse_legacy_get_operation() {
    let root = compile("get user(id: uuid): string");
    assert!(root.operation("getUser").is_some());
}

#[test]
fn parse_error_reports_location() {
    let err = parse_str("bad.idl", "type A = {\n  x int\n}").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }));
    let location = err.location().expect("location");
    assert_eq!(location.to_string(), "bad.idl:2:5");
}

fn nested_literal(depth: usize) -> String {
    format!("type A = {}int{}", "{ a: ".repeat(depth), " }".repeat(depth))
}

#[test]
fn parse_rejects_literals_nested_too_deep() {
    assert!(parse_str("deep.idl", &nested_literal(MAX_NESTING)).is_ok());

    let err = parse_str("deep.idl", &nested_literal(50_000)).unwrap_err();
    let ParseError::Syntax { message, .. } = &err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert!(message.contains("nested deeper than 128 levels"), "{message}");
    let column = err.location().expect("location").column as usize;
    assert_eq!(column, "type A = ".len() + 1 + "{ a: ".len() * MAX_NESTING);
}

#[test]
fn lexer_errors_surface_through_parser() {
    let err = parse_str("bad.idl", "type A = int[ ]").unwrap_err();
    assert!(matches!(err, ParseError::Lex(_)));
}

#[test]
fn unterminated_comment_warns_by_default_and_fails_when_strict() {
    let root = compile("type A = int /* never closed");
    assert_eq!(root.warnings.len(), 1);
    assert!(root.warnings[0].contains("block comment"));

    let strict = Parser::new("test.idl", "type A = int /* never closed")
        .with_options(LexerOptions { strict: true })
        .parse();
    assert!(strict.is_err());
}

// ==================== Imports ====================

#[test]
fn import_merges_declarations_and_tolerates_cycles() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("common.idl"),
        "import \"main\"\ntype Id = uuid\nerror NotFound",
    )
    .expect("write");
    std::fs::write(
        dir.path().join("main.idl"),
        "import \"common\"\ntype User = { id: Id }\n@throws NotFound\nfn getUser(id: Id): User",
    )
    .expect("write");

    let root = compile_file(dir.path().join("main.idl")).expect("compile");
    let names: Vec<_> = root.type_definitions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Id", "User"]);
    assert!(root.error("NotFound").is_some());
}

#[test]
fn import_from_subdirectory_with_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("shared")).expect("mkdir");
    std::fs::write(dir.path().join("shared/types.idl"), "type Money = money").expect("write");
    std::fs::write(
        dir.path().join("api.idl"),
        "import \"shared/types.idl\"\nfn price(): Money",
    )
    .expect("write");
    let root = compile_file(dir.path().join("api.idl")).expect("compile");
    assert!(root.type_definition("Money").is_some());
}

#[test]
fn missing_import_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("api.idl"), "import \"missing\"").expect("write");
    let err = compile_file(dir.path().join("api.idl")).unwrap_err();
    assert!(matches!(err, CompileError::Parse(ParseError::Import { .. })));
}

// ==================== Semantics: pipeline ====================

#[test]
fn passes_run_in_documented_order() {
    let names: Vec<_> = PASSES.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        [
            "duplicates",
            "naming",
            "resolve",
            "secrets",
            "spread",
            "empty",
            "recursion",
            "collect",
            "annotations",
            "enum_members"
        ]
    );
}

// ==================== Semantics: duplicates and naming ====================

#[test]
fn identical_redefinition_is_tolerated() {
    let root = compile("type A = { x: int }\ntype A = { x: int }");
    assert_eq!(root.type_definitions.len(), 1);
}

#[test]
fn distinct_redefinition_is_an_error() {
    let message = semantic_error("type A = { x: int }\ntype A = { x: string }");
    assert!(message.contains("'A'"), "{message}");
}

#[test]
fn duplicate_operation_is_an_error() {
    let message = semantic_error("fn ping()\nfn ping(): int");
    assert!(message.contains("ping"), "{message}");
}

#[test]
fn anonymous_literals_get_context_names() {
    let src = r#"
type User = { address: { street: string }? }
type Shape = enum { circle { radius: float } }
error Invalid: { reason: string }
fn search(filter: { q: string }): { total: int }
"#;
    let root = compile(src);
    let structs: Vec<_> = root
        .struct_types
        .iter()
        .filter_map(|id| root.declared_name(*id))
        .collect();
    for expected in ["User", "UserAddress", "ShapeCircle", "SearchFilter", "SearchReturn", "InvalidData"] {
        assert!(structs.contains(&expected), "{expected} missing from {structs:?}");
    }
}

#[test]
fn distinct_literals_receive_distinct_names() {
    let src = r#"
type SearchFilter = { other: bool }
fn search(filter: { q: string }): void
fn list(): { a: int }
fn count(): { a: string }
"#;
    let root = compile(src);
    let op = root.operation("search").expect("search");
    let arg = op.argument("filter").expect("filter");
    assert_eq!(root.type_name(arg.ty), "SearchFilter2");

    let list = root.operation("list").expect("list");
    let count = root.operation("count").expect("count");
    assert_ne!(root.type_name(list.return_type), root.type_name(count.return_type));
}

// ==================== Semantics: resolution ====================

#[test]
fn unresolved_reference_is_an_error() {
    let message = semantic_error("type A = { b: Missing }");
    assert_eq!(message, "type 'Missing' is not defined");
}

#[test]
fn references_link_to_definitions() {
    let root = compile("type Id = uuid\ntype User = { id: Id }");
    let user = root.type_definition("User").expect("User");
    let field = root.struct_type(user.ty).expect("struct").field("id").expect("id");
    let target = root.resolve(field.ty);
    assert!(matches!(root.kind(target), TypeKind::Primitive(rpcidl::PrimitiveKind::Uuid)));
}

// ==================== Semantics: secrets ====================

#[test]
fn secret_field_in_return_type_is_an_error() {
    let src = "type User = { id: uuid, name: string, secretNote: string !secret }\nfn getUser(id: uuid): User";
    let message = semantic_error(src);
    assert!(message.contains("getUser"), "{message}");
    assert!(message.contains("secretNote"), "{message}");
}

#[test]
fn secret_detected_at_any_depth() {
    let src = r#"
type Inner = { token: string !secret }
type Middle = { inner: Inner[]? }
fn f(): { middle: Middle }
"#;
    assert!(semantic_error(src).contains("token"));

    let through_enum = "type E = enum { a { key: string !secret } }\nfn g(): E[]";
    assert!(semantic_error(through_enum).contains("key"));

    let through_spread = "type S = { pin: string !secret }\nfn h(): { ...S, x: int }";
    assert!(semantic_error(through_spread).contains("pin"));
}

#[test]
fn secret_arguments_are_allowed() {
    let root = compile("fn login(user: string, password: string !secret): bool");
    let op = root.operation("login").expect("login");
    assert!(op.argument("password").expect("password").secret);
}

// ==================== Semantics: spreads ====================

#[test]
fn spread_keeps_first_position_and_last_value() {
    let root = compile("type A = { x: int, y: int }\ntype B = { ...A, y: string }");
    assert_eq!(field_names(&root, "B"), ["x:int", "y:string"]);
}

#[test]
fn spread_later_spread_overrides_direct_field() {
    let root = compile("type A = { y: bool }\ntype B = { y: int, z: int, ...A }");
    assert_eq!(field_names(&root, "B"), ["y:bool", "z:int"]);
}

#[test]
fn spread_diamond_expands_once() {
    let src = r#"
type Base = { id: uuid }
type Left = { ...Base, left: int }
type Right = { ...Base, right: int }
type Both = { ...Left, ...Right }
"#;
    let root = compile(src);
    assert_eq!(field_names(&root, "Both"), ["id:uuid", "left:int", "right:int"]);
}

#[test]
fn spread_in_operation_arguments() {
    let root = compile("type Page = { offset: uint, limit: uint }\nfn list(...Page, query: string): void");
    let op = root.operation("list").expect("list");
    let names: Vec<_> = op.arguments().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["offset", "limit", "query"]);
}

#[test]
fn spread_of_non_struct_is_an_error() {
    let message = semantic_error("type A = string\ntype B = { ...A, x: int }");
    assert!(message.contains("cannot spread"), "{message}");
}

#[test]
fn spread_cycle_is_an_error() {
    let message = semantic_error("type A = { ...B }\ntype B = { ...A }");
    assert!(message.contains("spread cycle"), "{message}");
}

// ==================== Semantics: empty types and recursion ====================

#[test]
fn empty_struct_and_enum_are_errors() {
    assert!(semantic_error("type A = {}").contains("no fields"));
    assert!(semantic_error("type E = enum {}").contains("no values"));
    assert!(semantic_error("fn f(): {}").contains("no fields"));
}

#[test]
fn direct_recursion_is_an_error() {
    assert!(semantic_error("type X = X").contains("'X'"));
    assert!(semantic_error("type X = X[]").contains("'X'"));
    assert!(semantic_error("type A = B?\ntype B = A").contains("itself"));
}

#[test]
fn recursion_through_struct_is_allowed() {
    let root = compile("type Node = { value: int, next: Node?, children: Node[] }");
    assert_eq!(root.struct_types.len(), 1);
}

// ==================== Semantics: collection ====================

#[test]
fn collection_finds_reachable_structs_and_enums_once() {
    let src = r#"
type Color = enum { red green }
type User = { color: Color, favorite: Color?, address: { street: string } }
fn f(user: User): User[]
"#;
    let root = compile(src);
    let structs: Vec<_> = root.struct_types.iter().filter_map(|id| root.declared_name(*id)).collect();
    let enums: Vec<_> = root.enum_types.iter().filter_map(|id| root.declared_name(*id)).collect();
    assert_eq!(structs, ["User", "UserAddress"]);
    assert_eq!(enums, ["Color"]);
}

// ==================== Semantics: annotations ====================

#[test]
fn annotations_are_parsed_into_values() {
    let src = r#"
@description A user
type User = {
  @description Display name
  name: string
}

@statusCode 404
error NotFound

@description Find a user
@arg name the name to look for
@throws NotFound
@hidden
fn find(name: string): User
"#;
    let root = compile(src);
    let user = root.type_definition("User").expect("User");
    assert_eq!(
        user.annotations[0].value,
        Some(AnnotationValue::Description("A user".into()))
    );
    let field = root.struct_type(user.ty).expect("struct").field("name").expect("name");
    assert_eq!(
        field.annotations[0].value,
        Some(AnnotationValue::Description("Display name".into()))
    );
    let op = root.operation("find").expect("find");
    let values: Vec<_> = op.annotations.iter().filter_map(|a| a.value.clone()).collect();
    assert_eq!(
        values,
        [
            AnnotationValue::Description("Find a user".into()),
            AnnotationValue::Arg {
                name: "name".into(),
                description: "the name to look for".into()
            },
            AnnotationValue::Throws("NotFound".into()),
            AnnotationValue::Hidden,
        ]
    );
    let error = root.error("NotFound").expect("NotFound");
    assert_eq!(error.annotations[0].value, Some(AnnotationValue::StatusCode(404)));
}

#[test]
fn throws_must_name_a_declared_error() {
    let message = semantic_error("@throws Missing\nfn f()");
    assert!(message.contains("Missing"), "{message}");
    compile("@throws Fatal\nfn f()");
}

#[test]
fn misplaced_and_unknown_annotations_are_errors() {
    assert!(semantic_error("@statusCode 404\nfn f()").contains("not allowed"));
    assert!(semantic_error("@hidden\ntype A = int").contains("not allowed"));
    assert!(semantic_error("@statusCode 700\nerror E").contains("100 and 599"));
    assert!(semantic_error("@deprecated\nfn f()").contains("unknown annotation"));
    assert!(semantic_error("@arg nope text\nfn f(id: uuid)").contains("nope"));
    assert!(semantic_error("@description\nfn f()").contains("text"));
}

#[test]
fn rest_annotation_binds_arguments() {
    let src = r#"
type Sort = enum { asc desc }
@rest GET /users/{id}?{sort}&{verbose} [header X-Tenant: {tenant}]
fn getUser(id: uuid, sort: Sort, verbose: bool?, tenant: string): void
"#;
    let root = compile(src);
    let op = root.operation("getUser").expect("getUser");
    let Some(AnnotationValue::Rest(rest)) = &op.annotations[0].value else {
        panic!("expected @rest value");
    };
    assert_eq!(rest.method, HttpMethod::Get);
    assert_eq!(rest.path_variables, ["id"]);
    assert_eq!(rest.query_variables, ["sort", "verbose"]);
    assert_eq!(rest.headers[0].0, "X-Tenant");
}

#[test]
fn rest_annotation_rejects_bad_bindings() {
    assert!(semantic_error("@rest GET /users/{uid}\nfn getUser(id: uuid)").contains("uid"));
    assert!(semantic_error("@rest GET /x [body {u}]\nfn f(u: { a: int })").contains("GET"));
    assert!(semantic_error("@rest POST /x/{u}\nfn f(u: { a: int })").contains("'u'"));
    assert!(semantic_error("@rest POST /x/{d}\nfn f(d: json)").contains("'d'"));
    assert!(semantic_error("@rest POST /x/{id}?{id}\nfn f(id: uuid)").contains("twice"));
    assert!(semantic_error("@rest FETCH /x\nfn f()").contains("@rest"));
    assert!(semantic_error("@rest GET /a\n@rest GET /b\nfn f()").contains("more than one"));
    compile("@rest POST /users [body {user}]\nfn create(user: { name: string }): void");
}

// ==================== Semantics: enums ====================

#[test]
fn duplicate_enum_member_is_an_error() {
    let message = semantic_error("type E = enum { a b a }");
    assert!(message.contains("'a'"), "{message}");
}

#[test]
fn enum_members_may_be_keywords_or_strings() {
    let root = compile(r#"type Kind = enum { type error "with space" }"#);
    let schema = ast_to_json(&root);
    let json = serde_json::to_value(schema.type_table.get("Kind").expect("Kind")).expect("json");
    assert_eq!(json, serde_json::json!(["type", "error", "with space"]));
}

// ==================== End to end ====================

#[test]
fn secret_marking_controls_compilation_and_projection() {
    let secret = "type User = { id: uuid, name: string, secretNote: string !secret }\nfn getUser(id: uuid): User";
    assert!(matches!(compile_str("test.idl", secret), Err(CompileError::Semantic(_))));

    let open = "type User = { id: uuid, name: string, secretNote: string }\nfn getUser(id: uuid): User";
    let schema = ast_to_json(&compile(open));
    let user = serde_json::to_value(schema.type_table.get("User").expect("User")).expect("json");
    assert_eq!(
        user,
        serde_json::json!({ "id": "uuid", "name": "string", "secretNote": "string" })
    );
}
