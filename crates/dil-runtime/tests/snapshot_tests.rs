//! Snapshot tests for DIL execution

use dil_parser::{parse_program, Span};
use dil_runtime::{EvalResult, Interpreter, OutputSink, Value, ValueView};

fn run_dil(source: &str) -> String {
    let program = parse_program(source).expect("Failed to parse");
    let mut interpreter = Interpreter::new();
    let mut output: Vec<String> = Vec::new();
    interpreter
        .run(&program, &mut output)
        .expect("Failed to run");
    output.join("\n")
}

/// Output lines up to the first failure, followed by the failure itself
fn run_dil_result(source: &str) -> String {
    let program = match parse_program(source) {
        Ok(p) => p,
        Err(e) => return format!("Parse error: {}", e),
    };
    let mut interpreter = Interpreter::new();
    let mut output: Vec<String> = Vec::new();
    if let Err(e) = interpreter.run(&program, &mut output) {
        output.push(format!("Runtime error: {}", e));
    }
    output.join("\n")
}

#[derive(Default)]
struct JsonSink(Vec<serde_json::Value>);

impl OutputSink for JsonSink {
    fn emit(&mut self, value: ValueView<'_>, _span: Span) -> EvalResult<()> {
        self.0
            .push(serde_json::to_value(&value).expect("Failed to serialize"));
        Ok(())
    }
}

fn run_dil_json(source: &str) -> String {
    let program = parse_program(source).expect("Failed to parse");
    let mut sink = JsonSink::default();
    Interpreter::new()
        .run(&program, &mut sink)
        .expect("Failed to run");
    serde_json::to_string_pretty(&sink.0).expect("Failed to serialize")
}

// =============================================================================
// Library Sample
// =============================================================================

#[test]
fn test_library_sample() {
    let source = include_str!("../../../demos/library.dil");
    insta::assert_snapshot!(run_dil(source), @r#"
    "Private"
    194500000000000000
    "Public"
    1900
    "1984"
    "George Orwell"
    1234567890
    10
    "John Doe"
    "john.doe@example.com"
    "123 Library St"
    "Book2"
    3
    "Private"
    8
    "#);
}

#[test]
fn test_library_final_state() {
    let source = include_str!("../../../demos/library.dil");
    let program = parse_program(source).expect("Failed to parse");
    let mut interpreter = Interpreter::new();
    interpreter
        .run(&program, &mut Vec::<String>::new())
        .expect("Failed to run");

    let library = interpreter.binding("Library").expect("Library is bound");
    insta::assert_snapshot!(interpreter.view(library).to_string(), @r#"Library {Members: [{MemberId: 1, Name: "John Doe", Email: "john.doe@example.com"}, {MemberId: 2, Name: "Jane Smith", Email: "jane.smith@example.com"}], Books: [{Title: "1984", Author: "George Orwell", ISBN: 1234567890, CopiesAvailable: 10}, {Title: "Brave New World", Author: "Aldous Huxley", ISBN: 987654321, CopiesAvailable: 8}], LibraryType: "Private", Established: 1900}"#);

    let names: Vec<_> = interpreter.registry().names().collect();
    assert_eq!(names, ["Book", "Member_Info", "Library"]);
}

// =============================================================================
// Instantiation
// =============================================================================

#[test]
fn test_instance_independence() {
    let source = r#"
        class Member_Info:
            MemberId: 0 as int;
            Name: "Anonymous";
            Meta: {};
        class:end;

        let first = Member_Info:new;
        let second = Member_Info:new;
        first->Name = "John Doe";
        first->Meta->joined = 2024;

        Get first->Name;
        Get second->Name;
        Get first->Meta;
        Get second->Meta;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "John Doe"
    "Anonymous"
    {joined: 2024}
    {}
    "#);
}

#[test]
fn test_nested_instantiation() {
    let source = r#"
        class Address: Street: "unknown"; class:end;
        class Member: Name: "Anonymous"; Home: Address:new; class:end;

        let m = Member:new;
        m->Home->Street = "123 Library St";
        Get m;
        Get Member:new;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    Member {Name: "Anonymous", Home: Address {Street: "123 Library St"}}
    Member {Name: "Anonymous", Home: Address {Street: "unknown"}}
    "#);
}

#[test]
fn test_class_definition_errors() {
    insta::assert_snapshot!(
        run_dil_result("class A: class:end; class A: class:end;"),
        @"Runtime error: Class 'A' is already defined"
    );
    insta::assert_snapshot!(
        run_dil_result("class A: x: 1; x: 2; class:end;"),
        @"Runtime error: Field 'x' is declared twice in class 'A'"
    );
    insta::assert_snapshot!(
        run_dil_result("let b = Book:new; class Book: class:end;"),
        @"Runtime error: Undefined class: Book"
    );
}

// =============================================================================
// Field Policy
// =============================================================================

#[test]
fn test_overwrite_policy() {
    let source = r#"
        class Library:
            LibraryType: "Public" $overwrite$;
            Established: 1900 as int;
            Rating: 0.0 as float;
        class:end;

        let l = Library:new;
        l->LibraryType = 42;
        Get l->LibraryType;
        l->Rating = 4;
        Get l->Rating;
        l->Established = "1945" as int;
        Get l->Established;
        l->Established = "1945";
        Get l->Established;
    "#;
    insta::assert_snapshot!(run_dil_result(source), @r#"
    42
    4.0
    1945
    Runtime error: Type mismatch for field 'Established': expected int, got str
    "#);
}

#[test]
fn test_large_integer_fidelity() {
    let source = r#"
        class Library: Established: 1900 as int; class:end;
        let l = Library:new;
        l->Established = 194500000000000000;
        Get l->Established;
    "#;
    assert_eq!(run_dil(source), "194500000000000000");
    assert_eq!(run_dil_json(source), "[\n  194500000000000000\n]");
}

#[test]
fn test_closed_object_schema() {
    let source = r#"
        class Book: Title: "Unknown"; class:end;
        let b = Book:new;
        let m = { Title: "Dune" } as map;
        m->Isbn = 42;
        Get m;
        b->Isbn = 42;
    "#;
    insta::assert_snapshot!(run_dil_result(source), @r#"
    {Title: "Dune", Isbn: 42}
    Runtime error: Path not found: no 'Isbn' in object Book
    "#);
}

// =============================================================================
// Paths
// =============================================================================

#[test]
fn test_nested_navigation() {
    let source = r#"
        let libraryConfig = {
            sections: {
                fiction: { books: ["Book1", "Book2"], staff: 5 },
                nonFiction: { books: ["Book3", "Book4"], staff: 3 }
            }
        } as map;
        Get libraryConfig->sections->fiction->books[1];
        Get libraryConfig->sections->nonFiction;
        libraryConfig->sections->fiction->books[0] = "Dune";
        Get libraryConfig->sections->fiction->books;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "Book2"
    {books: ["Book3", "Book4"], staff: 3}
    ["Dune", "Book2"]
    "#);
}

#[test]
fn test_bounds_checking() {
    insta::assert_snapshot!(
        run_dil_result("let a = [1, 2]; Get a[1]; Get a[2];"),
        @r#"
    2
    Runtime error: Index out of range: 2 (length: 2)
    "#
    );
    insta::assert_snapshot!(
        run_dil_result("let a = [1, 2]; a[-1] = 3;"),
        @"Runtime error: Index out of range: -1 (length: 2)"
    );
}

#[test]
fn test_missing_path_fails_fast() {
    insta::assert_snapshot!(
        run_dil_result("let m = { a: 1 }; Get m->b;"),
        @"Runtime error: Path not found: no 'b' in map"
    );
    insta::assert_snapshot!(
        run_dil_result("let m = { a: 1 }; m->b->c = 1;"),
        @"Runtime error: Path not found: no 'b' in map"
    );
    insta::assert_snapshot!(
        run_dil_result("let a = [1]; Get a->length;"),
        @"Runtime error: Path not found: no '->length' in array"
    );
}

#[test]
fn test_variable_and_string_indices() {
    let source = r#"
        let books = ["Book1", "Book2", "Book3"];
        let i = 1;
        Get books[i];
        Get books[i + 1];
        Get books["0"];
        Get "hello"[i];
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "Book2"
    "Book3"
    "Book1"
    "e"
    "#);

    insta::assert_snapshot!(
        run_dil_result(r#"let s = "abc"; s[0] = "x";"#),
        @"Runtime error: Path not found: no '[0]' in str"
    );
}

// =============================================================================
// Aliasing
// =============================================================================

#[test]
fn test_shared_composite_aliasing() {
    let source = r#"
        class Library: Members: 0; class:end;
        let Library = Library:new;
        let Member1 = { Name: "John Doe" } as map;
        let Member2 = { Name: "Jane Smith" } as map;
        Library->Members = [Member1, Member2] as array;
        Get Library->Members[0]->Name;

        Member1->Name = "Johnny";
        Get Library->Members[0]->Name;

        Library->Members[1]->Name = "Jane";
        Get Member2->Name;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "John Doe"
    "Johnny"
    "Jane"
    "#);
}

#[test]
fn test_rebinding_breaks_alias_only_for_the_binding() {
    let source = r#"
        let a = { n: 1 };
        let b = a;
        a = { n: 2 };
        Get b->n;
        Get a->n;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    1
    2
    "#);
}

#[test]
fn test_cycle_rendering() {
    let source = r#"
        let m = { name: "root" };
        m->me = m;
        Get m;
        Get m->me->me->name;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    {name: "root", me: <cycle>}
    "root"
    "#);
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_arithmetic() {
    let source = r#"
        let id = 4;
        let m = 23 + id;
        Get m;
        Get (1 + 2) * 3;
        Get 1 + 2 * 3;
        Get 7 / 2;
        Get 7 % 4;
        Get 7.0 / 2;
        Get -id;
        Get "Book" + 2;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    27
    9
    7
    3
    3
    3.5
    -4
    "Book2"
    "#);
}

#[test]
fn test_arithmetic_errors() {
    insta::assert_snapshot!(run_dil_result("Get 1 / 0;"), @"Runtime error: Division by zero");
    insta::assert_snapshot!(
        run_dil_result("Get [1] + 1;"),
        @"Runtime error: Unsupported operation '+' for array, int"
    );
    insta::assert_snapshot!(
        run_dil_result("Get 9223372036854775807 + 1;"),
        @"Runtime error: Integer overflow in '+'"
    );
}

#[test]
fn test_casts() {
    let source = r#"
        Get "1234567890" as int;
        Get 3 as float;
        Get 2.5 as string;
        Get "true" as boolean;
        Get 1984 as str;
        Get { a: 1 } as map;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    1234567890
    3.0
    "2.5"
    true
    "1984"
    {a: 1}
    "#);

    insta::assert_snapshot!(
        run_dil_result("Get {} as array;"),
        @"Runtime error: Invalid cast: cannot convert map to array"
    );
    insta::assert_snapshot!(
        run_dil_result("Get 2.5 as int;"),
        @"Runtime error: Invalid cast: cannot convert float 2.5 to int"
    );
}

#[test]
fn test_undefined_variable() {
    insta::assert_snapshot!(run_dil_result("Get nope;"), @"Runtime error: Undefined variable: nope");
    insta::assert_snapshot!(run_dil_result("nope = 1;"), @"Runtime error: Undefined variable: nope");
}

#[test]
fn test_get_keyword_spellings() {
    assert_eq!(run_dil("let x = 1; Get x; GET x; get x;"), "1\n1\n1");
}

#[test]
fn test_duplicate_map_keys_last_wins() {
    assert_eq!(run_dil("Get { a: 1, b: 2, a: 3 };"), "{a: 3, b: 2}");
}

#[test]
fn test_keywords_as_keys_and_fields() {
    let source = r#"
        class Query:
            get: "all";
            class: "A";
        class:end;
        let q = Query:new;
        Get q->get;
        q->class = "B";
        Get q;
        let m = { get: 1, if: true, "for": 2 };
        Get m->if;
        Get m;
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "all"
    Query {get: "all", class: "B"}
    true
    {get: 1, if: true, for: 2}
    "#);
}

#[test]
fn test_float_literal_forms() {
    insta::assert_snapshot!(run_dil("Get 2.; Get 1e5; Get 1.5E-3; Get 2.5e1;"), @r"
    2.0
    100000.0
    0.0015
    25.0
    ");
    assert!(run_dil_result("Get 1e400;").starts_with("Parse error"));
    insta::assert_snapshot!(
        run_dil_result(r#"Get "1e400" as float;"#),
        @r#"Runtime error: Invalid cast: cannot convert str "1e400" to float"#
    );
}

// =============================================================================
// Comparison and Logic
// =============================================================================

#[test]
fn test_comparison_and_logic() {
    let source = r#"
        let n = 4;
        Get n < 5;
        Get n >= 4.5;
        Get 1 + 2 == 3;
        Get "Dune" < "Emma";
        Get "x" != "y";
        Get n > 1 && n < 3;
        Get n == 0 || !false;
        Get 6 & 3;
        Get 6 | 3;
    "#;
    insta::assert_snapshot!(run_dil(source), @r"
    true
    false
    true
    true
    true
    false
    true
    2
    7
    ");
}

#[test]
fn test_comparison_errors() {
    insta::assert_snapshot!(
        run_dil_result(r#"Get 1 < "a";"#),
        @"Runtime error: Unsupported operation '<' for int, str"
    );
    insta::assert_snapshot!(
        run_dil_result("Get !1;"),
        @"Runtime error: Unsupported operation '!' for int"
    );
    insta::assert_snapshot!(
        run_dil_result("Get 1 && true;"),
        @"Runtime error: Unsupported operation '&&' for int, bool"
    );
}

// =============================================================================
// Control Flow
// =============================================================================

#[test]
fn test_control_flow() {
    let source = r#"
        let books = ["1984", "Dune"];
        FOREACH title, i IN books DO
            Get i + ": " + title;
        ENDFOREACH

        let counts = { a: 1, b: 2 };
        foreach v, k in counts do Get k; Get v; endforeach

        let total = 0;
        FOR n WHEN n < 4 DO
            total = total + n;
            n = n + 1;
        ENDFOR
        Get total;

        IF total > 5 THEN
            Get "big";
        ELSE
            Get "small";
        ENDIF
    "#;
    insta::assert_snapshot!(run_dil(source), @r#"
    "0: 1984"
    "1: Dune"
    "a"
    1
    "b"
    2
    6
    "big"
    "#);
}

#[test]
fn test_nested_blocks() {
    let source = r#"
        let grid = [[1, 2], [3]];
        FOREACH row IN grid DO
            FOREACH cell IN row DO
                IF cell % 2 == 1 THEN Get cell; ENDIF
            ENDFOREACH
        ENDFOREACH
    "#;
    insta::assert_snapshot!(run_dil(source), @r"
    1
    3
    ");
}

#[test]
fn test_control_flow_errors() {
    insta::assert_snapshot!(
        run_dil_result("IF null THEN Get 1; ENDIF"),
        @"Runtime error: Condition must evaluate to bool, got null"
    );
    insta::assert_snapshot!(
        run_dil_result("FOREACH x IN 5 DO ENDFOREACH"),
        @"Runtime error: Cannot iterate over int"
    );
    insta::assert_snapshot!(
        run_dil_result("class A: n: 1; class:end; FOREACH x IN A:new DO ENDFOREACH"),
        @"Runtime error: Cannot iterate over object"
    );
    insta::assert_snapshot!(
        run_dil_result("Get 1; FOR i WHEN i < 2 DO Get missing; ENDFOR Get 2;"),
        @r"
    1
    Runtime error: Undefined variable: missing
    "
    );
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_json_output() {
    let source = r#"
        class Book:
            Title: "Unknown Title";
            ISBN: 0 as int;
            Tags: [];
            Price: null;
        class:end;
        let b = Book:new;
        b->Tags = ["classic", 1.5, true];
        Get b;
    "#;
    insta::assert_snapshot!(run_dil_json(source), @r#"
    [
      {
        "Title": "Unknown Title",
        "ISBN": 0,
        "Tags": [
          "classic",
          1.5,
          true
        ],
        "Price": null
      }
    ]
    "#);
}

#[test]
fn test_json_cycle_marker() {
    let source = "let a = [1]; a[0] = a; Get a;";
    assert_eq!(run_dil_json(source), "[\n  [\n    \"<cycle>\"\n  ]\n]");
}

// =============================================================================
// Heap Introspection
// =============================================================================

#[test]
fn test_deep_equality_through_heap() {
    let source = r#"
        let a = { books: ["x", "y"] };
        let b = { books: ["x", "y"] };
        let c = a;
    "#;
    let program = parse_program(source).expect("Failed to parse");
    let mut interpreter = Interpreter::new();
    interpreter
        .run(&program, &mut Vec::<String>::new())
        .expect("Failed to run");

    let a = interpreter.binding("a").unwrap();
    let b = interpreter.binding("b").unwrap();
    let c = interpreter.binding("c").unwrap();
    assert_ne!(a, b);
    assert_eq!(a, c);
    assert!(interpreter.heap().deep_eq(a, b));
    assert!(!interpreter.heap().deep_eq(a, &Value::Null));
}
