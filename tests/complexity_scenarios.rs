//! Complexity of conditionals, multi-way dispatch, guards and loops across
//! languages, plus a generated nesting property for the CFG.

use chrono::Utc;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;
use trellis_rs::{Indexer, Language, SourceFile, TrellisConfig};

const IF_ELSE: &[(Language, &str, &str)] = &[
    (
        Language::Python,
        "choose.py",
        "def choose(c):\n    if c:\n        a()\n    else:\n        b()\n",
    ),
    (
        Language::JavaScript,
        "choose.js",
        "function choose(c) {\n  if (c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::TypeScript,
        "choose.ts",
        "function choose(c: boolean): void {\n  if (c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::Tsx,
        "choose.tsx",
        "function choose(c: boolean): void {\n  if (c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::Rust,
        "choose.rs",
        "fn choose(c: bool) {\n    if c { a() } else { b() }\n}\n",
    ),
    (
        Language::Go,
        "choose.go",
        "package main\n\nfunc choose(c bool) {\n\tif c {\n\t\ta()\n\t} else {\n\t\tb()\n\t}\n}\n",
    ),
    (
        Language::C,
        "choose.c",
        "void choose(int c) {\n    if (c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::Cpp,
        "choose.cpp",
        "void choose(bool c) {\n    if (c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::Java,
        "Choose.java",
        "class Choose {\n    void choose(boolean c) {\n        if (c) { a(); } else { b(); }\n    }\n}\n",
    ),
    (
        Language::CSharp,
        "Choose.cs",
        "class Choose {\n    void choose(bool c) {\n        if (c) { A(); } else { B(); }\n    }\n}\n",
    ),
    (
        Language::Ruby,
        "choose.rb",
        "def choose(c)\n  if c\n    a()\n  else\n    b()\n  end\nend\n",
    ),
    (
        Language::Php,
        "choose.php",
        "<?php\nfunction choose($c) {\n    if ($c) { a(); } else { b(); }\n}\n",
    ),
    (
        Language::Scala,
        "choose.scala",
        "object Choose {\n  def choose(c: Boolean): Unit = {\n    if (c) a() else b()\n  }\n}\n",
    ),
];

/// Two cases and no default: either case or neither runs.
const SWITCH_WITHOUT_DEFAULT: &[(Language, &str, &str)] = &[
    (
        Language::Python,
        "route.py",
        "def route(x):\n    match x:\n        case 1:\n            a()\n        case 2:\n            b()\n    return 0\n",
    ),
    (
        Language::JavaScript,
        "route.js",
        "function route(x) {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n  }\n  return 0;\n}\n",
    ),
    (
        Language::TypeScript,
        "route.ts",
        "function route(x: number): number {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n  }\n  return 0;\n}\n",
    ),
    (
        Language::Tsx,
        "route.tsx",
        "function route(x: number): number {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n  }\n  return 0;\n}\n",
    ),
    (
        Language::Go,
        "route.go",
        "package main\n\nfunc route(x int) int {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\tcase 2:\n\t\tb()\n\t}\n\treturn 0\n}\n",
    ),
    (
        Language::C,
        "route.c",
        "int route(int x) {\n    switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    }\n    return 0;\n}\n",
    ),
    (
        Language::Cpp,
        "route.cpp",
        "int route(int x) {\n    switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    }\n    return 0;\n}\n",
    ),
    (
        Language::Java,
        "Router.java",
        "class Router {\n    int route(int x) {\n        switch (x) {\n            case 1: a(); break;\n            case 2: b(); break;\n        }\n        return 0;\n    }\n}\n",
    ),
    (
        Language::CSharp,
        "Router.cs",
        "class Router {\n    int route(int x) {\n        switch (x) {\n            case 1: A(); break;\n            case 2: B(); break;\n        }\n        return 0;\n    }\n}\n",
    ),
    (
        Language::Ruby,
        "route.rb",
        "def route(x)\n  case x\n  when 1\n    a\n  when 2\n    b\n  end\n  0\nend\n",
    ),
    (
        Language::Php,
        "route.php",
        "<?php\nfunction route($x) {\n    switch ($x) {\n        case 1: a(); break;\n        case 2: b(); break;\n    }\n    return 0;\n}\n",
    ),
];

/// Two cases and a default or wildcard arm.
const SWITCH_WITH_DEFAULT: &[(Language, &str, &str)] = &[
    (
        Language::Python,
        "route.py",
        "def route(x):\n    match x:\n        case 1:\n            a()\n        case 2:\n            b()\n        case _:\n            c()\n",
    ),
    (
        Language::JavaScript,
        "route.js",
        "function route(x) {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    default: c();\n  }\n}\n",
    ),
    (
        Language::TypeScript,
        "route.ts",
        "function route(x: number): void {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    default: c();\n  }\n}\n",
    ),
    (
        Language::Tsx,
        "route.tsx",
        "function route(x: number): void {\n  switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    default: c();\n  }\n}\n",
    ),
    (
        Language::Rust,
        "route.rs",
        "fn route(x: i32) {\n    match x {\n        1 => a(),\n        2 => b(),\n        _ => c(),\n    }\n}\n",
    ),
    (
        Language::Go,
        "route.go",
        "package main\n\nfunc route(x int) {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\tcase 2:\n\t\tb()\n\tdefault:\n\t\tc()\n\t}\n}\n",
    ),
    (
        Language::C,
        "route.c",
        "void route(int x) {\n    switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    default: c();\n    }\n}\n",
    ),
    (
        Language::Cpp,
        "route.cpp",
        "void route(int x) {\n    switch (x) {\n    case 1: a(); break;\n    case 2: b(); break;\n    default: c();\n    }\n}\n",
    ),
    (
        Language::Java,
        "Router.java",
        "class Router {\n    void route(int x) {\n        switch (x) {\n            case 1 -> a();\n            case 2 -> b();\n            default -> c();\n        }\n    }\n}\n",
    ),
    (
        Language::CSharp,
        "Router.cs",
        "class Router {\n    void route(int x) {\n        switch (x) {\n            case 1: A(); break;\n            case 2: B(); break;\n            default: C(); break;\n        }\n    }\n}\n",
    ),
    (
        Language::Ruby,
        "route.rb",
        "def route(x)\n  case x\n  when 1\n    a\n  when 2\n    b\n  else\n    c\n  end\nend\n",
    ),
    (
        Language::Php,
        "route.php",
        "<?php\nfunction route($x) {\n    switch ($x) {\n        case 1: a(); break;\n        case 2: b(); break;\n        default: c();\n    }\n}\n",
    ),
    (
        Language::Scala,
        "route.scala",
        "object Router {\n  def route(x: Int): Unit = x match {\n    case 1 => a()\n    case 2 => b()\n    case _ => c()\n  }\n}\n",
    ),
];

/// One guarded arm and a default: the guard is a decision of its own.
const GUARDED_ARM: &[(Language, &str, &str)] = &[
    (
        Language::Python,
        "route.py",
        "def route(x, y):\n    match x:\n        case 1 if y:\n            a()\n        case _:\n            b()\n",
    ),
    (
        Language::Rust,
        "route.rs",
        "fn route(x: i32, y: bool) {\n    match x {\n        1 if y => a(),\n        _ => b(),\n    }\n}\n",
    ),
    (
        Language::Scala,
        "route.scala",
        "object Router {\n  def route(x: Int, y: Boolean): Unit = x match {\n    case 1 if y => a()\n    case _ => b()\n  }\n}\n",
    ),
    (
        Language::CSharp,
        "Router.cs",
        "class Router {\n    void route(object x, bool y) {\n        switch (x) {\n            case int n when y: A(); break;\n            default: B(); break;\n        }\n    }\n}\n",
    ),
    (
        Language::Java,
        "Router.java",
        "class Router {\n    void route(Object x, boolean y) {\n        switch (x) {\n            case Integer n when y -> a();\n            default -> b();\n        }\n    }\n}\n",
    ),
    (
        Language::Ruby,
        "route.rb",
        "def route(x, y)\n  case x\n  in Integer if y\n    a\n  else\n    b\n  end\nend\n",
    ),
];

/// A loop with no exit test around a conditional `break`.
const UNCONDITIONAL_LOOP: &[(Language, &str, &str)] = &[
    (
        Language::Rust,
        "route.rs",
        "fn route() {\n    loop {\n        if done() {\n            break;\n        }\n    }\n}\n",
    ),
    (
        Language::Go,
        "route.go",
        "package main\n\nfunc route() {\n\tfor {\n\t\tif done() {\n\t\t\tbreak\n\t\t}\n\t}\n}\n",
    ),
    (
        Language::C,
        "route.c",
        "void route(void) {\n    for (;;) {\n        if (done()) break;\n    }\n}\n",
    ),
    (
        Language::Cpp,
        "route.cpp",
        "void route() {\n    for (;;) {\n        if (done()) break;\n    }\n}\n",
    ),
    (
        Language::Java,
        "Router.java",
        "class Router {\n    void route() {\n        for (;;) {\n            if (done()) break;\n        }\n    }\n}\n",
    ),
    (
        Language::CSharp,
        "Router.cs",
        "class Router {\n    void route() {\n        for (;;) {\n            if (Done()) break;\n        }\n    }\n}\n",
    ),
    (
        Language::JavaScript,
        "route.js",
        "function route() {\n  for (;;) {\n    if (done()) break;\n  }\n}\n",
    ),
    (
        Language::TypeScript,
        "route.ts",
        "function route(): void {\n  for (;;) {\n    if (done()) break;\n  }\n}\n",
    ),
    (
        Language::Php,
        "route.php",
        "<?php\nfunction route() {\n    for (;;) {\n        if (done()) break;\n    }\n}\n",
    ),
];

fn complexity_of(language: Language, path: &str, text: &str, name: &str) -> usize {
    let indexer = Indexer::new(TrellisConfig::default()).unwrap();
    let file = SourceFile::new(path, language, text, Utc::now());
    indexer.index(vec![file], &CancellationToken::new()).unwrap();
    let graph = indexer.snapshot().unwrap();
    let node = graph
        .nodes()
        .find(|n| n.name == name)
        .unwrap_or_else(|| panic!("{language}: no node named {name}"));
    node.complexity
        .unwrap_or_else(|| panic!("{language}: {name} has no complexity"))
        .value()
}

#[test]
fn if_else_scores_two_in_every_language() {
    assert_eq!(IF_ELSE.len(), Language::ALL.len());
    for (language, path, text) in IF_ELSE {
        assert_eq!(
            complexity_of(*language, path, text, "choose"),
            2,
            "{language} if/else"
        );
    }
}

fn assert_table(table: &[(Language, &str, &str)], name: &str, expected: usize, what: &str) {
    for (language, path, text) in table {
        assert_eq!(
            complexity_of(*language, path, text, name),
            expected,
            "{language} {what}"
        );
    }
}

#[test]
fn switch_without_default_counts_every_case() {
    assert_table(SWITCH_WITHOUT_DEFAULT, "route", 3, "switch without default");
}

#[test]
fn switch_with_default_counts_all_but_one_arm() {
    assert_eq!(SWITCH_WITH_DEFAULT.len(), Language::ALL.len());
    assert_table(SWITCH_WITH_DEFAULT, "route", 3, "switch with default");
}

#[test]
fn guarded_arm_scores_the_same_everywhere() {
    assert_table(GUARDED_ARM, "route", 3, "guarded arm");
}

#[test]
fn loop_without_condition_is_not_a_decision() {
    assert_table(UNCONDITIONAL_LOOP, "route", 2, "unconditional loop");
}

#[test]
fn straight_line_function_scores_one() {
    let text = "def plain(x):\n    y = x + 1\n    return y\n";
    assert_eq!(complexity_of(Language::Python, "plain.py", text, "plain"), 1);
}

/// A nested Python construct and the decision points it adds.
#[derive(Debug, Clone, Copy)]
enum Construct {
    If,
    While,
    For,
    IfAnd,
}

impl Construct {
    fn header(self) -> &'static str {
        match self {
            Construct::If => "if x:",
            Construct::While => "while x:",
            Construct::For => "for i in x:",
            Construct::IfAnd => "if x and y:",
        }
    }

    fn decisions(self) -> usize {
        match self {
            Construct::IfAnd => 2,
            _ => 1,
        }
    }
}

fn nested_source(constructs: &[Construct]) -> String {
    let mut text = String::from("def nested(x, y):\n");
    let mut indent = 1;
    for construct in constructs {
        text.push_str(&"    ".repeat(indent));
        text.push_str(construct.header());
        text.push('\n');
        indent += 1;
    }
    text.push_str(&"    ".repeat(indent));
    text.push_str("pass\n");
    text.push_str("    return x\n");
    text
}

fn construct() -> impl Strategy<Value = Construct> {
    prop_oneof![
        Just(Construct::If),
        Just(Construct::While),
        Just(Construct::For),
        Just(Construct::IfAnd),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn nested_decisions_add_up(constructs in prop::collection::vec(construct(), 0..12)) {
        let expected = 1 + constructs.iter().map(|c| c.decisions()).sum::<usize>();
        let text = nested_source(&constructs);
        prop_assert_eq!(complexity_of(Language::Python, "nested.py", &text, "nested"), expected);
    }
}
