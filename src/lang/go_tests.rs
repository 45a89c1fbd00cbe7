use super::*;
use crate::lang::common::SignatureKind;
use crate::lang::test_support::{complexity_of, scan};

const SERVER: &str = r#"
package server

const DefaultPort = 8080

// Server accepts connections.
type Server struct {
    port int
}

type handlerFunc = func(int) error

// Serve runs until stopped.
func (s *Server) Serve(ctx Context, retries, backoff int) (int, error) {
    for i := 0; i < retries; i++ {
        if err := s.accept(); err != nil && !retryable(err) {
            return i, err
        }
    }
    return 0, nil
}

func (s Server) accept() error {
    return nil
}

func newServer(port int) *Server {
    var local = 3
    return &Server{port: port + local}
}
"#;

#[test]
fn test_signatures_and_receivers() {
    let (_, scan) = scan(Language::Go, SERVER);
    let found: Vec<(&str, SignatureKind)> = scan
        .signatures
        .iter()
        .map(|s| (s.id.as_str(), s.kind))
        .collect();
    assert_eq!(
        found,
        vec![
            ("test.go::DefaultPort", SignatureKind::Variable),
            ("test.go::Server", SignatureKind::Type),
            ("test.go::handlerFunc", SignatureKind::Type),
            ("test.go::Server::Serve", SignatureKind::Method),
            ("test.go::Server::accept", SignatureKind::Method),
            ("test.go::newServer", SignatureKind::Function),
        ]
    );
}

#[test]
fn test_grouped_parameters() {
    let (_, scan) = scan(Language::Go, SERVER);
    let serve = scan.signatures.iter().find(|s| s.name == "Serve").unwrap();
    let params: Vec<(&str, Option<&str>)> = serve
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.type_name.as_deref()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("ctx", Some("Context")),
            ("retries", Some("int")),
            ("backoff", Some("int")),
        ]
    );
    assert_eq!(serve.return_type.as_deref(), Some("(int, error)"));
    assert_eq!(serve.doc.as_deref(), Some("Serve runs until stopped."));
}

#[test]
fn test_exported_visibility() {
    assert_eq!(exported_visibility("Serve"), Visibility::Public);
    assert_eq!(exported_visibility("accept"), Visibility::Private);
    assert_eq!(exported_visibility("_x"), Visibility::Private);
}

#[test]
fn test_type_doc_from_declaration_comment() {
    let (_, scan) = scan(Language::Go, SERVER);
    let server = scan.signatures.iter().find(|s| s.name == "Server").unwrap();
    assert_eq!(server.doc.as_deref(), Some("Server accepts connections."));
}

#[test]
fn test_receiver_type_name() {
    assert_eq!(receiver_type_name("*Server").as_deref(), Some("Server"));
    assert_eq!(receiver_type_name("List[T]").as_deref(), Some("List"));
    assert_eq!(receiver_type_name(" "), None);
}

#[test]
fn test_loop_with_compound_condition() {
    // for, if, &&
    assert_eq!(complexity_of(Language::Go, SERVER, "Serve"), 4);
    assert_eq!(complexity_of(Language::Go, SERVER, "newServer"), 1);
}

#[test]
fn test_switch_arms() {
    let source = r#"
package main

func kind(n int) string {
    switch {
    case n < 0:
        return "neg"
    case n == 0:
        return "zero"
    default:
        return "pos"
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, source, "kind"), 3);
}

#[test]
fn test_switch_without_default() {
    let source = r#"
package main

func kind(n int) {
    switch n {
    case 1:
        one()
    case 2:
        two()
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, source, "kind"), 3);

    let type_switch = r#"
package main

func describe(v any) {
    switch v.(type) {
    case int:
        number()
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, type_switch, "describe"), 2);
}

#[test]
fn test_select_always_takes_a_case() {
    let source = r#"
package main

func pump(in, out chan int) {
    select {
    case v := <-in:
        use(v)
    case out <- 1:
        sent()
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, source, "pump"), 2);
}

#[test]
fn test_for_without_condition() {
    let forever = r#"
package main

func spin() {
    for {
        if done() {
            break
        }
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, forever, "spin"), 2);

    let clause_without_test = r#"
package main

func drain() {
    for i := 0; ; i++ {
        step(i)
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, clause_without_test, "drain"), 1);

    let ranged = r#"
package main

func each(xs []int) {
    for _, x := range xs {
        step(x)
    }
}
"#;
    assert_eq!(complexity_of(Language::Go, ranged, "each"), 2);
}
