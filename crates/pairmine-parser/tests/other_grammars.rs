use pairmine_parser::{Grammar, LineRange, SyntaxTreeProvider, collect_all_methods, collect_methods_in_ranges};

fn method_names(grammar: Grammar, source: &str) -> Vec<String> {
    let tree = SyntaxTreeProvider::new(grammar)
        .unwrap()
        .parse(source.as_bytes())
        .unwrap();
    collect_all_methods(&tree)
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect()
}

#[test]
fn python_functions_and_methods() {
    let source = "\
def top():
    pass

class Greeter:
    def greet(self, name):
        return name
";
    assert_eq!(method_names(Grammar::Python, source), vec!["top", "greet"]);
}

#[test]
fn python_range_selection() {
    let source = "def a():\n    pass\n\ndef b():\n    return 1\n";
    let tree = SyntaxTreeProvider::new(Grammar::Python)
        .unwrap()
        .parse(source.as_bytes())
        .unwrap();
    let hit = collect_methods_in_ranges(&tree, &[LineRange::new(3, 3)]).unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(hit[0].name(), "b");
}

#[test]
fn go_functions_and_receiver_methods() {
    let source = "\
package main

func helper() int { return 1 }

type Server struct{}

func (s *Server) Serve() error { return nil }
";
    assert_eq!(method_names(Grammar::Go, source), vec!["helper", "Serve"]);
}

#[test]
fn rust_free_and_impl_functions() {
    let source = "\
fn main() {}

struct Counter;

impl Counter {
    fn bump(&mut self) -> usize { 1 }
}
";
    assert_eq!(method_names(Grammar::Rust, source), vec!["main", "bump"]);
}
