#![forbid(unsafe_code)]
#![allow(clippy::result_large_err)]

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use sharc_utilities::SharcError;

use crate::ATerm;
use crate::Symbol;
use crate::TermBuilder;
use crate::Yield;
use crate::storage::TermStore;

#[derive(Parser)]
#[grammar = "term_grammar.pest"]
pub struct TermParser;

/// The term that is constructed for a node of the parse tree.
#[derive(Debug)]
enum Construct<'s> {
    Application(Symbol<'s>),
    List,
}

impl TermStore {
    /// Parses a term in the textual format.
    ///
    /// Grammar:  i | [t_1, ..., t_n] | f(t_1, ..., t_n) | c
    ///
    /// where `i` is a (possibly negative) integer, and `f` and `c` are
    /// identifiers or quoted names such as `"f x"`.
    pub fn from_string(&self, text: &str) -> Result<ATerm<'_>, SharcError> {
        let mut pairs = TermParser::parse(Rule::TermSpec, text)?;
        let root = pairs
            .next()
            .and_then(|spec| spec.into_inner().next())
            .ok_or("The term specification is empty")?;

        let mut builder = TermBuilder::<Pair<'_, Rule>, Construct<'_>>::new();
        builder.evaluate(
            self,
            root,
            |store, args, pair| match pair.as_rule() {
                Rule::Int => {
                    let value: i64 = pair.as_str().parse()?;
                    Ok(Yield::Term(store.make_int(value)))
                }
                Rule::List => {
                    for element in pair.into_inner() {
                        args.push(element);
                    }

                    Ok(Yield::Construct(Construct::List))
                }
                Rule::Appl => {
                    let mut inner = pair.into_inner();
                    let name = inner.next().ok_or("An application has a name")?;
                    let arguments: Vec<Pair<'_, Rule>> = inner
                        .next()
                        .map(|arguments| arguments.into_inner().collect())
                        .unwrap_or_default();

                    let symbol = match name.as_rule() {
                        Rule::QuotedId => store.symbol(unescape(name.as_str()), arguments.len(), true),
                        _ => store.symbol(name.as_str(), arguments.len(), false),
                    };

                    for argument in arguments {
                        args.push(argument);
                    }

                    Ok(Yield::Construct(Construct::Application(symbol)))
                }
                rule => Err(format!("Unexpected rule {rule:?} in a term").into()),
            },
            |store, construct, args| match construct {
                Construct::Application(symbol) => Ok(store.make_application_iter(&symbol, args)),
                Construct::List => Ok(store.make_list(args)),
            },
        )
    }
}

/// Removes the surrounding quotes of a quoted name and resolves its escapes.
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some(other) => result.push(other),
                None => {}
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::Symb;
    use crate::Term;

    use super::*;

    #[test]
    fn test_parse_term() {
        let store = TermStore::new();
        let term = store.from_string("f(a, b)").unwrap();

        assert_eq!(term.get_head_symbol().name(), "f");
        assert_eq!(term.arity(), 2);
        assert_eq!(term.arg(1).get_head_symbol().name(), "b");

        let f = store.symbol("f", 2, false);
        let a = store.make_constant(&store.symbol("a", 0, false));
        let b = store.make_constant(&store.symbol("b", 0, false));
        assert_eq!(term, store.make_application(&f, &[a, b]), "Parsed terms are shared");
    }

    #[test_case("0" ; "zero")]
    #[test_case("-42" ; "negative integer")]
    #[test_case("[]" ; "empty list")]
    #[test_case("[1,[2,[]],c]" ; "nested lists")]
    #[test_case("f(g(x),[1,2],h(\"quoted \\\"name\\\"\"(y)))" ; "quoted names")]
    fn test_print_parse(text: &str) {
        let store = TermStore::new();
        let term = store.from_string(text).unwrap();
        assert_eq!(term.to_string(), text, "Printing a parsed term yields the input");
    }

    #[test]
    fn test_quoted_symbol() {
        let store = TermStore::new();
        let term = store.from_string("\"a\\nb\"").unwrap();
        let symbol = term.get_head_symbol();

        assert!(symbol.is_quoted());
        assert_eq!(symbol.name(), "a\nb");
    }

    #[test_case("f(" ; "unclosed arguments")]
    #[test_case("f()" ; "empty arguments")]
    #[test_case("[1,]" ; "trailing comma")]
    #[test_case("99999999999999999999" ; "integer overflow")]
    #[test_case("f(a) b" ; "trailing input")]
    fn test_parse_errors(text: &str) {
        let store = TermStore::new();
        assert!(store.from_string(text).is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_deeply_nested() {
        let store = TermStore::new();
        let depth = 200;
        let text = format!("{}a{}", "f(".repeat(depth), ")".repeat(depth));

        let term = store.from_string(&text).unwrap();
        assert_eq!(term.iter().count(), depth + 1);
    }
}
