#![forbid(unsafe_code)]

use std::fmt;

use sharc_utilities::SharcError;
use sharc_utilities::debug_trace;

use crate::ATerm;
use crate::storage::TermStore;

/// This can be used to construct an [ATerm] from a given input of (inductive) type I
/// without using recursion, as such avoiding system stack overflows. See [TermBuilder::evaluate]
/// for more details.
pub struct TermBuilder<'s, I, C> {
    // The stack of terms
    terms: Vec<Option<ATerm<'s>>>,
    configs: Vec<Config<I, C>>,
}

/// The arguments that are passed to the `construct` function of [TermBuilder::evaluate].
pub type BuilderArgs<'a, 's> = std::iter::Flatten<std::slice::Iter<'a, Option<ATerm<'s>>>>;

impl<'s, I: fmt::Debug, C: fmt::Debug> TermBuilder<'s, I, C> {
    pub fn new() -> TermBuilder<'s, I, C> {
        TermBuilder {
            terms: vec![],
            configs: vec![],
        }
    }

    /// This can be used to construct a term from a given input of (inductive)
    /// type I, without using the system stack, i.e. recursion.
    ///
    /// The `transformer` function is applied to every instance I, which can
    /// generate more inputs using a so-called argument stack and some
    /// instance C that is used to construct the result term. Alternatively, it
    /// yields a result term directly.
    ///
    /// The `construct` function takes an instance C and the terms that were
    /// constructed for the inputs pushed onto the argument stack, in order.
    ///
    /// # Example
    ///
    /// To construct a term from a parse tree, `I` is a node of the parse tree
    /// and `C` is the symbol of the term. The `transformer` yields integers
    /// directly, and for applications pushes the children of the node and
    /// yields Construct(symbol). The `construct` function then creates the
    /// application of the symbol to the arguments.
    pub fn evaluate<F, G>(
        &mut self,
        store: &'s TermStore,
        input: I,
        transformer: F,
        construct: G,
    ) -> Result<ATerm<'s>, SharcError>
    where
        F: Fn(&'s TermStore, &mut ArgStack<'_, 's, I, C>, I) -> Result<Yield<'s, C>, SharcError>,
        G: Fn(&'s TermStore, C, BuilderArgs<'_, 's>) -> Result<ATerm<'s>, SharcError>,
    {
        debug_trace!("Transforming {:?}", input);
        self.terms.clear();
        self.configs.clear();

        self.terms.push(None);
        self.configs.push(Config::Apply(input, 0));

        while let Some(config) = self.configs.pop() {
            match config {
                Config::Apply(input, result) => {
                    // Applies the given function to this input, and obtain a number of symbol and arguments.
                    let top_of_stack = self.configs.len();
                    let mut args = ArgStack::new(&mut self.terms, &mut self.configs);

                    match transformer(store, &mut args, input)? {
                        Yield::Construct(input) => {
                            // This occurs before the other constructs.
                            let arity = args.len();
                            self.configs.insert(top_of_stack, Config::Construct(input, arity, result));
                        }
                        Yield::Term(term) => {
                            self.terms[result] = Some(term);
                        }
                    }
                }
                Config::Construct(input, arity, result) => {
                    let arguments = self.terms[self.terms.len() - arity..].iter().flatten();

                    let term = construct(store, input, arguments)?;
                    self.terms[result] = Some(term);

                    // Remove elements from the stack.
                    self.terms.truncate(self.terms.len() - arity);
                }
            }

            debug_trace!("{:?}", self);
        }

        debug_assert!(self.terms.len() == 1, "Expect exactly one term on the result stack");

        self.terms
            .pop()
            .flatten()
            .ok_or_else(|| "The term builder did not produce a result".into())
    }
}

impl<'s, I: fmt::Debug, C: fmt::Debug> Default for TermBuilder<'s, I, C> {
    fn default() -> Self {
        Self::new()
    }
}

enum Config<I, C> {
    Apply(I, usize),
    Construct(C, usize, usize),
}

pub enum Yield<'s, C> {
    Term(ATerm<'s>), // Yield this term as is.
    Construct(C),    // Yield f(args) for every arg push to the argument stack, with the transformer applied to it.
}

/// This struct defines a local argument stack on the global stack.
pub struct ArgStack<'a, 's, I, C> {
    terms: &'a mut Vec<Option<ATerm<'s>>>,
    configs: &'a mut Vec<Config<I, C>>,
    top_of_stack: usize,
}

impl<'a, 's, I, C> ArgStack<'a, 's, I, C> {
    fn new(terms: &'a mut Vec<Option<ATerm<'s>>>, configs: &'a mut Vec<Config<I, C>>) -> ArgStack<'a, 's, I, C> {
        let top_of_stack = terms.len();
        ArgStack {
            terms,
            configs,
            top_of_stack,
        }
    }

    /// Returns the amount of arguments added.
    pub fn len(&self) -> usize {
        self.terms.len() - self.top_of_stack
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds the input to the argument stack, the transformer is applied to it later.
    pub fn push(&mut self, input: I) {
        self.configs.push(Config::Apply(input, self.terms.len()));
        self.terms.push(None);
    }
}

impl<I: fmt::Debug, C: fmt::Debug> fmt::Debug for TermBuilder<'_, I, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terms: [")?;
        for (i, term) in self.terms.iter().enumerate() {
            writeln!(f, "{i}\t{term:?}")?;
        }
        writeln!(f, "]")?;

        writeln!(f, "Configs: [")?;
        for config in &self.configs {
            writeln!(f, "\t{config:?}")?;
        }
        write!(f, "]")
    }
}

impl<I: fmt::Debug, C: fmt::Debug> fmt::Debug for Config<I, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Config::Apply(x, result) => write!(f, "Apply({x:?}, {result})"),
            Config::Construct(symbol, arity, result) => {
                write!(f, "Construct({symbol:?}, {arity}, {result})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Symb;
    use crate::Term;

    use super::*;

    /// Builds the term s(s(...s(0)...)) with the given depth, which would overflow the stack when built recursively.
    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_deep_term() {
        let store = TermStore::new();
        let successor = store.symbol("s", 1, false);

        let mut builder = TermBuilder::<usize, ()>::new();
        let term = builder
            .evaluate(
                &store,
                100_000usize,
                |store, args, depth| {
                    if depth == 0 {
                        Ok(Yield::Term(store.make_int(0)))
                    } else {
                        args.push(depth - 1);
                        Ok(Yield::Construct(()))
                    }
                },
                |store, _, args| Ok(store.make_application_iter(&successor, args)),
            )
            .unwrap();

        assert_eq!(term.iter().count(), 100_001);
        assert_eq!(term.get_head_symbol().index(), successor.index());
    }

    #[test]
    fn test_argument_order() {
        let store = TermStore::new();
        let f = store.symbol("f", 3, false);

        let mut builder = TermBuilder::<i64, ()>::new();
        let term = builder
            .evaluate(
                &store,
                -1,
                |store, args, value| {
                    if value < 0 {
                        args.push(1);
                        args.push(2);
                        args.push(3);
                        Ok(Yield::Construct(()))
                    } else {
                        Ok(Yield::Term(store.make_int(value)))
                    }
                },
                |store, _, args| Ok(store.make_application_iter(&f, args)),
            )
            .unwrap();

        assert_eq!(term.to_string(), "f(1,2,3)");
    }
}
