use crate::error::{ExtractError, Result};
use crate::grammar::Grammar;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tree_sitter::Parser;

pub const DEFAULT_MAX_PARSERS: usize = 8;

#[derive(Default)]
struct Slot {
    idle: Vec<Parser>,
    created: usize,
}

/// Per-grammar snapshot of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub grammar: Grammar,
    pub created: usize,
    pub idle: usize,
    pub in_use: usize,
}

/// Bounded set of reusable parsers, grown lazily per grammar.
///
/// Acquiring never blocks: once `max_per_grammar` parsers of a grammar are
/// checked out, [`ParserPool::acquire`] fails until one is dropped.
pub struct ParserPool {
    max_per_grammar: usize,
    slots: Mutex<HashMap<Grammar, Slot>>,
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPool")
            .field("max_per_grammar", &self.max_per_grammar)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ParserPool {
    pub fn new(max_per_grammar: usize) -> Result<Self> {
        if max_per_grammar == 0 {
            return Err(ExtractError::invalid_config(
                "parser pool needs room for at least one parser",
            ));
        }
        Ok(Self {
            max_per_grammar,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn max_per_grammar(&self) -> usize {
        self.max_per_grammar
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Grammar, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out a parser configured for `grammar`
    pub fn acquire(&self, grammar: Grammar) -> Result<PooledParser<'_>> {
        let mut slots = self.lock();
        let slot = slots.entry(grammar).or_default();

        if let Some(parser) = slot.idle.pop() {
            return Ok(PooledParser::new(self, grammar, parser));
        }
        if slot.created >= self.max_per_grammar {
            log::warn!(
                "Parser pool exhausted for {} ({} in use)",
                grammar,
                slot.created
            );
            return Err(ExtractError::PoolExhausted {
                grammar: grammar.as_str(),
                limit: self.max_per_grammar,
            });
        }

        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|e| ExtractError::Language(format!("{grammar}: {e}")))?;
        slot.created += 1;
        log::debug!("Created {} parser #{}", grammar, slot.created);
        Ok(PooledParser::new(self, grammar, parser))
    }

    fn release(&self, grammar: Grammar, mut parser: Parser) {
        parser.reset();
        self.lock().entry(grammar).or_default().idle.push(parser);
    }

    pub fn stats(&self) -> Vec<PoolStats> {
        let slots = self.lock();
        let mut stats: Vec<PoolStats> = slots
            .iter()
            .map(|(grammar, slot)| PoolStats {
                grammar: *grammar,
                created: slot.created,
                idle: slot.idle.len(),
                in_use: slot.created - slot.idle.len(),
            })
            .collect();
        stats.sort_by_key(|s| s.grammar.as_str());
        stats
    }
}

/// A checked-out parser, returned to its pool on drop
pub struct PooledParser<'a> {
    pool: &'a ParserPool,
    grammar: Grammar,
    parser: Option<Parser>,
}

impl<'a> PooledParser<'a> {
    fn new(pool: &'a ParserPool, grammar: Grammar, parser: Parser) -> Self {
        Self {
            pool,
            grammar,
            parser: Some(parser),
        }
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }
}

impl Deref for PooledParser<'_> {
    type Target = Parser;

    fn deref(&self) -> &Parser {
        // only taken in drop
        self.parser.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledParser<'_> {
    fn deref_mut(&mut self) -> &mut Parser {
        self.parser.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledParser<'_> {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            self.pool.release(self.grammar, parser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(ParserPool::new(0).is_err());
    }

    #[test]
    fn pool_grows_to_cap_then_fails() {
        let pool = ParserPool::new(2).unwrap();
        let first = pool.acquire(Grammar::Python).unwrap();
        let second = pool.acquire(Grammar::Python).unwrap();
        assert!(matches!(
            pool.acquire(Grammar::Python),
            Err(ExtractError::PoolExhausted { limit: 2, .. })
        ));

        // caps are per grammar
        let js = pool.acquire(Grammar::JavaScript).unwrap();
        drop((first, second, js));
    }

    #[test]
    fn dropped_parsers_are_reused() {
        let pool = ParserPool::new(1).unwrap();
        {
            let mut parser = pool.acquire(Grammar::Python).unwrap();
            assert!(parser.parse("x = 1\n", None).is_some());
        }
        let parser = pool.acquire(Grammar::Python).unwrap();
        assert_eq!(parser.grammar(), Grammar::Python);
        assert_eq!(
            pool.stats(),
            vec![PoolStats {
                grammar: Grammar::Python,
                created: 1,
                idle: 0,
                in_use: 1,
            }]
        );
        drop(parser);
        assert_eq!(pool.stats()[0].idle, 1);
    }

    #[test]
    fn pool_is_shareable_across_threads() {
        let pool = std::sync::Arc::new(ParserPool::new(4).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    let mut parser = pool.acquire(Grammar::Python).unwrap();
                    parser.parse("def f():\n    pass\n", None).is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(pool.stats()[0].created <= 4);
    }
}
