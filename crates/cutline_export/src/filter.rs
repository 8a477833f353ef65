// SPDX-License-Identifier: MIT OR Apache-2.0
//! Filter graph data structure rendered into `-filter_complex` syntax.
//!
//! A graph is an ordered list of chains. Each chain reads labeled pads,
//! runs its filters in sequence and writes labeled pads. Stream pads such as
//! `0:v` come from inputs; every other pad must be written by an earlier
//! chain and read exactly once.

use std::collections::HashSet;
use std::fmt;

/// A labeled pad between chains
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pad(String);

impl Pad {
    /// Create a pad with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Pad for stream `kind` (`v` or `a`) of input `index`
    pub fn input(index: usize, kind: &str) -> Self {
        Self(format!("{index}:{kind}"))
    }

    /// Label without brackets
    pub fn label(&self) -> &str {
        &self.0
    }

    /// Whether this pad names an input stream rather than a chain output
    pub fn is_input_stream(&self) -> bool {
        self.0
            .split_once(':')
            .is_some_and(|(index, _)| {
                !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
            })
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// A single filter with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Filter name
    pub name: String,
    args: Vec<(Option<String>, String)>,
}

impl Filter {
    /// Create a filter with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Add a `key=value` argument
    pub fn arg(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push((Some(key.into()), value.to_string()));
        self
    }

    /// Add a positional argument
    pub fn value(mut self, value: impl fmt::Display) -> Self {
        self.args.push((None, value.to_string()));
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            if let Some(key) = key {
                write!(f, "{key}=")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}

/// Filters applied in sequence between labeled pads
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    /// Pads read by the first filter
    pub inputs: Vec<Pad>,
    /// Filters in order
    pub filters: Vec<Filter>,
    /// Pads written by the last filter
    pub outputs: Vec<Pad>,
}

impl FilterChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            filters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input pad
    pub fn input(mut self, pad: Pad) -> Self {
        self.inputs.push(pad);
        self
    }

    /// Append a filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append several filters
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Add an output pad
    pub fn output(mut self, pad: Pad) -> Self {
        self.outputs.push(pad);
        self
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{pad}")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for pad in &self.outputs {
            write!(f, "{pad}")?;
        }
        Ok(())
    }
}

/// Errors found while validating a graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A chain has no filters
    #[error("Chain {0} has no filters")]
    EmptyChain(usize),
    /// A pad is read before any chain writes it
    #[error("Pad [{0}] is read before it is written")]
    UnknownPad(String),
    /// A pad is written twice
    #[error("Pad [{0}] is written more than once")]
    DuplicatePad(String),
    /// A pad is read twice
    #[error("Pad [{0}] is read more than once")]
    PadAlreadyConsumed(String),
}

/// An ordered filter graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain
    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    /// Chains in order
    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    /// Whether the graph has no chains
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Check pad wiring: every chain pad is written once before it is read once
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut written = HashSet::new();
        let mut consumed = HashSet::new();

        for (index, chain) in self.chains.iter().enumerate() {
            if chain.filters.is_empty() {
                return Err(GraphError::EmptyChain(index));
            }
            for pad in &chain.inputs {
                if pad.is_input_stream() {
                    continue;
                }
                if !written.contains(pad.label()) {
                    return Err(GraphError::UnknownPad(pad.label().to_string()));
                }
                if !consumed.insert(pad.label().to_string()) {
                    return Err(GraphError::PadAlreadyConsumed(pad.label().to_string()));
                }
            }
            for pad in &chain.outputs {
                if !written.insert(pad.label().to_string()) {
                    return Err(GraphError::DuplicatePad(pad.label().to_string()));
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

/// Format a number without trailing zeros (at most six decimals)
pub fn fmt_number(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Format seconds with millisecond precision
pub fn fmt_seconds(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}
