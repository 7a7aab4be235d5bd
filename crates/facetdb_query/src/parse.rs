//! Parsing of the bracketed find/where query surface.
//!
//! The grammar is the subset the binding layer speaks:
//!
//! ```text
//! [:find ?eid ?name
//!  :in ?uuid
//!  :where [?eid :todo/uuid ?uuid]
//!         [?eid :todo/name ?name]]
//! ```
//!
//! Find specs may also use the tuple shorthand `[:find [?a ?b] ...]`,
//! the collection shorthand `[:find [?x ...] ...]`, and the scalar
//! marker `[:find ?x . ...]`; all four parse to the same column list,
//! and the result shape is chosen by the execute method.
//! Find-spec ordering determines output column order.

use crate::error::{QueryError, QueryResult};
use facetdb_codec::{Keyword, TypedValue};

/// One position of a pattern clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A `?name` variable. Stored with its leading `?`.
    Variable(String),
    /// A constant value.
    Constant(TypedValue),
}

/// A `[entity attribute value]` pattern clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Entity position: variable or entid literal.
    pub entity: Element,
    /// Attribute position: always a namespaced keyword.
    pub attribute: Keyword,
    /// Value position: variable or constant.
    pub value: Element,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// Output variables, in find-spec order.
    pub find: Vec<String>,
    /// Bindable input variables from `:in`.
    pub inputs: Vec<String>,
    /// Pattern clauses, in source order.
    pub clauses: Vec<Pattern>,
}

/// Normalizes a variable name to its `?`-prefixed form.
pub(crate) fn normalize_var(name: &str) -> String {
    if name.starts_with('?') {
        name.to_string()
    } else {
        format!("?{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Atom(String),
    Str(String),
}

fn tokenize(text: &str) -> QueryResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut position = 0usize;

    while let Some(&c) = chars.peek() {
        match c {
            '[' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ']' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some(other) => {
                                s.push('\\');
                                s.push(other);
                            }
                            None => break,
                        },
                        other => s.push(other),
                    }
                }
                if !closed {
                    return Err(QueryError::parse("unterminated string literal", position));
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '[' || c == ']' || c == '"' || c == ',' {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
        position = tokens.len();
    }
    Ok(tokens)
}

/// Parses a query string.
///
/// # Errors
///
/// Returns [`QueryError::Parse`] with the offending token position on
/// any deviation from the grammar.
pub fn parse_query(text: &str) -> QueryResult<ParsedQuery> {
    let tokens = tokenize(text)?;
    Parser { tokens, pos: 0 }.query()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn query(mut self) -> QueryResult<ParsedQuery> {
        self.expect_open("query must start with '['")?;
        self.expect_atom(":find", "query must begin with :find")?;

        let find = self.find_spec()?;
        if find.is_empty() {
            return Err(self.error("find spec is empty"));
        }

        let mut inputs = Vec::new();
        if self.peek_atom(":in") {
            self.pos += 1;
            while let Some(Token::Atom(atom)) = self.peek() {
                if atom.starts_with(':') {
                    break;
                }
                if !atom.starts_with('?') {
                    return Err(self.error(format!("expected ?variable in :in, got {atom:?}")));
                }
                inputs.push(atom.clone());
                self.pos += 1;
            }
        }

        self.expect_atom(":where", "expected :where")?;
        let mut clauses = Vec::new();
        while !self.peek_close() {
            clauses.push(self.clause()?);
        }
        self.expect_close("query must end with ']'")?;
        if clauses.is_empty() {
            return Err(self.error("query has no :where clauses"));
        }
        if self.pos != self.tokens.len() {
            return Err(self.error("trailing tokens after query"));
        }

        Ok(ParsedQuery {
            find,
            inputs,
            clauses,
        })
    }

    fn find_spec(&mut self) -> QueryResult<Vec<String>> {
        let mut find = Vec::new();
        if matches!(self.peek(), Some(Token::Open)) {
            // Tuple `[?a ?b]` or collection `[?x ...]` shorthand.
            self.pos += 1;
            loop {
                match self.next_cloned() {
                    Some(Token::Close) => break,
                    Some(Token::Atom(atom)) if atom == "..." => {}
                    Some(Token::Atom(atom)) if atom.starts_with('?') => find.push(atom),
                    _ => return Err(self.error("expected ?variable in find spec")),
                }
            }
        } else {
            while let Some(Token::Atom(atom)) = self.peek() {
                if atom.starts_with(':') {
                    break;
                }
                // The scalar marker.
                if atom == "." {
                    self.pos += 1;
                    continue;
                }
                if !atom.starts_with('?') {
                    return Err(self.error(format!("expected ?variable in find spec, got {atom:?}")));
                }
                find.push(atom.clone());
                self.pos += 1;
            }
        }
        Ok(find)
    }

    fn clause(&mut self) -> QueryResult<Pattern> {
        self.expect_open("expected '[' to open a clause")?;
        let entity = match self.element()? {
            Element::Constant(TypedValue::Long(n)) => {
                Element::Constant(TypedValue::Ref(facetdb_codec::Entid::new(n)))
            }
            other => other,
        };
        let attribute = match self.element()? {
            Element::Constant(TypedValue::Keyword(k)) => k,
            _ => return Err(self.error("attribute position must be a namespaced keyword")),
        };
        let value = self.element()?;
        self.expect_close("expected ']' to close a clause")?;
        Ok(Pattern {
            entity,
            attribute,
            value,
        })
    }

    fn element(&mut self) -> QueryResult<Element> {
        match self.next_cloned() {
            Some(Token::Str(s)) => Ok(Element::Constant(TypedValue::Text(s))),
            Some(Token::Atom(atom)) => {
                if atom.starts_with('?') {
                    return Ok(Element::Variable(atom));
                }
                if atom.starts_with(':') {
                    let keyword = Keyword::parse(&atom)
                        .map_err(|e| self.error(format!("bad keyword: {e}")))?;
                    return Ok(Element::Constant(TypedValue::Keyword(keyword)));
                }
                if atom == "true" {
                    return Ok(Element::Constant(TypedValue::Boolean(true)));
                }
                if atom == "false" {
                    return Ok(Element::Constant(TypedValue::Boolean(false)));
                }
                if let Ok(n) = atom.parse::<i64>() {
                    return Ok(Element::Constant(TypedValue::Long(n)));
                }
                if let Ok(d) = atom.parse::<f64>() {
                    return Ok(Element::Constant(TypedValue::Double(d)));
                }
                Err(self.error(format!("unrecognized element {atom:?}")))
            }
            Some(token) => Err(self.error(format!("unexpected {token:?} in clause"))),
            None => Err(self.error("unexpected end of query")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next_cloned(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_atom(&self, expected: &str) -> bool {
        matches!(self.peek(), Some(Token::Atom(atom)) if atom == expected)
    }

    fn peek_close(&self) -> bool {
        matches!(self.peek(), Some(Token::Close))
    }

    fn expect_open(&mut self, message: &str) -> QueryResult<()> {
        match self.next_cloned() {
            Some(Token::Open) => Ok(()),
            _ => Err(self.error(message)),
        }
    }

    fn expect_close(&mut self, message: &str) -> QueryResult<()> {
        match self.next_cloned() {
            Some(Token::Close) => Ok(()),
            _ => Err(self.error(message)),
        }
    }

    fn expect_atom(&mut self, expected: &str, message: &str) -> QueryResult<()> {
        match self.next_cloned() {
            Some(Token::Atom(atom)) if atom == expected => Ok(()),
            _ => Err(self.error(message)),
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::parse(message, self.pos)
    }
}
