//! Recursive-descent parser for the filter mini-language
//!
//! Operates directly on the raw bytes of the query-string value. Tokens are
//! delimited by `,`, `(` and `)`; percent-decoding is applied per token, so
//! reserved characters inside string operands stay escaped until after the
//! structure is known.

use percent_encoding::percent_decode;

use crate::ast::{Predicate, SortOrder, Value};
use crate::error::{FilterError, Result};

/// Parse a predicate from the raw (percent-encoded) parameter value
pub fn parse_predicate(raw: &str) -> Result<Predicate> {
    let mut parser = Parser::new(raw);
    let predicate = parser.predicate()?;
    parser.expect_end()?;
    Ok(predicate)
}

/// Parse a sort specification: comma-separated fields, `!` for descending
pub fn parse_sort_orders(raw: &str) -> Result<Vec<SortOrder>> {
    let mut orders = Vec::new();

    for token in raw.split(',') {
        let (token, ascending) = match token.strip_prefix('!') {
            Some(rest) => (rest, false),
            None => (token, true),
        };
        let field = decode_token(token)?;
        if field.is_empty() {
            return Err(FilterError::EmptyField);
        }
        orders.push(SortOrder { field, ascending });
    }

    Ok(orders)
}

/// Percent-decode one token, treating `+` as space
fn decode_token(token: &str) -> Result<String> {
    let bytes: Vec<u8> = token
        .bytes()
        .map(|b| if b == b'+' { b' ' } else { b })
        .collect();
    let decoded = percent_decode(&bytes)
        .decode_utf8()
        .map_err(|_| FilterError::BadEncoding(token.to_string()))?;
    Ok(decoded.into_owned())
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            input: raw.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FilterError::Syntax {
                position: self.pos,
                expected,
            })
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(FilterError::Syntax {
                position: self.pos,
                expected: "end of input",
            })
        }
    }

    /// Raw token up to the next `,`, `(` or `)`
    fn token(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' || b == b'(' || b == b')' {
                break;
            }
            self.pos += 1;
        }
        // the input started as &str and delimiters are ASCII, so the
        // slice stays valid UTF-8
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("")
    }

    fn predicate(&mut self) -> Result<Predicate> {
        let name = self.token();
        self.expect(b'(', "'('")?;

        let predicate = match name {
            "not" => {
                let inner = self.predicate()?;
                Predicate::Not(Box::new(inner))
            }
            "and" | "or" => {
                let operands = self.predicate_list()?;
                if name == "and" {
                    Predicate::And(operands)
                } else {
                    Predicate::Or(operands)
                }
            }
            "eq" => {
                let field = self.field()?;
                let mut values = Vec::new();
                while self.peek() == Some(b',') {
                    self.pos += 1;
                    values.push(self.value()?);
                }
                Predicate::Eq { field, values }
            }
            "lt" | "le" | "gt" | "ge" => {
                let field = self.field()?;
                self.expect(b',', "','")?;
                let value = self.value()?;
                match name {
                    "lt" => Predicate::Lt { field, value },
                    "le" => Predicate::Le { field, value },
                    "gt" => Predicate::Gt { field, value },
                    _ => Predicate::Ge { field, value },
                }
            }
            "fts" => {
                let field = self.field()?;
                self.expect(b',', "','")?;
                match self.value()? {
                    Value::String(query) => Predicate::Fts { field, query },
                    _ => {
                        return Err(FilterError::Syntax {
                            position: self.pos,
                            expected: "string query",
                        })
                    }
                }
            }
            other => return Err(FilterError::UnknownOperator(other.to_string())),
        };

        self.expect(b')', "')'")?;
        Ok(predicate)
    }

    fn predicate_list(&mut self) -> Result<Vec<Predicate>> {
        let mut operands = Vec::new();

        if self.peek() == Some(b')') {
            return Ok(operands);
        }

        operands.push(self.predicate()?);
        while self.peek() == Some(b',') {
            self.pos += 1;
            operands.push(self.predicate()?);
        }

        Ok(operands)
    }

    fn field(&mut self) -> Result<String> {
        let field = decode_token(self.token())?;
        if field.is_empty() {
            return Err(FilterError::EmptyField);
        }
        Ok(field)
    }

    fn value(&mut self) -> Result<Value> {
        let token = self.token();

        if let Some(rest) = token.strip_prefix('$') {
            return Ok(Value::String(decode_token(rest)?));
        }

        match token {
            "null" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => token
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| FilterError::InvalidValue(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison() {
        let p = parse_predicate("ge(id,10)").unwrap();
        assert_eq!(
            p,
            Predicate::Ge {
                field: "id".to_string(),
                value: Value::Number(10.0),
            }
        );
    }

    #[test]
    fn eq_with_string_and_null() {
        let p = parse_predicate("eq(status,$active,null)").unwrap();
        assert_eq!(
            p,
            Predicate::Eq {
                field: "status".to_string(),
                values: vec![Value::String("active".to_string()), Value::Null],
            }
        );
    }

    #[test]
    fn eq_without_operands() {
        let p = parse_predicate("eq(status)").unwrap();
        assert_eq!(
            p,
            Predicate::Eq {
                field: "status".to_string(),
                values: vec![],
            }
        );
    }

    #[test]
    fn nested_boolean_operators() {
        let p = parse_predicate("and(not(eq(a,true)),or(lt(b,1),gt(b,5)))").unwrap();
        match p {
            Predicate::And(operands) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[0], Predicate::Not(_)));
                assert!(matches!(&operands[1], Predicate::Or(o) if o.len() == 2));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn empty_conjunction_and_disjunction() {
        assert_eq!(parse_predicate("and()").unwrap(), Predicate::And(vec![]));
        assert_eq!(parse_predicate("or()").unwrap(), Predicate::Or(vec![]));
    }

    #[test]
    fn string_escapes_reserved_characters() {
        let p = parse_predicate("eq(name,$a%2Cb%29c)").unwrap();
        assert_eq!(
            p,
            Predicate::Eq {
                field: "name".to_string(),
                values: vec![Value::String("a,b)c".to_string())],
            }
        );
    }

    #[test]
    fn plus_decodes_to_space() {
        let p = parse_predicate("fts(body,$hello+world)").unwrap();
        assert_eq!(
            p,
            Predicate::Fts {
                field: "body".to_string(),
                query: "hello world".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unknown_operator() {
        assert_eq!(
            parse_predicate("like(name,$x)").unwrap_err(),
            FilterError::UnknownOperator("like".to_string())
        );
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(matches!(
            parse_predicate("eq(a,1))").unwrap_err(),
            FilterError::Syntax { .. }
        ));
    }

    #[test]
    fn rejects_bare_word_value() {
        assert_eq!(
            parse_predicate("eq(a,active)").unwrap_err(),
            FilterError::InvalidValue("active".to_string())
        );
    }

    #[test]
    fn sort_orders() {
        let orders = parse_sort_orders("!name,age").unwrap();
        assert_eq!(
            orders,
            vec![
                SortOrder {
                    field: "name".to_string(),
                    ascending: false,
                },
                SortOrder {
                    field: "age".to_string(),
                    ascending: true,
                },
            ]
        );
    }

    #[test]
    fn sort_rejects_empty_field() {
        assert_eq!(parse_sort_orders("a,,b").unwrap_err(), FilterError::EmptyField);
    }
}
