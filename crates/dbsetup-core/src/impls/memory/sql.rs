//! Tokenizer and cursor for the small DDL subset the memory server understands.

use crate::domain::ConnectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    Word(String),
    /// `"ident"`, `` `ident` `` or `[ident]`
    Quoted(String),
    /// `'literal'`
    Str(String),
    Num(String),
    Sym(char),
}

pub(super) fn syntax(msg: impl Into<String>) -> ConnectionError {
    ConnectionError::Query(format!("syntax error: {}", msg.into()))
}

pub(super) fn tokenize(sql: &str) -> Result<Vec<Token>, ConnectionError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '\'' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(syntax("unterminated string literal")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        s.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(*ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
        } else if c == '"' || c == '`' || c == '[' {
            let close = if c == '[' { ']' } else { c };
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|ch| *ch == close)
                .map(|p| start + p)
                .ok_or_else(|| syntax("unterminated quoted identifier"))?;
            tokens.push(Token::Quoted(chars[start..end].iter().collect()));
            i = end + 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Num(chars[start..i].iter().collect()));
        } else if c.is_alphanumeric() || c == '_' || c == '@' || c == '$' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '@' | '$'))
            {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Sym(c));
            i += 1;
        }
    }
    Ok(tokens)
}

/// Split a token stream at depth-0 occurrences of `sep`.
pub(super) fn split_top_level(tokens: &[Token], sep: char) -> Vec<Vec<Token>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::Sym('(') => depth += 1,
            Token::Sym(')') => depth = depth.saturating_sub(1),
            Token::Sym(c) if *c == sep && depth == 0 => {
                parts.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = parts.last_mut() {
            last.push(token.clone());
        }
    }
    parts.retain(|p| !p.is_empty());
    parts
}

pub(super) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(super) fn peek(&self) -> Option<&'a Token> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    pub(super) fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn next(&mut self) -> Option<&'a Token> {
        let tokens = self.tokens;
        let token = tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(super) fn peek_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(kw))
    }

    pub(super) fn eat_kw(&mut self, kw: &str) -> bool {
        if self.peek_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn expect_kw(&mut self, kw: &str) -> Result<(), ConnectionError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(syntax(format!("expected {kw}")))
        }
    }

    pub(super) fn eat_sym(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Token::Sym(sym)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Identifier, possibly schema-qualified; the last segment is returned.
    pub(super) fn ident(&mut self) -> Result<String, ConnectionError> {
        let mut name = self.ident_part()?;
        while self.peek() == Some(&Token::Sym('.')) {
            self.pos += 1;
            name = self.ident_part()?;
        }
        Ok(name)
    }

    fn ident_part(&mut self) -> Result<String, ConnectionError> {
        match self.next() {
            Some(Token::Word(w)) | Some(Token::Quoted(w)) => Ok(w.clone()),
            other => Err(syntax(format!("expected identifier, got {other:?}"))),
        }
    }

    /// Consume a parenthesized group and return the tokens inside it.
    pub(super) fn group(&mut self) -> Result<&'a [Token], ConnectionError> {
        if !self.eat_sym('(') {
            return Err(syntax("expected ("));
        }
        let tokens = self.tokens;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(token) = self.next() {
            match token {
                Token::Sym('(') => depth += 1,
                Token::Sym(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&tokens[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
        }
        Err(syntax("unbalanced parentheses"))
    }

    /// `(a, b, c)` as identifiers.
    pub(super) fn ident_list(&mut self) -> Result<Vec<String>, ConnectionError> {
        let inner = self.group()?;
        split_top_level(inner, ',')
            .iter()
            .map(|part| Cursor::new(part).ident())
            .collect()
    }
}

/// Identifiers referenced inside an index expression, skipping function names.
pub(super) fn referenced_columns(tokens: &[Token]) -> Vec<String> {
    let mut columns = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let is_call = tokens.get(i + 1) == Some(&Token::Sym('('));
        match token {
            Token::Word(w) | Token::Quoted(w) if !is_call => columns.push(w.clone()),
            _ => {}
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_quotes_and_symbols() {
        let tokens = tokenize(r#"CREATE TABLE "t" (`a` INT, [b] VARCHAR(32) DEFAULT 'x''y')"#).unwrap();
        assert_eq!(tokens[2], Token::Quoted("t".into()));
        assert!(tokens.contains(&Token::Quoted("a".into())));
        assert!(tokens.contains(&Token::Quoted("b".into())));
        assert!(tokens.contains(&Token::Str("x'y".into())));
        assert!(tokens.contains(&Token::Num("32".into())));
    }

    #[test]
    fn qualified_identifier_keeps_last_segment() {
        let tokens = tokenize(r#"dbo."mshop_index_text""#).unwrap();
        let mut cursor = Cursor::new(&tokens);
        assert_eq!(cursor.ident().unwrap(), "mshop_index_text");
        assert!(cursor.is_done());
    }

    #[test]
    fn split_respects_parentheses() {
        let tokens = tokenize("a DECIMAL(12,2), b INT").unwrap();
        assert_eq!(split_top_level(&tokens, ',').len(), 2);
    }

    #[test]
    fn referenced_columns_skip_functions() {
        let tokens = tokenize(r#"to_tsvector('english', "content")"#).unwrap();
        assert_eq!(referenced_columns(&tokens), vec!["content".to_string()]);
    }
}
