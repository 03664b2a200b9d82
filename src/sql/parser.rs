// SQL parser - converts tokens to AST

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use anyhow::{bail, Result};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(sql: String) -> Self {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize();
        Parser {
            tokens,
            position: 0,
        }
    }

    /// Parse a single SQL statement, with an optional trailing semicolon
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_token() {
            Token::Select => self.parse_select()?,
            Token::Insert => self.parse_insert()?,
            Token::Eof => bail!("Empty statement"),
            token => bail!("Expected INSERT or SELECT, found {:?}", token),
        };

        if self.match_token(&Token::Semicolon) {
            self.advance();
        }
        if !self.match_token(&Token::Eof) {
            bail!(
                "Unexpected {:?} after end of statement",
                self.current_token()
            );
        }

        Ok(statement)
    }

    /// Parse a SELECT statement
    fn parse_select(&mut self) -> Result<Statement> {
        self.expect_token(Token::Select)?;

        let fields = self.parse_select_fields()?;

        self.expect_token(Token::From)?;
        let table_name = self.expect_identifier()?;

        let where_clause = if self.match_token(&Token::Where) {
            self.advance();
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        Ok(Statement::Select(SelectStatement {
            fields,
            table_name,
            where_clause,
        }))
    }

    fn parse_select_fields(&mut self) -> Result<Vec<String>> {
        if self.match_token(&Token::Star) {
            self.advance();
            return Ok(vec!["*".to_string()]);
        }
        self.parse_identifier_list()
    }

    fn parse_where_clause(&mut self) -> Result<WhereClause> {
        let column = self.expect_identifier()?;
        self.expect_token(Token::Equal)?;
        let value = self.parse_literal()?;

        Ok(WhereClause {
            column,
            operator: ComparisonOperator::Equal,
            value,
        })
    }

    /// Parse INSERT statement
    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_token(Token::Insert)?;
        self.expect_token(Token::Into)?;

        let table_name = self.expect_identifier()?;

        let columns = if self.match_token(&Token::LeftParen) {
            self.advance();
            let cols = self.parse_identifier_list()?;
            self.expect_token(Token::RightParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect_token(Token::Values)?;
        self.expect_token(Token::LeftParen)?;
        let values = self.parse_literal_list()?;
        self.expect_token(Token::RightParen)?;

        if let Some(columns) = &columns {
            if columns.len() != values.len() {
                bail!(
                    "INSERT has {} columns but {} values",
                    columns.len(),
                    values.len()
                );
            }
        }

        Ok(Statement::Insert(InsertStatement {
            table_name,
            columns,
            values,
        }))
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.current_token() {
            Token::String(s) => {
                self.advance();
                Ok(Literal::String(s))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Literal::Number(n))
            }
            Token::Illegal(c) => bail!("Illegal character {:?}", c),
            token => bail!("Expected literal, found {:?}", token),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<Literal>> {
        let mut literals = vec![];

        loop {
            literals.push(self.parse_literal()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(literals)
    }

    /// Parse list of identifiers
    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![];

        loop {
            identifiers.push(self.expect_identifier()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    // Helper methods

    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .cloned()
            .unwrap_or(Token::Eof)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    fn expect_token(&mut self, token: Token) -> Result<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            bail!("Expected {:?}, found {:?}", token, self.current_token())
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            token => bail!("Expected identifier, found {:?}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Result<Statement> {
        Parser::new(sql.to_string()).parse()
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse("INSERT INTO users (name, email) VALUES ('alice', 'a@x.io');").unwrap();

        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.table_name, "users");
                assert_eq!(
                    insert.columns,
                    Some(vec!["name".to_string(), "email".to_string()])
                );
                assert_eq!(
                    insert.values,
                    vec![
                        Literal::String("alice".to_string()),
                        Literal::String("a@x.io".to_string())
                    ]
                );
            }
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_insert_without_columns() {
        let stmt = parse("insert into t values (1, 'two', 3.5)").unwrap();

        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.columns, None);
                assert_eq!(insert.values.len(), 3);
                assert_eq!(insert.values[0], Literal::Number("1".to_string()));
                assert_eq!(insert.values[2].text(), "3.5");
            }
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_insert_count_mismatch() {
        let err = parse("INSERT INTO t (a, b) VALUES ('x')").unwrap_err();
        assert!(err.to_string().contains("2 columns but 1 values"));
    }

    #[test]
    fn test_parse_select_star() {
        let stmt = parse("SELECT * FROM users").unwrap();

        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.fields, vec!["*".to_string()]);
                assert_eq!(select.table_name, "users");
                assert!(select.where_clause.is_none());
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_select_with_where() {
        let stmt = parse("SELECT id, name FROM users WHERE name = 'bob';").unwrap();

        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.fields, vec!["id".to_string(), "name".to_string()]);
                assert_eq!(
                    select.where_clause,
                    Some(WhereClause {
                        column: "name".to_string(),
                        operator: ComparisonOperator::Equal,
                        value: Literal::String("bob".to_string()),
                    })
                );
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("UPDATE users").is_err());
        assert!(parse("SELECT FROM users").is_err());
        assert!(parse("SELECT * users").is_err());
        assert!(parse("INSERT users VALUES ('a')").is_err());
        assert!(parse("INSERT INTO users VALUES ()").is_err());
        assert!(parse("INSERT INTO users VALUES ('a'").is_err());
        assert!(parse("SELECT * FROM t WHERE a").is_err());
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse("SELECT * FROM t; SELECT * FROM u").unwrap_err();
        assert!(err.to_string().contains("after end of statement"));
    }

    #[test]
    fn test_illegal_literal() {
        let err = parse("INSERT INTO t VALUES ('unterminated)").unwrap_err();
        assert!(err.to_string().contains("Illegal"));
    }
}
