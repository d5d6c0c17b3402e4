/// Represents the smallest meaningful units (atoms) of the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- SQL Keywords ---
    Select,
    Distinct,
    From,
    Join,
    Inner,
    Cross,
    On,
    As,
    Where,
    And,
    Or,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Null,

    // --- Identifiers & Literals ---
    /// A name representing a table, an alias or a column (e.g., `users`, `id`).
    Ident(String),
    /// A 64-bit integer literal (e.g., `42`, `-7`).
    Number(i64),
    /// A string literal, defined between single quotes (e.g., `'Alice'`).
    String(String),
    /// A 64-bit floating-point literal (e.g., `3.14`).
    FloatNumber(f64),
    /// The boolean literal `TRUE`.
    True,
    /// The boolean literal `FALSE`.
    False,

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Wildcard symbol `*`
    Star,
    /// Qualifier separator `.`
    Dot,
    /// `=`
    Equal,
    /// `<>` or `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

/// A lexical scanner (lexer) that converts a raw query string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens, ending with [Token::Eof].
    ///
    /// # Errors
    /// Returns an error if an invalid character is encountered or if a literal
    /// (like a string) is malformed.
    ///
    /// # Example
    /// ```
    /// # use reldb::sql::tokenizer::{Tokenizer, Token};
    /// let mut t = Tokenizer::new("SELECT * FROM a");
    /// let tokens = t.tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Select);
    /// assert_eq!(tokens[3], Token::Ident("a".into()));
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token, String> {
        let ch = self.current_char();

        let single = match ch {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '*' => Some(Token::Star),
            '.' => Some(Token::Dot),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.advance();
                Ok(match self.peek() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::Less,
                })
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    return Ok(Token::GreaterEqual);
                }
                Ok(Token::Greater)
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    return Ok(Token::NotEqual);
                }
                Err("expected '=' after '!'".into())
            }
            '-' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                self.read_number(true)
            }
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(false),
            '\'' => self.read_string(),
            _ => Err(format!("character: {:?} is not supported", ch)),
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// The character at the current position, if any.
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// The character after the current one, if any.
    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Moves the cursor forward by one character.
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes any whitespace characters (spaces, tabs, newlines).
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    // --- Extraction Logic ---

    /// Reads a sequence of alphanumeric characters and determines if it's
    /// a reserved keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively.
    fn read_identifier(&mut self) -> Result<Token, String> {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        let token = match ident.to_uppercase().as_str() {
            "SELECT" => Token::Select,
            "DISTINCT" => Token::Distinct,
            "FROM" => Token::From,
            "JOIN" => Token::Join,
            "INNER" => Token::Inner,
            "CROSS" => Token::Cross,
            "ON" => Token::On,
            "AS" => Token::As,
            "WHERE" => Token::Where,
            "AND" => Token::And,
            "OR" => Token::Or,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "LIMIT" => Token::Limit,
            "NULL" => Token::Null,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            _ => Token::Ident(ident),
        };
        Ok(token)
    }

    /// Reads a numeric literal. If a dot `.` is encountered, it returns a
    /// [Token::FloatNumber], otherwise a [Token::Number].
    fn read_number(&mut self, negative: bool) -> Result<Token, String> {
        let mut number = String::new();
        if negative {
            number.push('-');
        }
        let mut has_dot = false;

        while !self.is_at_end()
            && (self.current_char().is_ascii_digit() || (self.current_char() == '.' && !has_dot))
        {
            if self.current_char() == '.' {
                has_dot = true;
            }
            number.push(self.current_char());
            self.advance();
        }

        if !self.is_at_end() && self.current_char() == '.' {
            return Err("multiple dots are not allowed for a float".into());
        }

        if has_dot {
            return number
                .parse::<f64>()
                .map(Token::FloatNumber)
                .map_err(|e| e.to_string());
        }

        number
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|e| format!("invalid integer {number}: {e}"))
    }

    /// Reads a string literal enclosed in single quotes. A doubled quote
    /// (`''`) inside the literal stands for one quote.
    fn read_string(&mut self) -> Result<Token, String> {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            match self.peek() {
                None => return Err("Unterminated string".into()),
                Some('\'') if self.peek_next() == Some('\'') => {
                    string.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some(c) => {
                    string.push(c);
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        let mut tokenizer = Tokenizer::new("SELECT DISTINCT users.id FROM users");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Distinct,
                Token::Ident("users".into()),
                Token::Dot,
                Token::Ident("id".into()),
                Token::From,
                Token::Ident("users".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_with_parens() {
        let mut tokenizer = Tokenizer::new("(id, name)");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::LeftParen,
                Token::Ident("id".into()),
                Token::Comma,
                Token::Ident("name".into()),
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        let mut tokenizer = Tokenizer::new("= <> != < <= > >=");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::NotEqual,
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        let mut tokenizer = Tokenizer::new("42, -123, 0");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Number(42),
                Token::Comma,
                Token::Number(-123),
                Token::Comma,
                Token::Number(0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_floats() {
        let mut tokenizer = Tokenizer::new("1.14, -45.0");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::FloatNumber(1.14),
                Token::Comma,
                Token::FloatNumber(-45.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings() {
        let mut tokenizer = Tokenizer::new("'Alice', 'O''Brien', ''");
        let tokens = tokenizer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::String("Alice".into()),
                Token::Comma,
                Token::String("O'Brien".into()),
                Token::Comma,
                Token::String(String::new()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut tokenizer = Tokenizer::new("'hello");
        let result = tokenizer.tokenize();

        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_character() {
        assert!(Tokenizer::new("a # b").tokenize().is_err());
        assert!(Tokenizer::new("a ! b").tokenize().is_err());
    }
}
