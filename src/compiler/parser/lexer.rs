use crate::compiler::parser::{
    error::LuaParseError, lexer_config::LexerConfig, lua_token_data::LuaTokenData,
    lua_token_kind::LuaTokenKind, reader::Reader,
};

/// Hand-rolled single-pass tokenizer, consumed token-by-token by the
/// recursive-descent parser (no intermediate syntax tree is ever built).
pub struct LuaLexer<'a, 'e> {
    reader: Reader<'a>,
    lexer_config: LexerConfig,
    errors: Option<&'e mut Vec<LuaParseError>>,
    line: usize,
}

impl<'a, 'e> LuaLexer<'a, 'e> {
    pub fn new(
        reader: Reader<'a>,
        lexer_config: LexerConfig,
        errors: Option<&'e mut Vec<LuaParseError>>,
    ) -> Self {
        LuaLexer {
            reader,
            lexer_config,
            errors,
            line: 1,
        }
    }

    pub fn tokenize(&mut self) -> Vec<LuaTokenData> {
        let mut tokens = vec![];

        loop {
            if self.reader.is_eof() {
                break;
            }
            let kind = self.lex();
            if kind == LuaTokenKind::TkEof {
                break;
            }

            tokens.push(LuaTokenData::with_line(
                kind,
                self.reader.current_range(),
                self.line,
            ));
        }

        tokens
    }

    fn name_to_kind(&self, name: &str) -> LuaTokenKind {
        match name {
            "and" => LuaTokenKind::TkAnd,
            "break" => LuaTokenKind::TkBreak,
            "do" => LuaTokenKind::TkDo,
            "else" => LuaTokenKind::TkElse,
            "elseif" => LuaTokenKind::TkElseIf,
            "end" => LuaTokenKind::TkEnd,
            "false" => LuaTokenKind::TkFalse,
            "for" => LuaTokenKind::TkFor,
            "function" => LuaTokenKind::TkFunction,
            "goto" => LuaTokenKind::TkGoto,
            "if" => LuaTokenKind::TkIf,
            "in" => LuaTokenKind::TkIn,
            "local" => LuaTokenKind::TkLocal,
            "nil" => LuaTokenKind::TkNil,
            "not" => LuaTokenKind::TkNot,
            "or" => LuaTokenKind::TkOr,
            "repeat" => LuaTokenKind::TkRepeat,
            "return" => LuaTokenKind::TkReturn,
            "then" => LuaTokenKind::TkThen,
            "true" => LuaTokenKind::TkTrue,
            "until" => LuaTokenKind::TkUntil,
            "while" => LuaTokenKind::TkWhile,
            _ => LuaTokenKind::TkName,
        }
    }

    fn lex(&mut self) -> LuaTokenKind {
        self.reader.reset_buff();

        match self.reader.current_char() {
            '\n' | '\r' => self.lex_new_line(),
            ' ' | '\t' | '\x0B' | '\x0C' => self.lex_white_space(),
            '-' => {
                self.reader.bump();

                if self.reader.current_char() != '-' {
                    return LuaTokenKind::TkMinus;
                }

                self.reader.bump();
                if self.reader.current_char() == '[' {
                    self.reader.bump();
                    let sep = self.skip_sep();
                    if self.reader.current_char() == '[' {
                        self.reader.bump();
                        self.lex_long_string(sep);
                        return LuaTokenKind::TkLongComment;
                    }
                }

                self.reader.eat_while(|ch| ch != '\n' && ch != '\r');
                LuaTokenKind::TkShortComment
            }
            '[' => {
                self.reader.bump();
                let sep = self.skip_sep();
                if sep == 0 && self.reader.current_char() != '[' {
                    return LuaTokenKind::TkLeftBracket;
                }
                if self.reader.current_char() != '[' {
                    self.error(|| "invalid long string delimiter".to_string());
                    return LuaTokenKind::TkLongString;
                }

                self.reader.bump();
                self.lex_long_string(sep)
            }
            '=' => {
                self.reader.bump();
                if self.reader.current_char() != '=' {
                    return LuaTokenKind::TkAssign;
                }
                self.reader.bump();
                LuaTokenKind::TkEq
            }
            '<' => {
                self.reader.bump();
                match self.reader.current_char() {
                    '=' => {
                        self.reader.bump();
                        LuaTokenKind::TkLe
                    }
                    '<' => {
                        self.reader.bump();
                        LuaTokenKind::TkShl
                    }
                    _ => LuaTokenKind::TkLt,
                }
            }
            '>' => {
                self.reader.bump();
                match self.reader.current_char() {
                    '=' => {
                        self.reader.bump();
                        LuaTokenKind::TkGe
                    }
                    '>' => {
                        self.reader.bump();
                        LuaTokenKind::TkShr
                    }
                    _ => LuaTokenKind::TkGt,
                }
            }
            '~' => {
                self.reader.bump();
                if self.reader.current_char() != '=' {
                    return LuaTokenKind::TkBitXor;
                }
                self.reader.bump();
                LuaTokenKind::TkNe
            }
            ':' => {
                self.reader.bump();
                if self.reader.current_char() != ':' {
                    return LuaTokenKind::TkColon;
                }
                self.reader.bump();
                LuaTokenKind::TkDbColon
            }
            '"' | '\'' => {
                let quote = self.reader.current_char();
                self.reader.bump();
                self.lex_string(quote)
            }
            '.' => {
                if self.reader.next_char().is_ascii_digit() {
                    return self.lex_number();
                }

                self.reader.bump();
                if self.reader.current_char() != '.' {
                    return LuaTokenKind::TkDot;
                }
                self.reader.bump();
                if self.reader.current_char() != '.' {
                    return LuaTokenKind::TkConcat;
                }
                self.reader.bump();
                LuaTokenKind::TkDots
            }
            '0'..='9' => self.lex_number(),
            '/' => {
                self.reader.bump();
                if self.reader.current_char() != '/' {
                    LuaTokenKind::TkDiv
                } else {
                    self.reader.bump();
                    LuaTokenKind::TkIDiv
                }
            }
            '*' => {
                self.reader.bump();
                LuaTokenKind::TkMul
            }
            '+' => {
                self.reader.bump();
                LuaTokenKind::TkPlus
            }
            '%' => {
                self.reader.bump();
                LuaTokenKind::TkMod
            }
            '^' => {
                self.reader.bump();
                LuaTokenKind::TkPow
            }
            '#' => {
                let is_line_start = self.reader.is_start_of_line();
                self.reader.bump();

                if is_line_start && self.line == 1 && self.reader.current_char() == '!' {
                    self.reader.eat_while(|ch| ch != '\n' && ch != '\r');
                    return LuaTokenKind::TkShebang;
                }

                LuaTokenKind::TkLen
            }
            '&' => {
                self.reader.bump();
                LuaTokenKind::TkBitAnd
            }
            '|' => {
                self.reader.bump();
                LuaTokenKind::TkBitOr
            }
            '(' => {
                self.reader.bump();
                LuaTokenKind::TkLeftParen
            }
            ')' => {
                self.reader.bump();
                LuaTokenKind::TkRightParen
            }
            '{' => {
                self.reader.bump();
                LuaTokenKind::TkLeftBrace
            }
            '}' => {
                self.reader.bump();
                LuaTokenKind::TkRightBrace
            }
            ']' => {
                self.reader.bump();
                LuaTokenKind::TkRightBracket
            }
            ';' => {
                self.reader.bump();
                LuaTokenKind::TkSemicolon
            }
            ',' => {
                self.reader.bump();
                LuaTokenKind::TkComma
            }
            _ if self.reader.is_eof() => LuaTokenKind::TkEof,
            ch if is_name_start(ch) => {
                self.reader.bump();
                self.reader.eat_while(is_name_continue);
                let name = self.reader.current_text();
                self.name_to_kind(name)
            }
            _ => {
                self.reader.bump();
                LuaTokenKind::TkUnknown
            }
        }
    }

    fn lex_new_line(&mut self) -> LuaTokenKind {
        match self.reader.current_char() {
            '\n' => {
                self.reader.bump();
                if self.reader.current_char() == '\r' {
                    self.reader.bump();
                }
            }
            '\r' => {
                self.reader.bump();
                if self.reader.current_char() == '\n' {
                    self.reader.bump();
                }
            }
            _ => {}
        }
        self.line += 1;

        LuaTokenKind::TkEndOfLine
    }

    fn lex_white_space(&mut self) -> LuaTokenKind {
        self.reader
            .eat_while(|ch| ch == ' ' || ch == '\t' || ch == '\x0B' || ch == '\x0C');
        LuaTokenKind::TkWhitespace
    }

    fn skip_sep(&mut self) -> usize {
        self.reader.eat_when('=')
    }

    fn lex_string(&mut self, quote: char) -> LuaTokenKind {
        while !self.reader.is_eof() {
            let ch = self.reader.current_char();
            if ch == quote || ch == '\n' || ch == '\r' {
                break;
            }

            if ch != '\\' {
                self.reader.bump();
                continue;
            }

            self.reader.bump();
            match self.reader.current_char() {
                'z' => {
                    self.reader.bump();
                    while !self.reader.is_eof() {
                        let c = self.reader.current_char();
                        if c == ' ' || c == '\t' || c == '\x0B' || c == '\x0C' {
                            self.reader.bump();
                        } else if c == '\r' || c == '\n' {
                            self.lex_new_line();
                        } else {
                            break;
                        }
                    }
                }
                'x' => {
                    self.reader.bump();
                    if !self.reader.current_char().is_ascii_hexdigit() {
                        self.error(|| "hexadecimal digit expected".to_string());
                        return LuaTokenKind::TkString;
                    }
                    self.reader.bump();
                    if !self.reader.current_char().is_ascii_hexdigit() {
                        self.error(|| "hexadecimal digit expected".to_string());
                        return LuaTokenKind::TkString;
                    }
                    self.reader.bump();
                }
                'u' => {
                    self.reader.bump();
                    if self.reader.current_char() != '{' {
                        self.error(|| "missing '{' in unicode escape".to_string());
                        return LuaTokenKind::TkString;
                    }
                    self.reader.bump();

                    let mut hex_digits = String::new();
                    while self.reader.current_char() != '}' {
                        let ch = self.reader.current_char();
                        if ch == '\0' || ch == '\n' || ch == '\r' {
                            self.error(|| "unfinished unicode escape".to_string());
                            return LuaTokenKind::TkString;
                        }
                        if !ch.is_ascii_hexdigit() {
                            self.error(|| "hexadecimal digit expected in unicode escape".to_string());
                            return LuaTokenKind::TkString;
                        }
                        hex_digits.push(ch);
                        self.reader.bump();
                    }

                    match u32::from_str_radix(&hex_digits, 16) {
                        Ok(val) if val <= 0x7FFFFFFF => {
                            self.reader.bump();
                        }
                        _ => {
                            self.error(|| "UTF-8 value too large".to_string());
                            return LuaTokenKind::TkString;
                        }
                    }
                }
                '\r' | '\n' => {
                    self.lex_new_line();
                }
                '0'..='9' => {
                    let mut digits = String::new();
                    digits.push(self.reader.current_char());
                    self.reader.bump();

                    let mut count = 1;
                    while count < 3 && self.reader.current_char().is_ascii_digit() {
                        digits.push(self.reader.current_char());
                        self.reader.bump();
                        count += 1;
                    }

                    if let Ok(val) = digits.parse::<u16>() {
                        if val > 255 {
                            self.error(|| "decimal escape too large".to_string());
                            return LuaTokenKind::TkString;
                        }
                    }
                }
                'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\' | '\'' | '\"' => {
                    self.reader.bump();
                }
                _ => {
                    self.error(|| "invalid escape sequence".to_string());
                    return LuaTokenKind::TkString;
                }
            }
        }

        if self.reader.current_char() != quote {
            self.error(|| "unfinished string".to_string());
            return LuaTokenKind::TkString;
        }

        self.reader.bump();
        LuaTokenKind::TkString
    }

    fn lex_long_string(&mut self, sep: usize) -> LuaTokenKind {
        let mut end = false;
        while !self.reader.is_eof() {
            match self.reader.current_char() {
                ']' => {
                    self.reader.bump();
                    let count = self.reader.eat_when('=');
                    if count == sep && self.reader.current_char() == ']' {
                        self.reader.bump();
                        end = true;
                        break;
                    }
                }
                '\n' | '\r' => {
                    self.lex_new_line();
                }
                _ => {
                    self.reader.bump();
                }
            }
        }

        if !end {
            self.error(|| "unfinished long string or comment".to_string());
        }

        LuaTokenKind::TkLongString
    }

    fn lex_number(&mut self) -> LuaTokenKind {
        enum NumberState {
            Int,
            Float,
            Hex,
            HexFloat,
            WithExpo,
        }

        let mut state = NumberState::Int;
        let first = self.reader.current_char();
        self.reader.bump();
        match first {
            '0' if matches!(self.reader.current_char(), 'X' | 'x') => {
                self.reader.bump();
                state = NumberState::Hex;
            }
            '.' => {
                state = NumberState::Float;
            }
            _ => {}
        }

        while !self.reader.is_eof() {
            let ch = self.reader.current_char();
            let continue_ = match state {
                NumberState::Int => match ch {
                    '0'..='9' => true,
                    '.' => {
                        state = NumberState::Float;
                        true
                    }
                    'e' | 'E' => {
                        if matches!(self.reader.next_char(), '+' | '-') {
                            self.reader.bump();
                        }
                        state = NumberState::WithExpo;
                        true
                    }
                    _ => false,
                },
                NumberState::Float => match ch {
                    '0'..='9' => true,
                    'e' | 'E' => {
                        if matches!(self.reader.next_char(), '+' | '-') {
                            self.reader.bump();
                        }
                        state = NumberState::WithExpo;
                        true
                    }
                    _ => false,
                },
                NumberState::Hex => match ch {
                    '0'..='9' | 'a'..='f' | 'A'..='F' => true,
                    '.' => {
                        state = NumberState::HexFloat;
                        true
                    }
                    'P' | 'p' => {
                        if matches!(self.reader.next_char(), '+' | '-') {
                            self.reader.bump();
                        }
                        state = NumberState::WithExpo;
                        true
                    }
                    _ => false,
                },
                NumberState::HexFloat => match ch {
                    '0'..='9' | 'a'..='f' | 'A'..='F' => true,
                    'P' | 'p' => {
                        if matches!(self.reader.next_char(), '+' | '-') {
                            self.reader.bump();
                        }
                        state = NumberState::WithExpo;
                        true
                    }
                    _ => false,
                },
                NumberState::WithExpo => ch.is_ascii_digit(),
            };

            if continue_ {
                self.reader.bump();
            } else {
                break;
            }
        }

        if self.reader.current_char().is_alphabetic() {
            let ch = self.reader.current_char();
            self.error(|| format!("unexpected character '{}' after number literal", ch));
        }

        match state {
            NumberState::Int | NumberState::Hex => LuaTokenKind::TkInt,
            _ => LuaTokenKind::TkFloat,
        }
    }

    fn error<F>(&mut self, msg: F)
    where
        F: FnOnce() -> String,
    {
        let range = self.reader.current_range();
        let message = format!("{}: {}", self.line, msg());
        if let Some(errors) = self.errors.as_deref_mut() {
            errors.push(LuaParseError::syntax_error_from(&message, range));
        }
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
