//! Proto parser - converts tokens to AST.

use super::ast::{
    Constant, Element, Enum, EnumElement, EnumValue, Extend, Extensions, Field, FieldLabel,
    FieldRange, Import, ImportKind, MapField, Message, MessageElement, Oneof, Package,
    ProtoDefinition, ProtoOption, RangeEnd, Reserved, Rpc, RpcType, Service, ServiceElement,
};
use super::lexer::{SpannedToken, Token, tokenize};
use std::fmt;
use thiserror::Error;

/// A 1-based line and column in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn at(source: &str, offset: usize) -> Self {
        let before = &source[..offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Parse error with location information.
#[derive(Debug, Clone, Error, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}: {}", position, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Parser state.
pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, tokens: Vec<SpannedToken>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    /// Parse a complete proto file.
    pub fn parse(&mut self) -> Result<ProtoDefinition, ParseError> {
        let mut definition = ProtoDefinition::default();

        while !self.is_at_end() {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }

            let keyword = match self.peek() {
                Some(Token::Identifier(keyword)) => keyword.clone(),
                _ => return Err(self.error("expected a top-level declaration")),
            };

            let element = match keyword.as_str() {
                "syntax" => Element::Syntax(self.parse_syntax("syntax")?),
                "edition" => Element::Edition(self.parse_syntax("edition")?),
                "package" => Element::Package(self.parse_package()?),
                "import" => Element::Import(self.parse_import()?),
                "option" => Element::Option(self.parse_option_statement()?),
                "message" => Element::Message(self.parse_message()?),
                "enum" => Element::Enum(self.parse_enum()?),
                "service" => Element::Service(self.parse_service()?),
                "extend" => Element::Extend(self.parse_extend()?),
                other => return Err(self.error(&format!("unexpected '{}' at top level", other))),
            };
            definition.elements.push(element);
        }

        Ok(definition)
    }

    fn parse_syntax(&mut self, keyword: &str) -> Result<String, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect(Token::Equals)?;
        let value = self.expect_string_literal()?;
        self.expect(Token::Semicolon)?;
        Ok(value)
    }

    fn parse_package(&mut self) -> Result<Package, ParseError> {
        self.expect_keyword("package")?;
        let name = self.parse_full_ident()?;
        self.expect(Token::Semicolon)?;
        Ok(Package { name })
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        self.expect_keyword("import")?;
        let kind = if self.check_keyword("weak") {
            self.advance();
            ImportKind::Weak
        } else if self.check_keyword("public") {
            self.advance();
            ImportKind::Public
        } else {
            ImportKind::Default
        };
        let filename = self.expect_string_literal()?;
        self.expect(Token::Semicolon)?;
        Ok(Import { filename, kind })
    }

    fn parse_option_statement(&mut self) -> Result<ProtoOption, ParseError> {
        self.expect_keyword("option")?;
        let option = self.parse_option_body()?;
        self.expect(Token::Semicolon)?;
        Ok(option)
    }

    fn parse_option_body(&mut self) -> Result<ProtoOption, ParseError> {
        let name = self.parse_option_name()?;
        self.expect(Token::Equals)?;
        let constant = self.parse_constant()?;
        Ok(ProtoOption { name, constant })
    }

    fn parse_option_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.parse_option_name_part()?;
        while self.check(&Token::Dot) {
            self.advance();
            name.push('.');
            name.push_str(&self.parse_option_name_part()?);
        }
        Ok(name)
    }

    fn parse_option_name_part(&mut self) -> Result<String, ParseError> {
        if self.check(&Token::LParen) {
            self.advance();
            let extension = self.parse_full_ident()?;
            self.expect(Token::RParen)?;
            Ok(format!("({})", extension))
        } else {
            self.expect_identifier()
        }
    }

    /// `[a = 1, (b) = "x"]` after a field or enum value; empty when absent.
    fn parse_bracket_options(&mut self) -> Result<Vec<ProtoOption>, ParseError> {
        let mut options = Vec::new();
        if !self.check(&Token::LBracket) {
            return Ok(options);
        }

        self.advance();
        loop {
            options.push(self.parse_option_body()?);
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RBracket)?;

        Ok(options)
    }

    fn parse_constant(&mut self) -> Result<Constant, ParseError> {
        match self.peek() {
            Some(Token::Minus | Token::Plus) => {
                let negative = self.check(&Token::Minus);
                self.advance();
                match self.advance().map(|t| t.token) {
                    Some(Token::IntegerLiteral(v) | Token::HexLiteral(v)) => {
                        let v = i128::from(v);
                        Ok(Constant::Int(if negative { -v } else { v }))
                    }
                    Some(Token::FloatLiteral(v)) => {
                        Ok(Constant::Float(if negative { -v } else { v }))
                    }
                    Some(Token::Identifier(word)) if word == "inf" || word == "nan" => {
                        Ok(Constant::Identifier(if negative {
                            format!("-{}", word)
                        } else {
                            word
                        }))
                    }
                    _ => Err(self.error_before("expected a number after sign")),
                }
            }
            Some(Token::IntegerLiteral(_) | Token::HexLiteral(_)) => {
                match self.advance().map(|t| t.token) {
                    Some(Token::IntegerLiteral(v) | Token::HexLiteral(v)) => {
                        Ok(Constant::Int(i128::from(v)))
                    }
                    _ => Err(self.error_before("expected integer")),
                }
            }
            Some(Token::FloatLiteral(_)) => match self.advance().map(|t| t.token) {
                Some(Token::FloatLiteral(v)) => Ok(Constant::Float(v)),
                _ => Err(self.error_before("expected float")),
            },
            Some(Token::StringLiteral(_)) => {
                // Adjacent string literals concatenate.
                let mut value = self.expect_string_literal()?;
                while matches!(self.peek(), Some(Token::StringLiteral(_))) {
                    value.push_str(&self.expect_string_literal()?);
                }
                Ok(Constant::String(value))
            }
            Some(Token::Identifier(word)) if word == "true" || word == "false" => {
                let value = word == "true";
                self.advance();
                Ok(Constant::Bool(value))
            }
            Some(Token::Identifier(_) | Token::Dot) => {
                Ok(Constant::Identifier(self.parse_full_ident()?))
            }
            Some(Token::LBrace) => Ok(Constant::Aggregate(self.parse_aggregate()?)),
            _ => Err(self.error("expected a constant")),
        }
    }

    /// Consumes a balanced `{ ... }` block and returns its source text.
    fn parse_aggregate(&mut self) -> Result<String, ParseError> {
        let start = match self.tokens.get(self.pos) {
            Some(SpannedToken {
                token: Token::LBrace,
                span,
            }) => span.start,
            _ => return Err(self.error("expected '{'")),
        };
        self.advance();

        let mut depth = 1;
        let mut end = start;
        while depth > 0 {
            match self.advance() {
                Some(SpannedToken {
                    token: Token::LBrace,
                    ..
                }) => depth += 1,
                Some(SpannedToken {
                    token: Token::RBrace,
                    span,
                }) => {
                    depth -= 1;
                    end = span.end;
                }
                Some(_) => {}
                None => return Err(self.error("unexpected end of input in aggregate value")),
            }
        }

        Ok(self.source[start..end].to_string())
    }

    fn parse_message(&mut self) -> Result<Message, ParseError> {
        self.expect_keyword("message")?;
        let name = self.expect_identifier()?;
        self.expect(Token::LBrace)?;

        let mut elements = Vec::new();
        while !self.at_block_end()? {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }
            elements.push(self.parse_message_element()?);
        }

        self.expect(Token::RBrace)?;

        Ok(Message { name, elements })
    }

    fn parse_message_element(&mut self) -> Result<MessageElement, ParseError> {
        let keyword = match self.peek() {
            Some(Token::Identifier(keyword)) => keyword.clone(),
            Some(Token::Dot) => return Ok(MessageElement::Field(self.parse_field()?)),
            _ => return Err(self.error("expected a message element")),
        };

        let element = match keyword.as_str() {
            "option" => MessageElement::Option(self.parse_option_statement()?),
            "message" if self.is_named_block() => MessageElement::Message(self.parse_message()?),
            "enum" if self.is_named_block() => MessageElement::Enum(self.parse_enum()?),
            "oneof" if self.is_named_block() => MessageElement::Oneof(self.parse_oneof()?),
            "extend" if !self.check_at(2, &Token::Equals) => {
                MessageElement::Extend(self.parse_extend()?)
            }
            "reserved" if self.is_reserved_statement() => {
                MessageElement::Reserved(self.parse_reserved()?)
            }
            "extensions"
                if matches!(
                    self.peek_at(1),
                    Some(Token::IntegerLiteral(_) | Token::HexLiteral(_))
                ) =>
            {
                MessageElement::Extensions(self.parse_extensions()?)
            }
            "map" if self.check_at(1, &Token::LAngle) => {
                MessageElement::MapField(self.parse_map_field()?)
            }
            _ => MessageElement::Field(self.parse_field()?),
        };

        Ok(element)
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let label = match self.peek() {
            Some(Token::Identifier(word)) if !self.check_at(1, &Token::Equals) => {
                match word.as_str() {
                    "optional" => Some(FieldLabel::Optional),
                    "required" => Some(FieldLabel::Required),
                    "repeated" => Some(FieldLabel::Repeated),
                    _ => None,
                }
            }
            _ => None,
        };
        if label.is_some() {
            self.advance();
        }

        let type_name = self.parse_full_ident()?;
        let name = self.expect_identifier()?;
        self.expect(Token::Equals)?;
        let number = self.expect_signed_integer()?;

        if self.check(&Token::LBrace) {
            return Err(self.error("groups are not supported"));
        }

        let options = self.parse_bracket_options()?;
        self.expect(Token::Semicolon)?;

        Ok(Field {
            label,
            type_name,
            name,
            number,
            options,
        })
    }

    fn parse_map_field(&mut self) -> Result<MapField, ParseError> {
        self.expect_keyword("map")?;
        self.expect(Token::LAngle)?;
        let key_type = self.parse_full_ident()?;
        self.expect(Token::Comma)?;
        let value_type = self.parse_full_ident()?;
        self.expect(Token::RAngle)?;
        let name = self.expect_identifier()?;
        self.expect(Token::Equals)?;
        let number = self.expect_signed_integer()?;
        let options = self.parse_bracket_options()?;
        self.expect(Token::Semicolon)?;

        Ok(MapField {
            key_type,
            value_type,
            name,
            number,
            options,
        })
    }

    fn parse_oneof(&mut self) -> Result<Oneof, ParseError> {
        self.expect_keyword("oneof")?;
        let name = self.expect_identifier()?;
        self.expect(Token::LBrace)?;

        let mut fields = Vec::new();
        let mut options = Vec::new();
        while !self.at_block_end()? {
            if self.check(&Token::Semicolon) {
                self.advance();
            } else if self.check_keyword("option") {
                options.push(self.parse_option_statement()?);
            } else {
                fields.push(self.parse_field()?);
            }
        }

        self.expect(Token::RBrace)?;

        Ok(Oneof {
            name,
            fields,
            options,
        })
    }

    fn parse_ranges(&mut self) -> Result<Vec<FieldRange>, ParseError> {
        let mut ranges = Vec::new();
        loop {
            let start = self.expect_signed_integer()?;
            let end = if self.check_keyword("to") {
                self.advance();
                if self.check_keyword("max") {
                    self.advance();
                    Some(RangeEnd::Max)
                } else {
                    Some(RangeEnd::Value(self.expect_signed_integer()?))
                }
            } else {
                None
            };
            ranges.push(FieldRange { start, end });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(ranges)
    }

    fn parse_reserved(&mut self) -> Result<Reserved, ParseError> {
        self.expect_keyword("reserved")?;
        let mut reserved = Reserved::default();

        if matches!(
            self.peek(),
            Some(Token::StringLiteral(_) | Token::Identifier(_))
        ) {
            loop {
                let name = match self.peek() {
                    Some(Token::StringLiteral(_)) => self.expect_string_literal()?,
                    _ => self.expect_identifier()?,
                };
                reserved.names.push(name);
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        } else {
            reserved.ranges = self.parse_ranges()?;
        }

        self.expect(Token::Semicolon)?;
        Ok(reserved)
    }

    fn parse_extensions(&mut self) -> Result<Extensions, ParseError> {
        self.expect_keyword("extensions")?;
        let ranges = self.parse_ranges()?;
        let options = self.parse_bracket_options()?;
        self.expect(Token::Semicolon)?;
        Ok(Extensions { ranges, options })
    }

    fn parse_enum(&mut self) -> Result<Enum, ParseError> {
        self.expect_keyword("enum")?;
        let name = self.expect_identifier()?;
        self.expect(Token::LBrace)?;

        let mut elements = Vec::new();
        while !self.at_block_end()? {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }

            // A value may itself be called `option` or `reserved`.
            let element = if self.check_keyword("option") && !self.check_at(1, &Token::Equals) {
                EnumElement::Option(self.parse_option_statement()?)
            } else if self.check_keyword("reserved") && self.is_reserved_statement() {
                EnumElement::Reserved(self.parse_reserved()?)
            } else {
                EnumElement::Value(self.parse_enum_value()?)
            };
            elements.push(element);
        }

        self.expect(Token::RBrace)?;

        Ok(Enum { name, elements })
    }

    fn parse_enum_value(&mut self) -> Result<EnumValue, ParseError> {
        let name = self.expect_identifier()?;
        self.expect(Token::Equals)?;
        let number = self.expect_signed_integer()?;
        let options = self.parse_bracket_options()?;
        self.expect(Token::Semicolon)?;

        Ok(EnumValue {
            name,
            number,
            options,
        })
    }

    fn parse_service(&mut self) -> Result<Service, ParseError> {
        self.expect_keyword("service")?;
        let name = self.expect_identifier()?;
        self.expect(Token::LBrace)?;

        let mut elements = Vec::new();
        while !self.at_block_end()? {
            if self.check(&Token::Semicolon) {
                self.advance();
            } else if self.check_keyword("option") {
                elements.push(ServiceElement::Option(self.parse_option_statement()?));
            } else if self.check_keyword("rpc") {
                elements.push(ServiceElement::Rpc(self.parse_rpc()?));
            } else {
                return Err(self.error("expected 'rpc' or 'option' in service"));
            }
        }

        self.expect(Token::RBrace)?;

        Ok(Service { name, elements })
    }

    fn parse_rpc(&mut self) -> Result<Rpc, ParseError> {
        self.expect_keyword("rpc")?;
        let name = self.expect_identifier()?;
        let request = self.parse_rpc_type()?;
        self.expect_keyword("returns")?;
        let response = self.parse_rpc_type()?;

        let mut options = Vec::new();
        if self.check(&Token::LBrace) {
            self.advance();
            while !self.at_block_end()? {
                if self.check(&Token::Semicolon) {
                    self.advance();
                } else {
                    options.push(self.parse_option_statement()?);
                }
            }
            self.expect(Token::RBrace)?;
            if self.check(&Token::Semicolon) {
                self.advance();
            }
        } else {
            self.expect(Token::Semicolon)?;
        }

        Ok(Rpc {
            name,
            request,
            response,
            options,
        })
    }

    fn parse_rpc_type(&mut self) -> Result<RpcType, ParseError> {
        self.expect(Token::LParen)?;
        let stream = self.check_keyword("stream")
            && matches!(self.peek_at(1), Some(Token::Identifier(_) | Token::Dot));
        if stream {
            self.advance();
        }
        let name = self.parse_full_ident()?;
        self.expect(Token::RParen)?;
        Ok(RpcType { name, stream })
    }

    fn parse_extend(&mut self) -> Result<Extend, ParseError> {
        self.expect_keyword("extend")?;
        let target = self.parse_full_ident()?;
        self.expect(Token::LBrace)?;

        let mut fields = Vec::new();
        while !self.at_block_end()? {
            if self.check(&Token::Semicolon) {
                self.advance();
            } else {
                fields.push(self.parse_field()?);
            }
        }

        self.expect(Token::RBrace)?;

        Ok(Extend { target, fields })
    }

    /// `foo.bar.Baz`, optionally with a leading dot.
    fn parse_full_ident(&mut self) -> Result<String, ParseError> {
        let mut ident = String::new();
        if self.check(&Token::Dot) {
            self.advance();
            ident.push('.');
        }
        ident.push_str(&self.expect_identifier()?);
        while self.check(&Token::Dot) {
            self.advance();
            ident.push('.');
            ident.push_str(&self.expect_identifier()?);
        }
        Ok(ident)
    }

    // Helper methods

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        if self.is_at_end() {
            None
        } else {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;
            Some(token)
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, expected: &Token) -> bool {
        self.check_at(0, expected)
    }

    fn check_at(&self, offset: usize, expected: &Token) -> bool {
        self.peek_at(offset)
            .map(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
            .unwrap_or(false)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Identifier(word)) if word == keyword)
    }

    /// `<keyword> Name {`
    fn is_named_block(&self) -> bool {
        matches!(self.peek_at(1), Some(Token::Identifier(_))) && self.check_at(2, &Token::LBrace)
    }

    fn is_reserved_statement(&self) -> bool {
        match self.peek_at(1) {
            Some(Token::IntegerLiteral(_) | Token::HexLiteral(_) | Token::StringLiteral(_)) => {
                true
            }
            Some(Token::Minus) => true,
            Some(Token::Identifier(_)) => {
                self.check_at(2, &Token::Semicolon) || self.check_at(2, &Token::Comma)
            }
            _ => false,
        }
    }

    /// True on the closing brace of a block; errors if input ran out first.
    fn at_block_end(&self) -> Result<bool, ParseError> {
        if self.is_at_end() {
            return Err(self.error("unexpected end of input, expected '}'"));
        }
        Ok(self.check(&Token::RBrace))
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", describe(&expected))))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", keyword)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn expect_string_literal(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::StringLiteral(s)) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("expected string literal")),
        }
    }

    fn expect_signed_integer(&mut self) -> Result<i64, ParseError> {
        let negative = self.check(&Token::Minus);
        if negative {
            self.advance();
        }

        let magnitude = match self.peek() {
            Some(Token::IntegerLiteral(v) | Token::HexLiteral(v)) => i128::from(*v),
            _ => return Err(self.error("expected integer")),
        };
        let value = if negative { -magnitude } else { magnitude };
        let value = i64::try_from(value).map_err(|_| self.error("integer out of range"))?;
        self.advance();
        Ok(value)
    }

    fn error(&self, message: &str) -> ParseError {
        let offset = match self.tokens.get(self.pos) {
            Some(token) => token.span.start,
            None => self.source.len(),
        };
        ParseError::new(message, Some(Position::at(self.source, offset)))
    }

    /// Error positioned at the token just consumed.
    fn error_before(&self, message: &str) -> ParseError {
        let offset = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.start)
            .unwrap_or(self.source.len());
        ParseError::new(message, Some(Position::at(self.source, offset)))
    }
}

fn describe(token: &Token) -> &'static str {
    match token {
        Token::LBrace => "'{'",
        Token::RBrace => "'}'",
        Token::LParen => "'('",
        Token::RParen => "')'",
        Token::LBracket => "'['",
        Token::RBracket => "']'",
        Token::LAngle => "'<'",
        Token::RAngle => "'>'",
        Token::Semicolon => "';'",
        Token::Colon => "':'",
        Token::Comma => "','",
        Token::Equals => "'='",
        Token::Dot => "'.'",
        Token::Minus => "'-'",
        Token::Plus => "'+'",
        Token::Slash => "'/'",
        Token::StringLiteral(_) => "string literal",
        Token::IntegerLiteral(_) | Token::HexLiteral(_) => "integer",
        Token::FloatLiteral(_) => "float",
        Token::Identifier(_) => "identifier",
    }
}

/// Parse proto source to AST.
pub fn parse(source: &str) -> Result<ProtoDefinition, ParseError> {
    let tokens = tokenize(source).map_err(|e| {
        ParseError::new(e.message, Some(Position::at(source, e.span.start)))
    })?;

    let mut parser = Parser::new(source, tokens);
    parser.parse()
}
